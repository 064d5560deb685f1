//! The update-loop tick boundary.
//!
//! The engine does not drive time itself; an external update loop dispatches
//! a tick signal once per frame. [`UpdateTick`] is the payload shape that
//! crosses the boundary.

/// One frame tick from the external update loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateTick {
    /// Wall-clock seconds since the previous tick.
    pub delta_time: f64,
    /// The loop's current time-scale factor.
    pub speed_multiplier: f64,
    /// `delta_time * speed_multiplier`, precomputed by the loop.
    pub multiplied_delta: f64,
}

impl UpdateTick {
    /// Build a tick, deriving the multiplied delta.
    #[must_use]
    pub fn new(delta_time: f64, speed_multiplier: f64) -> Self {
        Self {
            delta_time,
            speed_multiplier,
            multiplied_delta: delta_time * speed_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplied_delta_is_derived() {
        let tick = UpdateTick::new(0.016, 2.0);
        assert!((tick.multiplied_delta - 0.032).abs() < f64::EPSILON);
    }
}
