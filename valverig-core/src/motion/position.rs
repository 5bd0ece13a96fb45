//! Valve geometry and percentage-to-step conversion

/// Mechanical description of the valve drive train
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValveGeometry {
    /// Motor steps per revolution including microstepping
    pub steps_per_revolution: u32,
    /// Gear ratio numerator (output turns slower by num/den)
    pub gear_ratio_num: u32,
    /// Gear ratio denominator
    pub gear_ratio_den: u32,
    /// Valve travel from closed to fully open, in degrees
    pub max_travel_deg: u32,
}

impl ValveGeometry {
    /// 200-step motor at 1/16 microstepping, 22:10 gear, 93° travel
    pub const RIG: Self = Self {
        steps_per_revolution: 200 * 16,
        gear_ratio_num: 22,
        gear_ratio_den: 10,
        max_travel_deg: 93,
    };

    /// Step count of the fully open position
    ///
    /// `floor(steps_per_revolution × gear_ratio × max_travel / 360)`,
    /// evaluated in integers so the result is exact.
    pub fn max_position(&self) -> i32 {
        let numerator = self.steps_per_revolution as u64
            * self.gear_ratio_num as u64
            * self.max_travel_deg as u64;
        let denominator = self.gear_ratio_den as u64 * 360;
        if denominator == 0 {
            return 0;
        }
        (numerator / denominator).min(i32::MAX as u64) as i32
    }
}

impl Default for ValveGeometry {
    fn default() -> Self {
        Self::RIG
    }
}

/// Which bound a requested position was pulled back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamp {
    /// Below 0 % (or not a number)
    Minimum,
    /// Above 100 %
    Maximum,
}

/// Result of converting an opening percentage to a step target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionTarget {
    /// Target in steps, always within `[0, max]`
    pub steps: i32,
    /// Set when the request was out of range
    pub clamped: Option<Clamp>,
}

/// Convert an opening percentage to a step target
///
/// Rounds half up and clamps to `[0, max]`. NaN is treated as a request
/// for the closed position.
pub fn percent_to_steps(percent: f64, max: i32) -> PositionTarget {
    let raw = percent / 100.0 * max as f64;

    if raw.is_nan() || raw < 0.0 {
        return PositionTarget {
            steps: 0,
            clamped: Some(Clamp::Minimum),
        };
    }

    // Truncation after adding 0.5 is round-half-up for non-negative values
    let rounded = raw + 0.5;
    if rounded >= max as f64 + 1.0 {
        return PositionTarget {
            steps: max,
            clamped: Some(Clamp::Maximum),
        };
    }

    let steps = (rounded as i32).min(max);
    PositionTarget {
        steps,
        clamped: if percent > 100.0 {
            Some(Clamp::Maximum)
        } else {
            None
        },
    }
}

/// Opening percentage of a step position
pub fn steps_to_percent(steps: i32, max: i32) -> f64 {
    if max <= 0 {
        return 0.0;
    }
    steps as f64 * 100.0 / max as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: i32 = 1818;

    #[test]
    fn test_rig_max_position() {
        assert_eq!(ValveGeometry::RIG.max_position(), MAX);
    }

    #[test]
    fn test_zero_denominator() {
        let geometry = ValveGeometry {
            gear_ratio_den: 0,
            ..ValveGeometry::RIG
        };
        assert_eq!(geometry.max_position(), 0);
    }

    #[test]
    fn test_percent_clamping_table() {
        let cases = [
            (-10.0, 0, Some(Clamp::Minimum)),
            (0.0, 0, None),
            (50.0, 909, None),
            (100.0, MAX, None),
            (150.0, MAX, Some(Clamp::Maximum)),
        ];

        for (percent, steps, clamped) in cases {
            let target = percent_to_steps(percent, MAX);
            assert_eq!(target.steps, steps, "{}%", percent);
            assert_eq!(target.clamped, clamped, "{}%", percent);
        }
    }

    #[test]
    fn test_round_half_up() {
        // 0.5 of a step rounds up, just below does not
        assert_eq!(percent_to_steps(50.0, 1).steps, 1);
        assert_eq!(percent_to_steps(49.0, 1).steps, 0);
        // 33.3 % of 1818 is 605.394
        assert_eq!(percent_to_steps(33.3, MAX).steps, 605);
    }

    #[test]
    fn test_nan_and_infinity() {
        assert_eq!(
            percent_to_steps(f64::NAN, MAX),
            PositionTarget {
                steps: 0,
                clamped: Some(Clamp::Minimum)
            }
        );
        assert_eq!(percent_to_steps(f64::INFINITY, MAX).steps, MAX);
        assert_eq!(percent_to_steps(f64::NEG_INFINITY, MAX).steps, 0);
    }

    #[test]
    fn test_steps_to_percent() {
        assert_eq!(steps_to_percent(MAX, MAX), 100.0);
        assert_eq!(steps_to_percent(0, MAX), 0.0);
        assert_eq!(steps_to_percent(5, 0), 0.0);
    }
}
