//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Conversion factor from revolutions per minute to radians per second.
pub const RPM_TO_RADS: f64 = std::f64::consts::TAU / 60.0;

/// Conversion factor from radians per second to revolutions per minute.
pub const RADS_TO_RPM: f64 = 60.0 / std::f64::consts::TAU;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a value to the range `[min, max]`.
///
/// The lower bound wins if the range is inverted, callers are expected to
/// have validated their bounds.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float,
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Return `value` with its magnitude raised to at least `min_abs`, keeping
/// its sign.
///
/// Used to guard divisors which can approach zero in degenerate geometry.
/// Zero and NaN are mapped to `+min_abs`.
pub fn guard_divisor<T>(value: T, min_abs: T) -> T
where
    T: Float,
{
    if value.abs() >= min_abs {
        value
    } else if value < T::zero() {
        -min_abs
    } else {
        min_abs
    }
}

/// Return the sign of `value` as -1, 0 or +1.
///
/// Unlike `Float::signum` zero maps to zero.
pub fn sign<T>(value: T) -> T
where
    T: Float,
{
    if value > T::zero() {
        T::one()
    } else if value < T::zero() {
        -T::one()
    } else {
        T::zero()
    }
}

/// Wrap an angle into the range `(-pi, pi]`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    if wrapped == -pi_t {
        pi_t
    } else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&5.0, &-1.0, &1.0), 1.0);
        assert_eq!(clamp(&-5.0, &-1.0, &1.0), -1.0);
        assert_eq!(clamp(&0.5, &-1.0, &1.0), 0.5);
    }

    #[test]
    fn test_guard_divisor() {
        assert_eq!(guard_divisor(0.5, 1e-9), 0.5);
        assert_eq!(guard_divisor(-1e-12, 1e-9), -1e-9);
        assert_eq!(guard_divisor(0.0, 1e-9), 1e-9);
        assert_eq!(guard_divisor(f64::NAN, 1e-9), 1e-9);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(3.0), 1.0);
        assert_eq!(sign(-0.1), -1.0);
        assert_eq!(sign(0.0), 0.0);
    }

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(3.0 * PI - 0.5) - (PI - 0.5)).abs() < 1e-12);
        assert!((wrap_pi(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(2.0 * PI + 0.25) - 0.25).abs() < 1e-12);
        assert_eq!(wrap_pi(-PI), PI);
    }

    #[test]
    fn test_rpm_conversion() {
        assert!((60.0 * RPM_TO_RADS - 2.0 * PI).abs() < 1e-12);
        assert!((RPM_TO_RADS * RADS_TO_RPM - 1.0).abs() < 1e-15);
    }
}
