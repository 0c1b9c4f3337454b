use std::f32::consts::{PI, TAU};

use nalgebra::Vector2;

/// Creates a vector from its length and angle (radians, counter-clockwise from the positive x-axis).
pub fn polar(length: f32, angle: f32) -> Vector2<f32> {
    Vector2::new(length * angle.cos(), length * angle.sin())
}

/// The angle of a vector in the range (-PI, PI]. The zero vector has angle zero.
pub fn angle_of(v: &Vector2<f32>) -> f32 {
    v.y.atan2(v.x)
}

/// Wraps an angle in radians into the range [0, 2*PI).
pub fn unsigned_normalize(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Wraps an angle in radians into the range (-PI, PI].
pub fn signed_normalize(angle: f32) -> f32 {
    let a = unsigned_normalize(angle);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

#[cfg(test)]
mod test {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_polar() {
        let v = polar(2.0, FRAC_PI_2);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.y, 2.0);
        assert_relative_eq!(angle_of(&v), FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn zero_vector_has_zero_angle() {
        assert_eq!(angle_of(&Vector2::zeros()), 0.0);
    }

    #[test]
    fn test_unsigned_normalize() {
        assert_relative_eq!(unsigned_normalize(0.0), 0.0);
        assert_relative_eq!(unsigned_normalize(-FRAC_PI_2), 3.0 * FRAC_PI_2, epsilon = 1e-6);
        assert_relative_eq!(unsigned_normalize(TAU + 1.0), 1.0, epsilon = 1e-6);
        assert!(unsigned_normalize(-1e-9) < TAU);
    }

    #[test]
    fn test_signed_normalize() {
        assert_relative_eq!(signed_normalize(PI), PI);
        assert_relative_eq!(signed_normalize(3.0 * FRAC_PI_2), -FRAC_PI_2, epsilon = 1e-6);
        assert_relative_eq!(signed_normalize(-FRAC_PI_2), -FRAC_PI_2, epsilon = 1e-6);
    }
}
