//! Differential-drive kinematics and encoder simulation.
//!
//! Motor commands are PWM duty values in `0..=255` (negative values drive backwards); time is in
//! milliseconds. The single-step integration in [`Mouse::drive_step`] is the calibration
//! baseline's approximation and must not be replaced by exact arc integration.

use super::{Angle, Mouse, MousePoint, Position, Velocity};

/// Full-scale PWM duty.
pub const PWM_FULL_SCALE: f64 = 255.0;
/// Wheel revolutions per ms at full scale (4900 RPM motor through a 13:44 gear).
pub const WHEEL_REVOLUTIONS_PER_MS: f64 = 2.4129;
/// Wheel circumference in mm.
pub const WHEEL_CIRCUMFERENCE: f64 = 103.0;
/// Encoder rising edges per wheel revolution.
pub const ENCODER_EDGES_PER_REVOLUTION: f64 = 51.453;
/// Encoder rising edges per mm of forward travel.
pub const ENCODER_EDGES_PER_MM: f64 = 0.49954;

impl Mouse {
    /// Shift every tracked point by the same delta.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.set_position(self.position() + Position::new(dx, dy));
    }

    /// Rotate every tracked point around the center; positive is counter-clockwise.
    pub fn rotate(&mut self, angle: Angle) {
        self.set_heading(self.heading() + angle);
    }

    /// Direction of the hitbox's bottom edge (left to right), in (-180, 180] degrees.
    pub fn orientation(&self) -> Angle {
        Angle::of_vector(
            self.point(MousePoint::HitboxBottomRight) - self.point(MousePoint::HitboxBottomLeft),
        )
    }

    pub fn orientation_degrees(&self) -> f64 {
        self.orientation().to_deg()
    }

    /// Rotate back to heading 0 around the current center.
    pub fn reset_heading(&mut self) {
        self.rotate(-self.orientation());
    }

    pub fn wheelbase(&self) -> f64 {
        self.config().wheelbase()
    }

    /// Advance the pose by one first-order step of `dt_millis` under constant motor commands.
    ///
    /// The body first rotates by `ω·dt`, then translates by `v·dt` along the direction `ω·dt`
    /// measured from the x-axis, where `v` is the mean wheel speed and
    /// `ω = (right_pwm - left_pwm) / wheelbase`.
    pub fn drive_step(&mut self, left_pwm: f64, right_pwm: f64, dt_millis: f64) {
        let left: f64 = wheel_speed(left_pwm).into();
        let right: f64 = wheel_speed(right_pwm).into();
        let velocity = (left + right) / 2.0;
        let omega = (right_pwm - left_pwm) / self.wheelbase();
        let angle = omega * dt_millis;

        self.rotate(Angle::new(angle));
        self.translate(
            velocity * angle.cos() * dt_millis,
            velocity * angle.sin() * dt_millis,
        );
    }
}

/// Linear wheel speed for a PWM command.
pub fn wheel_speed(pwm: f64) -> Velocity {
    Velocity::new(WHEEL_CIRCUMFERENCE * WHEEL_REVOLUTIONS_PER_MS * (pwm / PWM_FULL_SCALE))
}

/// Encoder edges a wheel produces in `dt_millis` at a constant PWM command.
pub fn encoder_delta(pwm: f64, dt_millis: f64) -> f64 {
    WHEEL_REVOLUTIONS_PER_MS * (pwm / PWM_FULL_SCALE) * ENCODER_EDGES_PER_REVOLUTION * dt_millis
}

/// Encoder edges for driving forward by one cell.
pub fn encoder_count_per_move_forward(wall_length: f64, post_size: f64) -> u32 {
    ((wall_length + post_size) * ENCODER_EDGES_PER_MM) as u32
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn mouse() -> Mouse {
        Mouse::at(Position::new(95.25, 95.25))
    }

    fn pairwise_distances(mouse: &Mouse) -> Vec<f64> {
        let points = mouse.points().map(|(_, p)| p).collect::<Vec<_>>();
        points
            .iter()
            .enumerate()
            .flat_map(|(i, a)| points[i + 1..].iter().map(move |b| a.distance(*b)))
            .collect()
    }

    #[test]
    fn test_translate_round_trip_is_exact() {
        let mut moved = mouse();
        moved.translate(12.5, -3.25);
        moved.translate(-12.5, 3.25);
        assert_eq!(moved, mouse());
    }

    #[test]
    fn test_translate_moves_every_point() {
        let mut moved = mouse();
        moved.translate(10.0, -20.0);
        for ((_, before), (_, after)) in std::iter::zip(mouse().points(), moved.points()) {
            assert_abs_diff_eq!(after - before, Position::new(10.0, -20.0), epsilon = EPSILON);
        }
    }

    #[test]
    fn test_rotate_round_trip() {
        let mut rotated = mouse();
        rotated.rotate(Angle::from_deg(90.0));
        rotated.rotate(Angle::from_deg(-90.0));
        for ((_, before), (_, after)) in std::iter::zip(mouse().points(), rotated.points()) {
            assert_abs_diff_eq!(after, before, epsilon = EPSILON);
        }
        assert_abs_diff_eq!(rotated.position(), mouse().position());
    }

    #[test]
    fn test_rotate_keeps_center() {
        let mut rotated = mouse();
        rotated.rotate(Angle::from_deg(37.0));
        assert_eq!(rotated.position(), mouse().position());
    }

    #[test]
    fn test_rigid_transforms_preserve_pairwise_distances() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut moved = mouse();
        let expected = pairwise_distances(&moved);

        for _ in 0..1000 {
            if rng.random_bool(0.5) {
                moved.translate(rng.random_range(-50.0..50.0), rng.random_range(-50.0..50.0));
            } else {
                moved.rotate(Angle::from_deg(rng.random_range(-180.0..180.0)));
            }
        }

        for (after, before) in std::iter::zip(pairwise_distances(&moved), expected) {
            assert_abs_diff_eq!(after, before, epsilon = EPSILON);
        }
    }

    #[rstest]
    #[case::unrotated(0.0, 0.0)]
    #[case::left(30.0, 30.0)]
    #[case::right(-95.0, -95.0)]
    #[case::wrapped(270.0, -90.0)]
    #[case::wrapped_negative(-200.0, 160.0)]
    fn test_orientation(#[case] rotation: f64, #[case] expected: f64) {
        let mut rotated = mouse();
        rotated.rotate(Angle::from_deg(rotation));
        assert_abs_diff_eq!(rotated.orientation_degrees(), expected, epsilon = EPSILON);
    }

    #[test]
    fn test_reset_heading() {
        let mut rotated = mouse();
        rotated.rotate(Angle::from_deg(-123.0));
        rotated.reset_heading();
        assert_abs_diff_eq!(rotated.orientation_degrees(), 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_drive_step_straight() {
        let mut driven = mouse();
        driven.drive_step(90.0, 90.0, 0.1);
        let distance = WHEEL_CIRCUMFERENCE * WHEEL_REVOLUTIONS_PER_MS * 90.0 / 255.0 * 0.1;
        assert_abs_diff_eq!(
            driven.position(),
            mouse().position() + Position::new(distance, 0.0),
            epsilon = EPSILON
        );
        assert_abs_diff_eq!(driven.orientation_degrees(), 0.0);
    }

    #[test]
    fn test_drive_step_spin_in_place() {
        let mut driven = mouse();
        driven.drive_step(90.0, -90.0, 0.1);
        assert_abs_diff_eq!(driven.position(), mouse().position(), epsilon = EPSILON);
        assert_abs_diff_eq!(
            driven.orientation_degrees(),
            (-180.0_f64 / 86.6 * 0.1).to_degrees(),
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_drive_step_single_wheel() {
        let mut driven = mouse();
        driven.drive_step(0.0, 100.0, 0.2);
        let angle = 100.0 / 86.6 * 0.2;
        let velocity = f64::from(wheel_speed(100.0)) / 2.0;
        assert_abs_diff_eq!(f64::from(driven.orientation()), angle, epsilon = EPSILON);
        assert_abs_diff_eq!(
            driven.position(),
            mouse().position() + Position::new(angle.cos(), angle.sin()) * (velocity * 0.2),
            epsilon = EPSILON
        );
    }

    #[rstest]
    #[case(0.0, 1.0, 0.0)]
    #[case(255.0, 1.0, 2.4129 * 51.453)]
    #[case(90.0, 0.1, 4.381798012941178)]
    #[case(-255.0, 2.0, -2.0 * 2.4129 * 51.453)]
    fn test_encoder_delta(#[case] pwm: f64, #[case] dt: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(encoder_delta(pwm, dt), expected, epsilon = EPSILON);
    }

    #[test]
    fn test_encoder_count_per_move_forward() {
        assert_eq!(encoder_count_per_move_forward(166.37, 12.065), 89);
    }
}
