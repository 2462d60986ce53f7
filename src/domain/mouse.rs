//! Two-wheeled micromouse with four fixed infrared distance sensors.
//!
//! The mouse is a rigid body: its pose is a center of rotation plus a heading, and every tracked
//! point (hitbox corners, wheel contacts, sensor tips and backs) is a fixed offset from the center
//! in the mouse's own frame. World coordinates are recomputed from the pose on every query, so
//! repeated transforms never distort the body.

use std::slice::Iter;

use super::{Angle, LineSegment, Position, Ray};

#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Mouse {
    position: Position,
    heading: Angle,
    config: MouseConfig,
}

impl Mouse {
    /// Place a mouse with heading 0 (front facing +y) at `position`.
    pub fn new(position: Position, config: MouseConfig) -> Self {
        Self {
            position,
            heading: Angle::default(),
            config,
        }
    }

    /// Reference mouse at `position`.
    pub fn at(position: Position) -> Self {
        Self::new(position, MouseConfig::default())
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Accumulated rotation relative to the construction pose.
    pub fn heading(&self) -> Angle {
        self.heading
    }

    pub fn config(&self) -> &MouseConfig {
        &self.config
    }

    pub fn encoder_count_per_turn(&self) -> u32 {
        self.config.encoder_count_per_turn
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn set_heading(&mut self, heading: Angle) {
        self.heading = heading;
    }

    pub fn local_point(&self, point: MousePoint) -> Position {
        self.config.offset(point)
    }

    pub fn point(&self, point: MousePoint) -> Position {
        self.position + self.local_point(point).rotate_vector(self.heading)
    }

    /// World coordinates of every tracked point.
    pub fn points(&self) -> impl Iterator<Item = (MousePoint, Position)> + '_ {
        MousePoint::iter().map(|p| (*p, self.point(*p)))
    }

    /// Ray from the sensor tip along `tip - back`.
    pub fn sensor_ray(&self, sensor: SensorId) -> Ray {
        Ray::from_sensor(self.point(sensor.tip()), self.point(sensor.back()))
    }

    pub fn sensor_distance(&self, sensor: SensorId, segment: &LineSegment) -> Option<f64> {
        self.sensor_ray(sensor).distance_to(segment)
    }
}

/// All offsets are from the center of rotation, in the mouse's own frame with its front facing
/// along the positive y-axis.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct MouseConfig {
    pub hitbox_bottom_left: Position,
    pub hitbox_top_left: Position,
    pub hitbox_top_right: Position,
    pub hitbox_bottom_right: Position,
    pub wheel_left_back: Position,
    pub wheel_left_front: Position,
    pub wheel_right_back: Position,
    pub wheel_right_front: Position,
    pub sensor_forward_left_tip: Position,
    pub sensor_forward_left_back: Position,
    pub sensor_diagonal_left_tip: Position,
    pub sensor_diagonal_left_back: Position,
    pub sensor_diagonal_right_tip: Position,
    pub sensor_diagonal_right_back: Position,
    pub sensor_forward_right_tip: Position,
    pub sensor_forward_right_back: Position,
    /// Encoder rising edges observed on each wheel during a 90° spin in place.
    pub encoder_count_per_turn: u32,
}

impl MouseConfig {
    /// Measured geometry of the reference robot.
    ///
    /// Encoder calibration: 60.8077 countable events per motor revolution through a 44:13 gear
    /// gives 51.453 rising edges per wheel revolution, 0.4995 edges/mm on a 103 mm wheel, and
    /// `(π · 86.6 / 4) · 0.4995 ≈ 33` edges per quarter spin.
    pub const REFERENCE: MouseConfig = MouseConfig {
        hitbox_bottom_left: Position::new(-45.2, -32.03),
        hitbox_top_left: Position::new(-45.2, 56.97),
        hitbox_top_right: Position::new(45.2, 56.97),
        hitbox_bottom_right: Position::new(45.2, -32.03),
        wheel_left_back: Position::new(-43.3, -17.5),
        wheel_left_front: Position::new(-43.3, 17.5),
        wheel_right_back: Position::new(43.3, -17.5),
        wheel_right_front: Position::new(43.3, 17.5),
        sensor_forward_left_tip: Position::new(-27.58, 37.92),
        sensor_forward_left_back: Position::new(-27.58, 30.42),
        sensor_diagonal_left_tip: Position::new(-17.67, 51.46),
        sensor_diagonal_left_back: Position::new(-12.36, 46.15),
        sensor_diagonal_right_tip: Position::new(17.67, 51.46),
        sensor_diagonal_right_back: Position::new(12.36, 46.15),
        sensor_forward_right_tip: Position::new(27.58, 37.92),
        sensor_forward_right_back: Position::new(27.58, 30.42),
        encoder_count_per_turn: 33,
    };

    pub fn offset(&self, point: MousePoint) -> Position {
        match point {
            MousePoint::HitboxBottomLeft => self.hitbox_bottom_left,
            MousePoint::HitboxTopLeft => self.hitbox_top_left,
            MousePoint::HitboxTopRight => self.hitbox_top_right,
            MousePoint::HitboxBottomRight => self.hitbox_bottom_right,
            MousePoint::WheelLeftBack => self.wheel_left_back,
            MousePoint::WheelLeftFront => self.wheel_left_front,
            MousePoint::WheelRightBack => self.wheel_right_back,
            MousePoint::WheelRightFront => self.wheel_right_front,
            MousePoint::SensorForwardLeftTip => self.sensor_forward_left_tip,
            MousePoint::SensorForwardLeftBack => self.sensor_forward_left_back,
            MousePoint::SensorDiagonalLeftTip => self.sensor_diagonal_left_tip,
            MousePoint::SensorDiagonalLeftBack => self.sensor_diagonal_left_back,
            MousePoint::SensorDiagonalRightTip => self.sensor_diagonal_right_tip,
            MousePoint::SensorDiagonalRightBack => self.sensor_diagonal_right_back,
            MousePoint::SensorForwardRightTip => self.sensor_forward_right_tip,
            MousePoint::SensorForwardRightBack => self.sensor_forward_right_back,
        }
    }

    /// Distance between the two front wheel contacts.
    pub fn wheelbase(&self) -> f64 {
        self.wheel_left_front.distance(self.wheel_right_front)
    }
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MousePoint {
    HitboxBottomLeft,
    HitboxTopLeft,
    HitboxTopRight,
    HitboxBottomRight,
    WheelLeftBack,
    WheelLeftFront,
    WheelRightBack,
    WheelRightFront,
    SensorForwardLeftTip,
    SensorForwardLeftBack,
    SensorDiagonalLeftTip,
    SensorDiagonalLeftBack,
    SensorDiagonalRightTip,
    SensorDiagonalRightBack,
    SensorForwardRightTip,
    SensorForwardRightBack,
}

impl MousePoint {
    pub fn iter() -> Iter<'static, MousePoint> {
        static POINTS: [MousePoint; 16] = [
            MousePoint::HitboxBottomLeft,
            MousePoint::HitboxTopLeft,
            MousePoint::HitboxTopRight,
            MousePoint::HitboxBottomRight,
            MousePoint::WheelLeftBack,
            MousePoint::WheelLeftFront,
            MousePoint::WheelRightBack,
            MousePoint::WheelRightFront,
            MousePoint::SensorForwardLeftTip,
            MousePoint::SensorForwardLeftBack,
            MousePoint::SensorDiagonalLeftTip,
            MousePoint::SensorDiagonalLeftBack,
            MousePoint::SensorDiagonalRightTip,
            MousePoint::SensorDiagonalRightBack,
            MousePoint::SensorForwardRightTip,
            MousePoint::SensorForwardRightBack,
        ];
        POINTS.iter()
    }
}

/// The four infrared sensors, in reading order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SensorId {
    LeftForward,
    LeftDiagonal,
    RightDiagonal,
    RightForward,
}

impl SensorId {
    pub const ALL: [SensorId; 4] = [
        SensorId::LeftForward,
        SensorId::LeftDiagonal,
        SensorId::RightDiagonal,
        SensorId::RightForward,
    ];

    pub fn iter() -> Iter<'static, SensorId> {
        static SENSORS: [SensorId; 4] = SensorId::ALL;
        SENSORS.iter()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn tip(self) -> MousePoint {
        match self {
            SensorId::LeftForward => MousePoint::SensorForwardLeftTip,
            SensorId::LeftDiagonal => MousePoint::SensorDiagonalLeftTip,
            SensorId::RightDiagonal => MousePoint::SensorDiagonalRightTip,
            SensorId::RightForward => MousePoint::SensorForwardRightTip,
        }
    }

    pub fn back(self) -> MousePoint {
        match self {
            SensorId::LeftForward => MousePoint::SensorForwardLeftBack,
            SensorId::LeftDiagonal => MousePoint::SensorDiagonalLeftBack,
            SensorId::RightDiagonal => MousePoint::SensorDiagonalRightBack,
            SensorId::RightForward => MousePoint::SensorForwardRightBack,
        }
    }
}
