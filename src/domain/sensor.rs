//! Infrared distance sensor model.
//!
//! A sensor is a ray starting at its tip and pointing away from its back. A reading is the
//! distance from the tip to the nearest visible surface the ray crosses, or `None` when nothing is
//! in view.

use nalgebra::{Matrix2, Vector2};

use super::{LineSegment, Position, SensorId};

// Exponential fit of the sensor's output voltage over distance in cm.
const VOLTAGE_AMPLITUDE: f64 = 2.71272;
const VOLTAGE_DECAY: f64 = 0.858585;
// 2.2 kΩ / (1 kΩ + 2.2 kΩ) divider into a 1.8 V, 10-bit converter.
const DIVIDER_RATIO: f64 = 2.2 / 3.2;
const ADC_REFERENCE_VOLTAGE: f64 = 1.8;
const ADC_FULL_SCALE: f64 = 1024.0;

/// Transient ray; never stored between queries.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Ray {
    origin: Position,
    direction: Position,
}

impl Ray {
    pub fn new(origin: Position, direction: Position) -> Self {
        Self { origin, direction }
    }

    /// Ray fired from `tip` in the direction `tip - back` (not normalized).
    pub fn from_sensor(tip: Position, back: Position) -> Self {
        Self::new(tip, tip - back)
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn direction(&self) -> Position {
        self.direction
    }

    /// Distance from the origin to where the ray crosses `segment`.
    ///
    /// Solves `origin + t·direction = start + u·(end - start)`. The segment is hit for `t ≥ 0` and
    /// `0 ≤ u ≤ 1`. A singular system (ray parallel to the segment) is no hit.
    pub fn distance_to(&self, segment: &LineSegment) -> Option<f64> {
        let segment_direction = segment.direction();
        let a = Matrix2::new(
            self.direction.x(),
            -segment_direction.x(),
            self.direction.y(),
            -segment_direction.y(),
        );
        let b = Vector2::from(segment.start() - self.origin);
        let solution = a.lu().solve(&b)?;
        let (t, u) = (solution.x, solution.y);

        if t >= 0.0 && (0.0..=1.0).contains(&u) {
            Some(t.abs() * self.direction.norm())
        } else {
            None
        }
    }
}

/// One reading per sensor; `None` means no surface in view, which is distinct from a zero
/// distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct SensorReadings([Option<f64>; 4]);

impl SensorReadings {
    pub fn new(readings: [Option<f64>; 4]) -> Self {
        Self(readings)
    }

    pub fn from_fn(mut f: impl FnMut(SensorId) -> Option<f64>) -> Self {
        Self(SensorId::ALL.map(&mut f))
    }

    pub fn get(&self, sensor: SensorId) -> Option<f64> {
        self.0[sensor.index()]
    }

    pub fn left_forward(&self) -> Option<f64> {
        self.get(SensorId::LeftForward)
    }

    pub fn left_diagonal(&self) -> Option<f64> {
        self.get(SensorId::LeftDiagonal)
    }

    pub fn right_diagonal(&self) -> Option<f64> {
        self.get(SensorId::RightDiagonal)
    }

    pub fn right_forward(&self) -> Option<f64> {
        self.get(SensorId::RightForward)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorId, Option<f64>)> + '_ {
        SensorId::iter().map(|s| (*s, self.get(*s)))
    }

    /// Converter codes for every present reading.
    pub fn adc_codes(&self) -> [Option<u16>; 4] {
        self.0.map(|reading| reading.map(distance_to_adc))
    }
}

impl From<SensorReadings> for [Option<f64>; 4] {
    fn from(value: SensorReadings) -> Self {
        value.0
    }
}

/// Raw converter code the real sensor would produce at `distance_mm`, in `0..=1024`.
///
/// Out-of-range distances saturate instead of failing.
pub fn distance_to_adc(distance_mm: f64) -> u16 {
    let voltage = VOLTAGE_AMPLITUDE * VOLTAGE_DECAY.powf(distance_mm / 10.0);
    let code = (voltage * DIVIDER_RATIO / ADC_REFERENCE_VOLTAGE * ADC_FULL_SCALE).round();
    code.clamp(0.0, ADC_FULL_SCALE) as u16
}
