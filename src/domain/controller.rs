//! Closed-loop PD controller turning the mouse 90° clockwise on the spot.
//!
//! The controller only looks at the wheel encoders. Both wheels are driven until their accumulated
//! count reaches the mouse's `encoder_count_per_turn`; the left wheel counts up, the right wheel is
//! driven backwards and counts down.

use thiserror::Error;
use tracing::debug;

use super::{encoder_delta, Mouse, Position, PWM_FULL_SCALE};

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct PdGains {
    pub kp: f64,
    pub kd: f64,
}

impl PdGains {
    pub const fn new(kp: f64, kd: f64) -> Self {
        Self { kp, kd }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TurnState {
    BothActive,
    /// The left wheel reached its target first; only the right wheel is still driving.
    LeftOnly,
    /// The right wheel reached its target first; only the left wheel is still driving.
    RightOnly,
    Done,
}

impl TurnState {
    fn from_flags(left_done: bool, right_done: bool) -> Self {
        match (left_done, right_done) {
            (false, false) => TurnState::BothActive,
            (true, false) => TurnState::LeftOnly,
            (false, true) => TurnState::RightOnly,
            (true, true) => TurnState::Done,
        }
    }

    pub fn left_active(self) -> bool {
        matches!(self, TurnState::BothActive | TurnState::RightOnly)
    }

    pub fn right_active(self) -> bool {
        matches!(self, TurnState::BothActive | TurnState::LeftOnly)
    }
}

/// Result of a completed turn.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct TurnOutcome {
    /// Sum of the absolute proportional and derivative errors of both wheels over all ticks.
    pub total_error: f64,
    /// Distance the center of rotation moved during the turn, in mm.
    pub center_shift: f64,
    /// Final orientation minus the nominal -90°, in degrees.
    pub angle_error: f64,
    pub ticks: u64,
}

#[derive(Error, Clone, Copy, Debug, PartialEq)]
pub enum TurnError {
    #[error("turn did not converge within {ticks} ticks (state {state:?})")]
    DidNotConverge { ticks: u64, state: TurnState },
}

/// Tick-by-tick state of one turn.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnController {
    base_speed: f64,
    gains: PdGains,
    dt_millis: f64,
    target: f64,
    left_count: f64,
    right_count: f64,
    previous_left_error: f64,
    previous_right_error: f64,
    total_error: f64,
    ticks: u64,
    state: TurnState,
    start: Position,
}

impl TurnController {
    pub fn new(mouse: &Mouse, base_speed: f64, gains: PdGains, dt_millis: f64) -> Self {
        let controller = Self {
            base_speed,
            gains,
            dt_millis,
            target: f64::from(mouse.encoder_count_per_turn()),
            left_count: 0.0,
            right_count: 0.0,
            previous_left_error: 0.0,
            previous_right_error: 0.0,
            total_error: 0.0,
            ticks: 0,
            state: TurnState::BothActive,
            start: mouse.position(),
        };
        controller.with_encoder_counts(0.0, 0.0)
    }

    /// Start from already accumulated encoder counts (right count is negative).
    pub fn with_encoder_counts(mut self, left: f64, right: f64) -> Self {
        self.left_count = left;
        self.right_count = right;
        self.state = self.current_state();
        self
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn left_count(&self) -> f64 {
        self.left_count
    }

    pub fn right_count(&self) -> f64 {
        self.right_count
    }

    pub fn total_error(&self) -> f64 {
        self.total_error
    }

    /// Run one control tick and advance `mouse` by one drive step. Does nothing once done.
    pub fn step(&mut self, mouse: &mut Mouse) -> TurnState {
        if self.state == TurnState::Done {
            return self.state;
        }

        let left_error = self.target - self.left_count.trunc();
        let right_error = self.target + self.right_count.trunc();
        let left_derivative = left_error - self.previous_left_error;
        let right_derivative = right_error - self.previous_right_error;
        self.previous_left_error = left_error;
        self.previous_right_error = right_error;
        self.total_error += left_error.abs()
            + right_error.abs()
            + left_derivative.abs()
            + right_derivative.abs();

        let left_command = if self.state.left_active() {
            self.command(left_error, left_derivative)
        } else {
            0.0
        };
        let right_command = if self.state.right_active() {
            self.command(right_error, right_derivative)
        } else {
            0.0
        };

        mouse.drive_step(left_command, -right_command, self.dt_millis);

        if self.state.left_active() {
            self.left_count += encoder_delta(left_command, self.dt_millis);
        }
        if self.state.right_active() {
            self.right_count -= encoder_delta(right_command, self.dt_millis);
        }
        self.ticks += 1;

        let state = self.current_state();
        if state != self.state {
            debug!(
                tick = self.ticks,
                ?state,
                left = self.left_count,
                right = self.right_count,
                "turn state changed"
            );
            self.state = state;
        }
        self.state
    }

    pub fn outcome(&self, mouse: &Mouse) -> TurnOutcome {
        TurnOutcome {
            total_error: self.total_error,
            center_shift: mouse.position().distance(self.start),
            angle_error: mouse.orientation_degrees() + 90.0,
            ticks: self.ticks,
        }
    }

    fn command(&self, error: f64, derivative: f64) -> f64 {
        let output = self.gains.kp * error + self.gains.kd * derivative;
        (self.base_speed + output).trunc().clamp(0.0, PWM_FULL_SCALE)
    }

    fn current_state(&self) -> TurnState {
        TurnState::from_flags(
            self.left_count >= self.target,
            self.right_count <= -self.target,
        )
    }
}

impl Mouse {
    /// Turn 90° clockwise until both wheels reach their encoder target.
    ///
    /// There is no tick limit: gains that never reach the target loop forever. Use
    /// [`Mouse::simulate_right_turn_90_bounded`] when that can happen.
    pub fn simulate_right_turn_90(
        &mut self,
        base_speed: f64,
        kp: f64,
        kd: f64,
        dt_millis: f64,
    ) -> TurnOutcome {
        let mut controller = TurnController::new(self, base_speed, PdGains::new(kp, kd), dt_millis);
        while controller.step(self) != TurnState::Done {}
        self.finish_turn(&controller)
    }

    pub fn simulate_right_turn_90_bounded(
        &mut self,
        base_speed: f64,
        gains: PdGains,
        dt_millis: f64,
        max_ticks: u64,
    ) -> Result<TurnOutcome, TurnError> {
        let mut controller = TurnController::new(self, base_speed, gains, dt_millis);
        while controller.state() != TurnState::Done {
            if controller.ticks() >= max_ticks {
                return Err(TurnError::DidNotConverge {
                    ticks: controller.ticks(),
                    state: controller.state(),
                });
            }
            controller.step(self);
        }
        Ok(self.finish_turn(&controller))
    }

    fn finish_turn(&self, controller: &TurnController) -> TurnOutcome {
        let outcome = controller.outcome(self);
        debug!(
            ticks = outcome.ticks,
            angle_error = outcome.angle_error,
            center_shift = outcome.center_shift,
            "turn finished"
        );
        outcome
    }
}
