//! The domain module holds the simulation itself: the maze with its shared obstacles, the mouse as
//! a rigid body with four distance sensors, the drive kinematics and the turn controller.
//!
//! Nothing in here depends on how results are consumed; sweeps and any plotting build on the pure
//! values returned from these types.

mod basis;
mod controller;
mod kinematics;
mod maze;
mod mouse;
mod obstacle;
mod sensor;

pub use basis::{Angle, Position, Velocity};
pub use controller::{PdGains, TurnController, TurnError, TurnOutcome, TurnState};
pub use kinematics::{
    encoder_count_per_move_forward, encoder_delta, wheel_speed, ENCODER_EDGES_PER_MM,
    ENCODER_EDGES_PER_REVOLUTION, PWM_FULL_SCALE, WHEEL_CIRCUMFERENCE, WHEEL_REVOLUTIONS_PER_MS,
};
pub use maze::{CellIndex, Maze, MazeBuilder, MazeCell, MazeConfig, MazeError, ObstacleId, WallGrid};
pub use mouse::{Mouse, MouseConfig, MousePoint, SensorId};
pub use obstacle::{LineSegment, Obstacle, ObstacleError, ObstacleKind};
pub use sensor::{distance_to_adc, Ray, SensorReadings};
