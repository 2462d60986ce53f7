//! Micromouse maze simulator.
//!
//! Builds lattice mazes out of shared posts and walls, scans them with the mouse's four infrared
//! sensors and simulates a closed-loop 90° turn on the wheel encoders. [`sweep`] runs the turn
//! over whole grids of controller parameters.


pub mod domain;
pub mod sweep;

pub use domain::{
    distance_to_adc, Maze, MazeBuilder, MazeConfig, MazeError, Mouse, MouseConfig, PdGains,
    SensorId, SensorReadings, TurnError, TurnOutcome, WallGrid,
};
