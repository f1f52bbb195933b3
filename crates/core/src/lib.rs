pub mod config;
pub mod entity;
pub mod error;
pub mod matrix;
pub mod quality;

pub use config::EnvConfig;
pub use entity::*;
pub use error::*;
pub use matrix::{CellWrite, Grid, QualityCounts, ResultMatrix};
pub use quality::Quality;
