//! Relative-pitch training core: judges sung notes against a reference
//! tone and rolls the judgments into grades and feedback.
//!
//! The scoring pipeline lives in [`analysis`] and [`scoring`]; it does no
//! I/O. [`storage`] and [`report`] sit on top of it for the command-line
//! front end.

pub mod analysis;
pub mod config;
pub mod error;
pub mod paths;
pub mod report;
pub mod scale;
pub mod scoring;
pub mod storage;
pub mod util;

pub use error::{ConfigError, ErrorKind, ScaleError, ScoringError};
pub use scoring::{AttemptInput, ScoreResult, ScoringEngine};
