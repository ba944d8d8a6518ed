//! Integrating scorer: turns one sung note into a graded, explained result.

pub mod engine;
pub mod feedback;
pub mod grade;
pub mod result;
pub mod session;
pub mod training;

pub use engine::ScoringEngine;
pub use grade::{Grade, PerformanceLevel};
pub use result::{AttemptInput, Component, ComponentScores, ScoreResult, ScoreStatus};
pub use session::{Achievement, SessionSnapshot, SessionState};
pub use training::TrainingSession;
