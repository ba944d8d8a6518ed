//! Per-attempt analyzers feeding the scoring engine.

pub mod consistency;
pub mod correction;
pub mod direction;
pub mod interval;
pub mod mastery;
pub mod speed;

pub use consistency::{ConsistencyAnalysis, ConsistencyTracker, Recommendation};
pub use correction::{correct_octave, HarmonicCorrection, TargetRange};
pub use direction::{Direction, DirectionAnalysis, DirectionClassifier};
pub use interval::{IntervalAnalysis, IntervalClassifier, IntervalType};
pub use mastery::{MasteryLevel, MasterySnapshot, Trend};
pub use speed::{evaluate_speed, SpeedAnalysis, SpeedRating};
