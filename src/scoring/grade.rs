use std::fmt;

use serde::{Deserialize, Serialize};

/// Ten-band letter grade. Declared worst to best so `Ord` reads naturally:
/// `Grade::S > Grade::A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Grade {
    #[default]
    F,
    D,
    #[serde(rename = "D+")]
    DPlus,
    C,
    #[serde(rename = "C+")]
    CPlus,
    B,
    #[serde(rename = "B+")]
    BPlus,
    A,
    #[serde(rename = "A+")]
    APlus,
    S,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 95.0 => Grade::S,
            s if s >= 90.0 => Grade::APlus,
            s if s >= 85.0 => Grade::A,
            s if s >= 80.0 => Grade::BPlus,
            s if s >= 75.0 => Grade::B,
            s if s >= 70.0 => Grade::CPlus,
            s if s >= 65.0 => Grade::C,
            s if s >= 60.0 => Grade::DPlus,
            s if s >= 55.0 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Five-band summary of a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    #[default]
    Poor,
    NeedsImprovement,
    Fair,
    Good,
    Excellent,
}

impl PerformanceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            PerformanceLevel::Excellent
        } else if score >= 75.0 {
            PerformanceLevel::Good
        } else if score >= 60.0 {
            PerformanceLevel::Fair
        } else if score >= 40.0 {
            PerformanceLevel::NeedsImprovement
        } else {
            PerformanceLevel::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "excellent",
            PerformanceLevel::Good => "good",
            PerformanceLevel::Fair => "fair",
            PerformanceLevel::NeedsImprovement => "needs improvement",
            PerformanceLevel::Poor => "poor",
        }
    }
}
