//! Score scale handling and the weighted combination policy

use serde::{Deserialize, Serialize};

/// Weight of semantic similarity in the combined score
pub const SEMANTIC_WEIGHT: f32 = 0.6;

/// Weight of explicit skill overlap in the combined score
pub const SKILL_WEIGHT: f32 = 0.4;

/// A score on the `[0, 100]` scale.
///
/// Values only enter through the constructors, so a unit-scale value is
/// rescaled exactly once and a percentage is never scaled again.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(f32);

impl Percent {
    pub const ZERO: Percent = Percent(0.0);
    pub const MAX: Percent = Percent(100.0);

    /// A value already on the `[0, 100]` scale
    pub fn new(value: f32) -> Self {
        Self(clamp_percent(value))
    }

    /// A value on the `[0, 1]` scale
    pub fn from_unit(value: f32) -> Self {
        Self(clamp_percent(value * 100.0))
    }

    /// A value of unknown scale: `<= 1` is treated as unit scale
    pub fn detect(value: f32) -> Self {
        if value <= 1.0 {
            Self::from_unit(value)
        } else {
            Self::new(value)
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// `clamp(0.6 * semantic + 0.4 * skill, 0, 100)`
pub fn combine(semantic: Percent, skill: Percent) -> Percent {
    Percent::new(SEMANTIC_WEIGHT * semantic.value() + SKILL_WEIGHT * skill.value())
}

/// Recommendation band derived from a combined score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBand {
    HighlyRecommended,
    Recommended,
    NeedsEvaluation,
}

impl MatchBand {
    pub fn from_score(score: Percent) -> Self {
        match score.value() {
            s if s >= 80.0 => Self::HighlyRecommended,
            s if s >= 60.0 => Self::Recommended,
            _ => Self::NeedsEvaluation,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::HighlyRecommended => "Highly recommend",
            Self::Recommended => "Recommend further communication",
            Self::NeedsEvaluation => "Further evaluation needed",
        }
    }
}
