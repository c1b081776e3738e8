use serde::{Deserialize, Serialize};

/// Display tier for a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyBand {
    Excellent,
    Good,
    Caution,
    Risky,
}

impl SafetyBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.5 {
            SafetyBand::Excellent
        } else if score >= 7.0 {
            SafetyBand::Good
        } else if score >= 5.0 {
            SafetyBand::Caution
        } else {
            SafetyBand::Risky
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SafetyBand::Excellent => "excellent",
            SafetyBand::Good => "good",
            SafetyBand::Caution => "use caution",
            SafetyBand::Risky => "risky",
        }
    }
}
