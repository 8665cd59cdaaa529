use serde::{Deserialize, Serialize};

/// Banding shared by every 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreLabel::Excellent => "Excellent",
            ScoreLabel::Good => "Good",
            ScoreLabel::Fair => "Fair",
            ScoreLabel::Poor => "Poor",
        }
    }
}

pub fn score_label(score: i32) -> ScoreLabel {
    match score {
        80..=100 => ScoreLabel::Excellent,
        60..=79 => ScoreLabel::Good,
        40..=59 => ScoreLabel::Fair,
        _ => ScoreLabel::Poor,
    }
}

pub fn clamp_score(score: i32) -> i32 {
    score.clamp(0, 100)
}
