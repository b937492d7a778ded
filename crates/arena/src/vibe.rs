use std::fmt;

/// Collective mood derived from the rolling average sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VibeLabel {
    Euphoric,
    Chill,
    Neutral,
    Tense,
    Chaotic,
}

impl VibeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Euphoric => "EUPHORIC",
            Self::Chill => "CHILL",
            Self::Neutral => "NEUTRAL",
            Self::Tense => "TENSE",
            Self::Chaotic => "CHAOTIC",
        }
    }
}

impl fmt::Display for VibeLabel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

struct Threshold {
    floor: f64,
    inclusive: bool,
    label: VibeLabel,
}

// Checked top to bottom; anything below the last floor is chaotic.
const THRESHOLDS: [Threshold; 4] = [
    Threshold {
        floor: 0.4,
        inclusive: false,
        label: VibeLabel::Euphoric,
    },
    Threshold {
        floor: 0.1,
        inclusive: false,
        label: VibeLabel::Chill,
    },
    Threshold {
        floor: -0.1,
        inclusive: true,
        label: VibeLabel::Neutral,
    },
    Threshold {
        floor: -0.4,
        inclusive: true,
        label: VibeLabel::Tense,
    },
];

// Means like (0.6 + 0.0 - 0.9) / 3 land a few ulps off -0.1.
const SCORE_PRECISION: f64 = 1e9;

/// Maps NaN to neutral and clamps into [-1, 1]. Infinities saturate.
fn clamp_average(average_score: f64) -> f64 {
    if average_score.is_nan() {
        0.0
    } else {
        average_score.clamp(-1.0, 1.0)
    }
}

/// Clamps a computed mean, then rounds it to 1e-9 to absorb float noise.
fn normalize_average(average_score: f64) -> f64 {
    let score = clamp_average(average_score);
    (score * SCORE_PRECISION).round() / SCORE_PRECISION
}

/// Compares the value as given; rounding belongs to the mean, see [`VibeState::from_average`].
pub fn classify(average_score: f64) -> VibeLabel {
    let score = clamp_average(average_score);
    THRESHOLDS
        .iter()
        .find(|threshold| {
            if threshold.inclusive {
                score >= threshold.floor
            } else {
                score > threshold.floor
            }
        })
        .map_or(VibeLabel::Chaotic, |threshold| threshold.label)
}

/// Linear remap of [-1, 1] onto [0, 1] for meters and gradients.
pub fn display_fraction(average_score: f64) -> f64 {
    (clamp_average(average_score) + 1.0) / 2.0
}

/// Read-only view of the current mood handed to display collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VibeState {
    /// Window mean rounded to 1e-9 and clamped to [-1, 1]; NaN reads as 0.
    pub average_score: f64,
    pub label: VibeLabel,
    pub display_fraction: f64,
}

impl VibeState {
    /// Normalizes the raw mean once; label and fraction are derived from the normalized value.
    pub fn from_average(average_score: f64) -> Self {
        let average_score = normalize_average(average_score);
        Self {
            average_score,
            label: classify(average_score),
            display_fraction: display_fraction(average_score),
        }
    }
}

impl Default for VibeState {
    fn default() -> Self {
        Self::from_average(0.0)
    }
}
