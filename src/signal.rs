//! Level-aware signal scoring
//!
//! A numeric score starts from a caller-supplied seed (momentum, external
//! indicators) and is adjusted by how close the latest price sits to the
//! strongest nearby levels. The final score maps onto a five-step label.

use crate::detectors::levels::LevelSet;

/// Signal label derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SignalLabel {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl SignalLabel {
    /// Map a composite score onto a label.
    pub fn from_score(score: f64) -> Self {
        if score >= 10.0 {
            SignalLabel::StrongBuy
        } else if score >= 5.0 {
            SignalLabel::Buy
        } else if score > -5.0 {
            SignalLabel::Neutral
        } else if score > -10.0 {
            SignalLabel::Sell
        } else {
            SignalLabel::StrongSell
        }
    }

    /// Display color for the label.
    pub fn color(&self) -> &'static str {
        match self {
            SignalLabel::StrongBuy => "darkgreen",
            SignalLabel::Buy => "green",
            SignalLabel::Neutral => "gray",
            SignalLabel::Sell => "orange",
            SignalLabel::StrongSell => "red",
        }
    }
}

/// Composite signal with the notes that produced it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SignalResult {
    pub label: SignalLabel,
    pub score: f64,
    /// Human-readable notes for each scoring contribution
    pub rationale: Vec<String>,
    pub color: String,
}

/// Adjust `seed` by level proximity and map the result onto a label.
///
/// Support within 2% of the close adds 5 points; resistance within 2%
/// subtracts 5. Resistance between 2% and 5% away still leaves room to run
/// and adds 2. Without a close the seed passes through unchanged.
pub fn score_levels(levels: &LevelSet, last_close: Option<f64>, seed: f64) -> SignalResult {
    let mut score = seed;
    let mut rationale = Vec::new();

    if let Some(close) = last_close.filter(|c| c.abs() > f64::EPSILON) {
        if let Some(support) = levels.nearest_support(close) {
            let distance = (close - support.price) / close * 100.0;
            if distance < 2.0 {
                score += 5.0;
                rationale.push(format!(
                    "Near strong support ({:.2}, {} touches)",
                    support.price, support.touches
                ));
            } else if distance < 5.0 {
                rationale.push(format!("Support nearby at {:.2}", support.price));
            }
        }
        if let Some(resistance) = levels.nearest_resistance(close) {
            let distance = (resistance.price - close) / close * 100.0;
            if distance < 2.0 {
                score -= 5.0;
                rationale.push(format!(
                    "Near strong resistance ({:.2}, {} touches)",
                    resistance.price, resistance.touches
                ));
            } else if distance < 5.0 {
                score += 2.0;
                rationale.push(format!("Room to run toward {:.2}", resistance.price));
            }
        }
    }

    let label = SignalLabel::from_score(score);
    SignalResult {
        label,
        score,
        rationale,
        color: label.color().to_string(),
    }
}
