use rand::Rng;
use serde::Serialize;

use crate::errors::SelectionError;
use crate::types::ScratchCardPrize;

#[derive(Debug, Clone, Serialize)]
pub struct ProbabilityCheck {
    pub valid: bool,
    pub total: f64,
    pub message: Option<String>,
}

/// Draws one scratch-card prize, each prize weighted by its configured
/// probability. Every call is an independent draw.
pub fn pick_weighted(options: &[ScratchCardPrize]) -> Result<&ScratchCardPrize, SelectionError> {
    pick_weighted_with_rng(options, &mut rand::thread_rng())
}

pub fn pick_weighted_with_rng<'a, R: Rng>(
    options: &'a [ScratchCardPrize],
    rng: &mut R,
) -> Result<&'a ScratchCardPrize, SelectionError> {
    if options.is_empty() {
        return Err(SelectionError::EmptyInput);
    }

    let total: f64 = options.iter().map(|o| o.probability).sum();
    if total <= 0.0 {
        // nothing configured yet, every prize gets an equal chance
        return Ok(&options[rng.gen_range(0..options.len())]);
    }

    let roll = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for option in options {
        cumulative += option.probability;
        if cumulative >= roll {
            return Ok(option);
        }
    }

    // float accumulation can land a hair short of the final boundary
    Ok(&options[options.len() - 1])
}

/// Advisory check used when editing a scratch-card configuration; selection
/// itself does not require the probabilities to sum to 100.
pub fn validate_probabilities(options: &[ScratchCardPrize]) -> ProbabilityCheck {
    let total: f64 = options.iter().map(|o| o.probability).sum();
    if (total - 100.0).abs() < 0.01 {
        ProbabilityCheck {
            valid: true,
            total,
            message: None,
        }
    } else {
        ProbabilityCheck {
            valid: false,
            total,
            message: Some(format!(
                "prize probabilities add up to {}, expected 100",
                total
            )),
        }
    }
}
