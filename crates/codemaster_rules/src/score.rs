//! Guess scoring.

use std::collections::HashMap;

use derive_more::Display;
use serde::Serialize;
use tracing::instrument;

use crate::Code;

/// Result of comparing a guess against a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize)]
#[display("{black} black, {white} white")]
pub struct Score {
    /// Symbols matching in both value and position.
    pub black: usize,
    /// Symbols present in the secret but at a different position.
    pub white: usize,
}

impl Score {
    /// True when every one of `length` positions matched exactly.
    pub fn is_exact(&self, length: usize) -> bool {
        self.black == length
    }
}

/// Error returned when the evaluator receives malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum EvaluateError {
    /// Secret and guess differ in length.
    #[display("Invalid input: secret has {secret_len} symbols, guess has {guess_len}")]
    InvalidInput {
        /// Length of the secret.
        secret_len: usize,
        /// Length of the guess.
        guess_len: usize,
    },
}

impl std::error::Error for EvaluateError {}

/// Scores `guess` against `secret` using Mastermind rules.
///
/// Exact matches are counted first and removed from both sides. Each
/// remaining secret symbol can then satisfy at most one white match.
///
/// # Errors
///
/// Returns [`EvaluateError::InvalidInput`] if the two strings differ in length.
#[instrument(level = "trace")]
pub fn evaluate(secret: &str, guess: &str) -> Result<Score, EvaluateError> {
    let secret: Vec<char> = secret.chars().collect();
    let guess: Vec<char> = guess.chars().collect();

    if secret.len() != guess.len() {
        return Err(EvaluateError::InvalidInput {
            secret_len: secret.len(),
            guess_len: guess.len(),
        });
    }

    let mut score = Score::default();
    let mut consumed = vec![false; secret.len()];
    let mut unmatched: HashMap<char, usize> = HashMap::new();

    for (i, (s, g)) in secret.iter().zip(&guess).enumerate() {
        if s == g {
            score.black += 1;
            consumed[i] = true;
        } else {
            *unmatched.entry(*s).or_default() += 1;
        }
    }

    for (g, _) in guess.iter().zip(&consumed).filter(|(_, c)| !**c) {
        if let Some(count) = unmatched.get_mut(g)
            && *count > 0
        {
            *count -= 1;
            score.white += 1;
        }
    }

    Ok(score)
}

/// Scores two validated codes.
///
/// # Errors
///
/// Returns [`EvaluateError::InvalidInput`] if the codes differ in length.
pub fn score(secret: &Code, guess: &Code) -> Result<Score, EvaluateError> {
    evaluate(secret.as_str(), guess.as_str())
}
