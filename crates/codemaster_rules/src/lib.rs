//! Pure code-breaking game logic.
//!
//! Everything in this crate is free of I/O and shared state:
//!
//! - [`Code`]: a validated, fixed-length string over [`ALPHABET`]
//! - [`generate`]: draws a fresh secret code
//! - [`evaluate`]: black/white scoring of a guess against a secret

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod code;
mod score;

pub use code::{ALPHABET, Code, CodeError, generate, generate_with, is_code_symbol};
pub use score::{EvaluateError, Score, evaluate, score};
