//! Secret codes, guess validation and code generation.

use derive_more::Display;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, instrument};

/// Symbols a code may contain: digits followed by uppercase letters.
pub const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Returns true if `symbol` belongs to [`ALPHABET`].
pub fn is_code_symbol(symbol: char) -> bool {
    symbol.is_ascii_digit() || symbol.is_ascii_uppercase()
}

/// A fixed-length string over [`ALPHABET`].
///
/// Secrets and guesses share this type. A `Code` can only be built through
/// [`Code::parse`] or the generators, so every value is well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Validates `raw` as a code of exactly `length` symbols.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::WrongLength`] if the symbol count differs from
    /// `length`, or [`CodeError::InvalidSymbol`] for the first symbol outside
    /// [`ALPHABET`].
    #[instrument(level = "debug")]
    pub fn parse(raw: &str, length: usize) -> Result<Self, CodeError> {
        let actual = raw.chars().count();
        if actual != length {
            debug!(expected = length, actual, "Rejected code with wrong length");
            return Err(CodeError::WrongLength {
                expected: length,
                actual,
            });
        }

        if let Some((position, symbol)) = raw
            .chars()
            .enumerate()
            .find(|(_, c)| !is_code_symbol(*c))
        {
            debug!(position, ?symbol, "Rejected code with invalid symbol");
            return Err(CodeError::InvalidSymbol { symbol, position });
        }

        Ok(Self(raw.to_string()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of symbols in the code.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the zero-length code.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error produced when a string is not a valid code.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum CodeError {
    /// The string has the wrong number of symbols.
    #[display("Code must be {expected} symbols long, got {actual}")]
    WrongLength {
        /// Required length.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A symbol outside A-Z and 0-9 was found.
    #[display("Symbol {symbol:?} at position {position} is not in A-Z or 0-9")]
    InvalidSymbol {
        /// The offending symbol.
        symbol: char,
        /// Zero-based position of the symbol.
        position: usize,
    },
}

impl std::error::Error for CodeError {}

/// Draws a code of `length` symbols from [`ALPHABET`] using `rng`.
///
/// Symbols are drawn independently and uniformly, with replacement.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Code {
    let code = (0..length)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect();
    Code(code)
}

/// Draws a code of `length` symbols from a freshly seeded generator.
///
/// Each call seeds its own generator from OS entropy, so codes from
/// different sessions are independent.
#[instrument]
pub fn generate(length: usize) -> Code {
    let mut rng = StdRng::from_entropy();
    generate_with(&mut rng, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_digits_and_uppercase() {
        let code = Code::parse("A1Z9", 4).expect("valid code");
        assert_eq!(code.as_str(), "A1Z9");
        assert_eq!(code.len(), 4);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(
            Code::parse("ABC", 4),
            Err(CodeError::WrongLength {
                expected: 4,
                actual: 3
            })
        );
        assert!(Code::parse("ABCDE", 4).is_err());
        assert!(Code::parse("", 4).is_err());
    }

    #[test]
    fn test_parse_rejects_lowercase_and_punctuation() {
        assert_eq!(
            Code::parse("ABcD", 4),
            Err(CodeError::InvalidSymbol {
                symbol: 'c',
                position: 2
            })
        );
        assert!(Code::parse("AB-D", 4).is_err());
        assert!(Code::parse("AB D", 4).is_err());
    }

    #[test]
    fn test_parse_counts_symbols_not_bytes() {
        // Four symbols, one of them multi-byte.
        assert!(matches!(
            Code::parse("ABCÉ", 4),
            Err(CodeError::InvalidSymbol { position: 3, .. })
        ));
    }

    #[test]
    fn test_generated_codes_are_valid() {
        for _ in 0..100 {
            let code = generate(4);
            assert!(Code::parse(code.as_str(), 4).is_ok(), "bad code {code}");
        }
    }

    #[test]
    fn test_generate_with_seeded_rng_is_deterministic() {
        let a = generate_with(&mut StdRng::seed_from_u64(7), 6);
        let b = generate_with(&mut StdRng::seed_from_u64(7), 6);
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn test_generate_covers_alphabet() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.extend(generate_with(&mut rng, 4).as_str().chars());
        }
        assert_eq!(seen.len(), ALPHABET.len());
    }
}
