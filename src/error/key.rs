use thiserror::Error;

/// Failures of the composite lookup key codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("cannot encode composite key part '{part}': {reason}")]
    Encoding { part: String, reason: String },

    #[error("cannot decode composite key '{key}': expected {expected} parts, found {found}")]
    Decoding {
        key: String,
        expected: usize,
        found: usize,
    },
}

impl KeyError {
    pub fn encoding(part: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encoding {
            part: part.into(),
            reason: reason.into(),
        }
    }

    pub fn decoding(key: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::Decoding {
            key: key.into(),
            expected,
            found,
        }
    }
}
