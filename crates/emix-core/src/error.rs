//! Error type for case loading and validation.
//!
//! Everything that can go wrong with a case on disk funnels into
//! [`EmixError`]. The solver and model layers carry their own error enums
//! (`SolverError`, `ModelError`) and cross into `anyhow` at the CLI
//! boundary, so this type stays small and case-specific.

use thiserror::Error;

/// Failure while loading or checking a case.
#[derive(Debug, Error)]
pub enum EmixError {
    /// Reading the case file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The case file is not valid TOML for the expected schema.
    #[error("malformed case file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The case deserialized but its contents are inconsistent.
    #[error("invalid case: {0}")]
    Validation(String),
}

/// Result alias for case operations.
pub type EmixResult<T> = Result<T, EmixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_names_the_offending_asset() {
        let err = EmixError::Validation("demand 'load' profile has 1 entries".into());
        assert!(err.to_string().contains("invalid case"));
        assert!(err.to_string().contains("demand 'load'"));
    }

    #[test]
    fn io_and_toml_errors_convert() {
        let io: EmixError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such case").into();
        assert!(matches!(io, EmixError::Io(_)));

        let bad = toml::from_str::<std::collections::BTreeMap<String, u32>>("x = \"y\"");
        let parse: EmixError = bad.unwrap_err().into();
        assert!(matches!(parse, EmixError::Parse(_)));
        assert!(parse.to_string().contains("malformed case file"));
    }
}
