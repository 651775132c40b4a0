//! Error taxonomy shared by every stage of a model build.
//!
//! All variants are configuration errors: they are raised while the model is
//! being assembled (or while results are requested), carry the offending
//! name, and are never retried. Solver terminations that are not optimal are
//! not errors at build time; they surface as [`ModelError::ResultsUnavailable`]
//! only when somebody asks for results.

use crate::dimension::Dimension;
use thiserror::Error;

/// Unified error type for model construction and result extraction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Two labels of the same axis collide.
    #[error("duplicate label '{label}' on {dimension} axis")]
    DuplicateLabel { dimension: Dimension, label: String },

    /// A second index was registered for an axis that already has one.
    #[error("an index for the {0} axis already exists")]
    DuplicateDimension(Dimension),

    /// A label lookup missed.
    #[error("unknown label '{label}' on {dimension} axis")]
    UnknownLabel { dimension: Dimension, label: String },

    #[error("variable '{0}' is already declared")]
    DuplicateVariable(String),

    #[error("constraint '{0}' is already attached")]
    DuplicateConstraint(String),

    /// A required profile has no entry for an asset in a scenario.
    #[error("scenario '{scenario}' has no {profile} profile for '{asset}'")]
    MissingProfile {
        profile: String,
        asset: String,
        scenario: String,
    },

    #[error(
        "{profile} profile for '{asset}' in scenario '{scenario}' has {actual} values, \
         expected {expected}"
    )]
    ProfileLengthMismatch {
        profile: String,
        asset: String,
        scenario: String,
        expected: usize,
        actual: usize,
    },

    /// Something was requested for an asset class the portfolio does not hold.
    #[error("portfolio has no {0} assets")]
    MissingAssetClass(Dimension),

    #[error("objective has no terms: portfolio contains neither generators nor priced markets")]
    EmptyObjective,

    #[error("model has already been built")]
    AlreadyBuilt,

    /// Results were requested from a solve that did not finish successfully.
    #[error("results unavailable: solver status '{status}', termination '{termination}'")]
    ResultsUnavailable { status: String, termination: String },

    #[error("shape mismatch for '{name}': expected {expected} values, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Input data rejected before any build step.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("solver error: {0}")]
    Solver(String),
}

/// Convenience alias for results using [`ModelError`].
pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    pub fn validation(message: impl Into<String>) -> Self {
        ModelError::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = ModelError::DuplicateLabel {
            dimension: Dimension::Generator,
            label: "gas".into(),
        };
        assert!(err.to_string().contains("gas"));
        assert!(err.to_string().contains("generator"));

        let err = ModelError::ProfileLengthMismatch {
            profile: "load".into(),
            asset: "city".into(),
            scenario: "base".into(),
            expected: 24,
            actual: 23,
        };
        let msg = err.to_string();
        assert!(msg.contains("city"));
        assert!(msg.contains("24"));
        assert!(msg.contains("23"));
    }

    #[test]
    fn question_mark_propagates() {
        fn inner() -> ModelResult<()> {
            Err(ModelError::AlreadyBuilt)
        }
        fn outer() -> ModelResult<u8> {
            inner()?;
            Ok(1)
        }
        assert_eq!(outer(), Err(ModelError::AlreadyBuilt));
    }
}
