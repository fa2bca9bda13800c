//! Analysis errors and warnings

use thiserror::Error;

/// Result alias for analysis passes.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that abort the analysis of one method.
///
/// An error is scoped to the method being analyzed; callers analyzing a
/// whole assembly continue with the remaining methods.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A branch or switch references a label no basic block starts with.
    #[error("method {method}: branch target {label} does not start a basic block")]
    MalformedIr {
        /// The method whose body is malformed.
        method: String,
        /// The unresolvable target label.
        label: String,
    },

    /// An exception table range does not match any instruction span.
    #[error("method {method}: handler range [{start}, {end}) does not cover any instructions")]
    MalformedHandlerRange {
        /// The method whose exception table is malformed.
        method: String,
        /// Start label of the offending range.
        start: String,
        /// End label of the offending range.
        end: String,
    },

    /// A method body required by a transform is missing.
    #[error("method {method}: no body available")]
    MissingBody {
        /// The body-less method.
        method: String,
    },
}

/// A recoverable condition observed during analysis.
///
/// Warnings do not stop an analysis; they mark its result as partial.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnalysisWarning {
    /// The resolver returned nothing for a type reference.
    UnresolvedType {
        /// Rendered reference.
        reference: String,
    },
    /// The resolver returned nothing for a method reference.
    UnresolvedMethod {
        /// Rendered reference.
        reference: String,
    },
    /// The resolver returned nothing for a field reference.
    UnresolvedField {
        /// Rendered reference.
        reference: String,
    },
}

impl std::fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisWarning::UnresolvedType { reference } => {
                write!(f, "unresolved type {reference}")
            }
            AnalysisWarning::UnresolvedMethod { reference } => {
                write!(f, "unresolved method {reference}")
            }
            AnalysisWarning::UnresolvedField { reference } => {
                write!(f, "unresolved field {reference}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::MalformedIr {
            method: "C::M".into(),
            label: "L_0010".into(),
        };
        assert_eq!(
            err.to_string(),
            "method C::M: branch target L_0010 does not start a basic block"
        );
    }

    #[test]
    fn test_warning_display() {
        let warning = AnalysisWarning::UnresolvedField {
            reference: "Node::next".into(),
        };
        assert_eq!(warning.to_string(), "unresolved field Node::next");
    }
}
