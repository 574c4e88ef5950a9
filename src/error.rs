//! Error types.
//!
//! Most failure modes in this engine are recoverable by design: they are
//! logged and degrade to "this modifier/stat contributed nothing" (see
//! the fail-open paths in [`modifier`](crate::modifier) and
//! [`stat`](crate::stat)). The enums here cover the few places where a
//! caller can actually act on the failure: expression-input wiring and
//! the external formula-evaluator boundary.

use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[String]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.join(" -> ")
}

/// Errors surfaced to callers of the stat layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatError {
    /// Binding an input to an expression stat would create a dependency
    /// cycle.
    ///
    /// Contains the labels of the stats involved, starting and ending at
    /// the stat whose binding was rejected.
    #[error("input cycle detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<String> },

    /// An expression-only operation was invoked on a simple stat.
    #[error("stat \"{stat}\" does not take expression inputs")]
    NotExpression { stat: String },
}

/// Errors produced by the external formula evaluator.
///
/// The core never inspects the expression grammar; it only relays the
/// evaluator's diagnostics. Evaluation failures inside the recomputation
/// pipeline are logged and degraded, never propagated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// The expression failed to parse.
    #[error("failed to parse expression `{expression}`: {message}")]
    Parse { expression: String, message: String },

    /// The compiled expression failed to evaluate.
    #[error("failed to evaluate expression: {message}")]
    Evaluate { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_display() {
        let err = StatError::Cycle {
            path: vec!["atk".into(), "dps".into(), "atk".into()],
        };
        let display = err.to_string();
        assert!(display.contains("cycle"));
        assert!(display.contains("atk -> dps -> atk"));
    }

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::Parse {
            expression: "input +".into(),
            message: "unexpected end of input".into(),
        };
        assert!(err.to_string().contains("input +"));
    }
}
