//! Formula evaluator boundary.
//!
//! Expression-driven modifiers and stats delegate their arithmetic to a
//! pluggable evaluator: expression text plus a fixed, ordered list of
//! variable names compiles once into a [`CompiledFormula`], which is then
//! evaluated with one numeric value per variable. The core never inspects
//! the expression grammar; any real evaluator (or a test stub) can be
//! plugged in behind these traits.

use crate::error::EvalError;

/// An external expression-evaluation capability.
///
/// Implementations parse an expression against a fixed set of variable
/// names. Compilation happens once per expression; the compiled form is
/// reused for every application.
pub trait FormulaEvaluator {
    /// Compile `expression` with the given ordered variable names.
    fn compile(
        &self,
        expression: &str,
        variables: &[&str],
    ) -> Result<Box<dyn CompiledFormula>, EvalError>;
}

/// A compiled expression ready for repeated evaluation.
pub trait CompiledFormula {
    /// Evaluate with one value per variable, in the order the variables
    /// were given at compile time.
    fn evaluate(&self, values: &[f64]) -> Result<f64, EvalError>;
}
