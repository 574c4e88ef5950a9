//! Stat modifiers module.
//!
//! A modifier is a stateless transform policy: given a live instance's
//! level and an input value, it produces an output value. Modifiers are
//! immutable after creation and freely shared — one configured modifier
//! is commonly instantiated across many stats — so they are passed around
//! as `Rc<dyn StatModifier>`.

use crate::error::EvalError;
use crate::eval::{CompiledFormula, FormulaEvaluator};
use crate::instance::ModifierInstance;
use crate::matcher::TagMatcher;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::error;

/// Fallback label for modifiers configured without a debug name.
const UNNAMED: &str = "unnamed";

/// Configuration shared by every modifier variant.
///
/// # Examples
///
/// ```rust
/// use stathub::modifier::ModifierConfig;
///
/// let config = ModifierConfig {
///     priority: 10,
///     debug_name: "sharpness".into(),
///     ..ModifierConfig::default()
/// };
/// assert_eq!(config.priority, 10);
/// assert!(!config.persistent_if_global);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifierConfig {
    /// Application order relative to other modifiers on the same stat;
    /// higher priority applies first. Equal priorities apply in
    /// attachment order.
    #[serde(default)]
    pub priority: i32,

    /// Matcher for applicable containers when used globally. Absent means
    /// the modifier can never be used as a global modifier.
    #[serde(default)]
    pub container_matcher: Option<TagMatcher>,

    /// Matcher for applicable stats when used globally. Absent means the
    /// modifier can never be used as a global modifier.
    #[serde(default)]
    pub stat_matcher: Option<TagMatcher>,

    /// Whether, as a global modifier, this keeps attaching to stats of
    /// containers loaded after activation.
    #[serde(default)]
    pub persistent_if_global: bool,

    /// Label used in diagnostics.
    #[serde(default)]
    pub debug_name: String,
}

impl ModifierConfig {
    /// The debug label, falling back to a placeholder when unset.
    pub fn label(&self) -> &str {
        if self.debug_name.is_empty() {
            UNNAMED
        } else {
            &self.debug_name
        }
    }
}

/// A stateless transform policy applied to a stat's value.
///
/// The closed set of variants is [`SimpleModifier`] (flat/percent
/// arithmetic) and [`ExpressionModifier`] (formula-driven). Both check
/// that the instance they are handed actually belongs to them and fail
/// open — returning the input unchanged — on any mismatch or evaluator
/// failure.
pub trait StatModifier {
    /// The shared configuration of this modifier.
    fn config(&self) -> &ModifierConfig;

    /// Modify `input` according to this modifier and the given live
    /// instance.
    fn modify(&self, instance: &ModifierInstance, input: f64) -> f64;

    /// Application priority; higher applies first.
    fn priority(&self) -> i32 {
        self.config().priority
    }

    /// Label used in diagnostics.
    fn debug_name(&self) -> &str {
        self.config().label()
    }

    /// Matcher for applicable containers when used globally.
    fn container_matcher(&self) -> Option<&TagMatcher> {
        self.config().container_matcher.as_ref()
    }

    /// Matcher for applicable stats when used globally.
    fn stat_matcher(&self) -> Option<&TagMatcher> {
        self.config().stat_matcher.as_ref()
    }

    /// Whether this modifier keeps attaching to newly loaded containers
    /// when used globally.
    fn persistent_if_global(&self) -> bool {
        self.config().persistent_if_global
    }
}

/// Identity comparison for shared modifiers.
///
/// Compares the underlying allocations, ignoring vtables, so the same
/// modifier coerced at different sites still compares equal.
pub(crate) fn same_modifier(a: &Rc<dyn StatModifier>, b: &Rc<dyn StatModifier>) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// How a [`SimpleModifier`] applies its base amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierOp {
    /// `input + amount * level`.
    #[default]
    Flat,
    /// `input + input * (amount / 100) * level`; the amount is a
    /// percentage on the 0–100 scale, not 0–1.
    Percent,
}

/// A modifier with two basic additive modification modes.
///
/// The configured amount scales linearly with the instance's level.
///
/// # Examples
///
/// ```rust
/// use stathub::instance::ModifierInstance;
/// use stathub::modifier::SimpleModifier;
/// use std::rc::Rc;
///
/// let modifier: Rc<SimpleModifier> = Rc::new(SimpleModifier::flat(5.0));
/// let instance = ModifierInstance::new(modifier, 2.0);
/// assert_eq!(instance.modify(10.0), 20.0);
///
/// let percent: Rc<SimpleModifier> = Rc::new(SimpleModifier::percent(50.0));
/// let instance = ModifierInstance::new(percent, 2.0);
/// assert_eq!(instance.modify(10.0), 20.0); // 10 + 10 * 0.5 * 2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleModifier {
    #[serde(flatten)]
    config: ModifierConfig,

    /// How `amount` is applied to the input.
    #[serde(default)]
    op: ModifierOp,

    /// The base modification amount, multiplied by the instance level.
    #[serde(default)]
    amount: f64,
}

impl SimpleModifier {
    /// Create a simple modifier with a default configuration.
    pub fn new(op: ModifierOp, amount: f64) -> Self {
        Self {
            config: ModifierConfig::default(),
            op,
            amount,
        }
    }

    /// A flat additive modifier: `input + amount * level`.
    pub fn flat(amount: f64) -> Self {
        Self::new(ModifierOp::Flat, amount)
    }

    /// A percent additive modifier: `input + input * (amount/100) * level`.
    pub fn percent(amount: f64) -> Self {
        Self::new(ModifierOp::Percent, amount)
    }

    /// Create a simple modifier with an explicit configuration.
    pub fn with_config(op: ModifierOp, amount: f64, config: ModifierConfig) -> Self {
        Self { config, op, amount }
    }

    /// The modification mode.
    pub fn op(&self) -> ModifierOp {
        self.op
    }

    /// The base modification amount.
    pub fn amount(&self) -> f64 {
        self.amount
    }
}

impl StatModifier for SimpleModifier {
    fn config(&self) -> &ModifierConfig {
        &self.config
    }

    fn modify(&self, instance: &ModifierInstance, input: f64) -> f64 {
        if !instance.belongs_to((self as *const Self).cast()) {
            error!(
                expected = self.debug_name(),
                actual = instance.modifier().debug_name(),
                "modifier instance applied through the wrong parent modifier; ignored"
            );
            return input;
        }

        match self.op {
            ModifierOp::Flat => input + self.amount * instance.level(),
            ModifierOp::Percent => input + input * (self.amount / 100.0) * instance.level(),
        }
    }
}

/// Variable names bound by every expression modifier, in compile order.
const EXPR_VARIABLES: [&str; 2] = ["input", "level"];

/// A formula-driven modifier.
///
/// The configured expression is compiled once, lazily, against the
/// variable names `input` and `level`; each application evaluates it with
/// the current input value and instance level. Compile or evaluate
/// failures are logged and the input passes through unchanged.
pub struct ExpressionModifier {
    config: ModifierConfig,
    expression: String,
    evaluator: Rc<dyn FormulaEvaluator>,
    compiled: RefCell<Option<Box<dyn CompiledFormula>>>,
    compile_failed: Cell<bool>,
}

impl ExpressionModifier {
    /// Create an expression modifier with a default configuration.
    pub fn new(expression: impl Into<String>, evaluator: Rc<dyn FormulaEvaluator>) -> Self {
        Self::with_config(expression, evaluator, ModifierConfig::default())
    }

    /// Create an expression modifier with an explicit configuration.
    pub fn with_config(
        expression: impl Into<String>,
        evaluator: Rc<dyn FormulaEvaluator>,
        config: ModifierConfig,
    ) -> Self {
        Self {
            config,
            expression: expression.into(),
            evaluator,
            compiled: RefCell::new(None),
            compile_failed: Cell::new(false),
        }
    }

    /// The configured expression text.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn ensure_compiled(&self) -> Result<(), EvalError> {
        if self.compiled.borrow().is_some() {
            return Ok(());
        }
        let formula = self.evaluator.compile(&self.expression, &EXPR_VARIABLES)?;
        *self.compiled.borrow_mut() = Some(formula);
        Ok(())
    }
}

impl StatModifier for ExpressionModifier {
    fn config(&self) -> &ModifierConfig {
        &self.config
    }

    fn modify(&self, instance: &ModifierInstance, input: f64) -> f64 {
        if !instance.belongs_to((self as *const Self).cast()) {
            error!(
                expected = self.debug_name(),
                actual = instance.modifier().debug_name(),
                "modifier instance applied through the wrong parent modifier; ignored"
            );
            return input;
        }

        if self.compile_failed.get() {
            return input;
        }
        if let Err(err) = self.ensure_compiled() {
            self.compile_failed.set(true);
            error!(
                modifier = self.debug_name(),
                error = %err,
                "expression modifier failed to compile; ignored"
            );
            return input;
        }

        let compiled = self.compiled.borrow();
        // ensure_compiled succeeded, so the slot is filled
        let Some(formula) = compiled.as_ref() else {
            return input;
        };

        match formula.evaluate(&[input, instance.level()]) {
            Ok(output) => output,
            Err(err) => {
                error!(
                    modifier = self.debug_name(),
                    error = %err,
                    "expression modifier failed to evaluate; ignored"
                );
                input
            }
        }
    }
}

impl std::fmt::Debug for ExpressionModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionModifier")
            .field("config", &self.config)
            .field("expression", &self.expression)
            .field("compile_failed", &self.compile_failed.get())
            .finish()
    }
}
