//! Stats module.
//!
//! A [`Stat`] provides a base value and exposes a cached value computed
//! by folding its attached modifier chain over that base. Recomputation
//! is driven by a dirty flag and a per-stat [`UpdatePolicy`]; the chain
//! is kept sorted by descending modifier priority at all times.
//!
//! Two base-value variants exist: a *simple* stat with a constant,
//! settable base, and an *expression* stat whose base is produced by a
//! formula over other stats bound as named inputs.

use crate::error::StatError;
use crate::eval::{CompiledFormula, FormulaEvaluator};
use crate::graph;
use crate::instance::ModifierInstance;
use crate::modifier::{same_modifier, StatModifier};
use crate::signal::{Signal, Subscription};
use crate::tag::TagHolder;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{error, warn};

/// When a stat's dirty cache is recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Recompute lazily the next time the value is read while dirty.
    /// Optimal for most stats.
    #[default]
    OnRequest,
    /// Recompute immediately upon becoming dirty. Useful for event-driven
    /// logic that never reads the value directly.
    OnDirtied,
    /// Recompute unconditionally once per host update tick.
    OnTick,
    /// Recompute unconditionally once per host physics tick.
    OnPhysicsTick,
    /// Never recompute automatically; the caller drives
    /// [`Stat::update_value`] explicitly.
    Manual,
}

/// The host tick phase passed to [`Stat::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    /// The per-frame update tick.
    Update,
    /// The fixed-rate physics tick.
    Physics,
}

/// One attached modifier instance plus its level-change subscription.
struct ChainEntry {
    instance: Rc<ModifierInstance>,
    level_sub: Subscription,
}

/// A named input stat bound to an expression base.
struct InputBinding {
    name: String,
    stat: Rc<Stat>,
    update_sub: Subscription,
}

/// The base-value variant of a stat.
enum StatBase {
    /// A constant, externally settable base value.
    Simple { value: Cell<f64> },
    /// A formula-driven base value reading other stats.
    Expression(ExpressionBase),
}

struct ExpressionBase {
    expression: String,
    evaluator: Rc<dyn FormulaEvaluator>,
    inputs: RefCell<Vec<InputBinding>>,
    compiled: RefCell<Option<Box<dyn CompiledFormula>>>,
    compile_failed: Cell<bool>,
    cached_base: Cell<f64>,
}

impl ExpressionBase {
    /// Recompute the base value from the bound inputs.
    ///
    /// Compile or evaluate failure degrades to a base value of `0.0`.
    fn compute(&self, stat_label: &str) -> f64 {
        // Pull input values first so each input's own update policy runs.
        let bindings: Vec<(String, Rc<Stat>)> = self
            .inputs
            .borrow()
            .iter()
            .map(|binding| (binding.name.clone(), binding.stat.clone()))
            .collect();
        let values: Vec<f64> = bindings.iter().map(|(_, stat)| stat.value()).collect();

        if self.compile_failed.get() {
            self.cached_base.set(0.0);
            return 0.0;
        }

        if self.compiled.borrow().is_none() {
            let names: Vec<&str> = bindings.iter().map(|(name, _)| name.as_str()).collect();
            match self.evaluator.compile(&self.expression, &names) {
                Ok(formula) => *self.compiled.borrow_mut() = Some(formula),
                Err(err) => {
                    self.compile_failed.set(true);
                    error!(
                        stat = stat_label,
                        error = %err,
                        "expression stat failed to compile; base value falls back to 0"
                    );
                    self.cached_base.set(0.0);
                    return 0.0;
                }
            }
        }

        let compiled = self.compiled.borrow();
        let Some(formula) = compiled.as_ref() else {
            return 0.0;
        };

        let base = match formula.evaluate(&values) {
            Ok(value) => value,
            Err(err) => {
                error!(
                    stat = stat_label,
                    error = %err,
                    "expression stat failed to evaluate; base value falls back to 0"
                );
                0.0
            }
        };
        self.cached_base.set(base);
        base
    }
}

/// An entity exposing a cached, modifier-composed numeric value.
///
/// The cached value is a function of the base value and the ordered chain
/// of attached [`ModifierInstance`]s; staleness is tracked by a dirty
/// flag, and the configured [`UpdatePolicy`] decides when the
/// Dirty→Clean recomputation runs.
///
/// Stats are shared as `Rc<Stat>`: the owning
/// [`StatContainer`](crate::container::StatContainer) keeps the strong
/// references while the hub and global modifiers hold only weak
/// back-references.
///
/// # Examples
///
/// ```rust
/// use stathub::modifier::SimpleModifier;
/// use stathub::{Stat, TagHolder, UpdatePolicy};
/// use std::rc::Rc;
///
/// let hp = Stat::simple("hp", TagHolder::default(), UpdatePolicy::OnRequest, 10.0);
/// assert_eq!(hp.value(), 10.0);
///
/// hp.attach_modifier(Rc::new(SimpleModifier::flat(5.0)), 2.0);
/// assert!(hp.is_dirty());
/// assert_eq!(hp.value(), 20.0);
/// assert!(!hp.is_dirty());
/// ```
pub struct Stat {
    label: String,
    tags: TagHolder,
    policy: UpdatePolicy,
    base: StatBase,
    modifiers: RefCell<Vec<ChainEntry>>,
    dirty: Cell<bool>,
    cached: Cell<f64>,
    value_dirtied: Signal<()>,
    value_updated: Signal<(f64, f64)>,
    modifiers_changed: Signal<()>,
    this: Weak<Stat>,
}

impl Stat {
    fn build(label: String, tags: TagHolder, policy: UpdatePolicy, base: StatBase) -> Rc<Self> {
        let stat = Rc::new_cyclic(|this| Self {
            label,
            tags,
            policy,
            base,
            modifiers: RefCell::new(Vec::new()),
            dirty: Cell::new(true),
            cached: Cell::new(0.0),
            value_dirtied: Signal::new(),
            value_updated: Signal::new(),
            modifiers_changed: Signal::new(),
            this: this.clone(),
        });
        // an eagerly updating stat starts out clean
        if stat.policy == UpdatePolicy::OnDirtied {
            stat.update_value();
        }
        stat
    }

    /// Create a stat with a constant, settable base value.
    pub fn simple(
        label: impl Into<String>,
        tags: TagHolder,
        policy: UpdatePolicy,
        base_value: f64,
    ) -> Rc<Self> {
        Self::build(
            label.into(),
            tags,
            policy,
            StatBase::Simple {
                value: Cell::new(base_value),
            },
        )
    }

    /// Create a stat whose base value is a formula over bound input
    /// stats.
    ///
    /// The expression compiles lazily against the input names in binding
    /// order; bind inputs with [`Stat::bind_input`] before the first
    /// recomputation.
    pub fn expression(
        label: impl Into<String>,
        tags: TagHolder,
        policy: UpdatePolicy,
        expression: impl Into<String>,
        evaluator: Rc<dyn FormulaEvaluator>,
    ) -> Rc<Self> {
        Self::build(
            label.into(),
            tags,
            policy,
            StatBase::Expression(ExpressionBase {
                expression: expression.into(),
                evaluator,
                inputs: RefCell::new(Vec::new()),
                compiled: RefCell::new(None),
                compile_failed: Cell::new(false),
                cached_base: Cell::new(0.0),
            }),
        )
    }

    /// The diagnostic label of this stat.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The tag holder matched against stat tag matchers.
    pub fn tag_holder(&self) -> &TagHolder {
        &self.tags
    }

    /// The configured update policy.
    pub fn update_policy(&self) -> UpdatePolicy {
        self.policy
    }

    // --- valuation / caching ------------------------------------------------

    /// The current value of the stat.
    ///
    /// Under [`UpdatePolicy::OnRequest`] a dirty read recomputes first;
    /// every other policy returns the cached value as-is.
    pub fn value(&self) -> f64 {
        if self.dirty.get() && self.policy == UpdatePolicy::OnRequest {
            self.update_value();
        }
        self.cached.get()
    }

    /// The cached value, never triggering a recomputation.
    pub fn cached_value(&self) -> f64 {
        self.cached.get()
    }

    /// Whether the cached value is stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Mark the cached value as stale.
    ///
    /// The dirtied notification fires only on the Clean→Dirty edge;
    /// marking an already-dirty stat is a no-op. Under
    /// [`UpdatePolicy::OnDirtied`] the recomputation runs immediately.
    pub fn mark_dirty(&self) {
        if self.dirty.replace(true) {
            return;
        }
        self.value_dirtied.emit(&());
        if self.policy == UpdatePolicy::OnDirtied {
            self.update_value();
        }
    }

    /// Recompute the cached value from the base value and the modifier
    /// chain, clear the dirty flag, and notify observers with
    /// `(previous, current)`.
    pub fn update_value(&self) {
        let previous = self.cached.get();
        let base = self.compute_base_value();
        let current = self.apply_modifiers(base);

        self.cached.set(current);
        self.dirty.set(false);
        self.value_updated.emit(&(previous, current));
    }

    /// Recompute if the policy is bound to the given host tick phase.
    ///
    /// Tick-driven policies recompute unconditionally, dirty or not.
    pub fn tick(&self, phase: TickPhase) {
        let due = matches!(
            (self.policy, phase),
            (UpdatePolicy::OnTick, TickPhase::Update)
                | (UpdatePolicy::OnPhysicsTick, TickPhase::Physics)
        );
        if due {
            self.update_value();
        }
    }

    fn compute_base_value(&self) -> f64 {
        match &self.base {
            StatBase::Simple { value } => value.get(),
            StatBase::Expression(expr) => expr.compute(&self.label),
        }
    }

    // --- base value ---------------------------------------------------------

    /// The value of the stat before modifiers are applied.
    ///
    /// For expression stats this is the base produced by the most recent
    /// recomputation.
    pub fn base_value(&self) -> f64 {
        match &self.base {
            StatBase::Simple { value } => value.get(),
            StatBase::Expression(expr) => expr.cached_base.get(),
        }
    }

    /// Set the base value of a simple stat, dirtying it.
    ///
    /// Expression stats derive their base; setting it is a logged no-op.
    pub fn set_base_value(&self, value: f64) {
        match &self.base {
            StatBase::Simple { value: base } => {
                base.set(value);
                self.mark_dirty();
            }
            StatBase::Expression(_) => {
                warn!(
                    stat = self.label.as_str(),
                    "cannot set the base value of an expression stat; ignored"
                );
            }
        }
    }

    /// Bind `input` under `name` as an expression variable.
    ///
    /// Rebinding an existing name replaces the previous input. The
    /// binding subscribes to the input's value updates so this stat goes
    /// dirty whenever the input recomputes. Wiring that would create a
    /// dependency cycle is rejected.
    pub fn bind_input(&self, name: impl Into<String>, input: &Rc<Stat>) -> Result<(), StatError> {
        let StatBase::Expression(expr) = &self.base else {
            return Err(StatError::NotExpression {
                stat: self.label.clone(),
            });
        };

        graph::ensure_acyclic(&self.label, self as *const Stat, input)?;

        let name = name.into();
        let this = self.this.clone();
        let update_sub = input.value_updated().connect(move |_| {
            if let Some(stat) = this.upgrade() {
                stat.mark_dirty();
            }
        });

        {
            let mut inputs = expr.inputs.borrow_mut();
            if let Some(existing) = inputs.iter_mut().find(|binding| binding.name == name) {
                existing.stat.value_updated().disconnect(existing.update_sub);
                *existing = InputBinding {
                    name,
                    stat: input.clone(),
                    update_sub,
                };
            } else {
                inputs.push(InputBinding {
                    name,
                    stat: input.clone(),
                    update_sub,
                });
            }
            // variable set changed, recompile on next update
            *expr.compiled.borrow_mut() = None;
            expr.compile_failed.set(false);
        }

        self.mark_dirty();
        Ok(())
    }

    /// The stats currently bound as expression inputs, in binding order.
    ///
    /// Empty for simple stats.
    pub fn input_stats(&self) -> Vec<Rc<Stat>> {
        match &self.base {
            StatBase::Simple { .. } => Vec::new(),
            StatBase::Expression(expr) => expr
                .inputs
                .borrow()
                .iter()
                .map(|binding| binding.stat.clone())
                .collect(),
        }
    }

    // --- modifier chain -----------------------------------------------------

    /// Attach an existing modifier instance to this stat's chain.
    ///
    /// Insertion keeps the chain sorted by descending modifier priority;
    /// equal priorities keep attachment order. The stat subscribes to the
    /// instance's level changes and goes dirty on each one.
    pub fn attach_modifier_instance(&self, instance: Rc<ModifierInstance>) {
        let priority = instance.modifier().priority();
        let this = self.this.clone();
        let level_sub = instance.level_changed().connect(move |_| {
            if let Some(stat) = this.upgrade() {
                stat.mark_dirty();
            }
        });

        {
            let mut chain = self.modifiers.borrow_mut();
            let index =
                chain.partition_point(|entry| entry.instance.modifier().priority() >= priority);
            chain.insert(index, ChainEntry {
                instance,
                level_sub,
            });
        }

        self.mark_dirty();
        self.modifiers_changed.emit(&());
    }

    /// Create an instance of `modifier` at the given level and attach it.
    pub fn attach_modifier(
        &self,
        modifier: Rc<dyn StatModifier>,
        level: f64,
    ) -> Rc<ModifierInstance> {
        let instance = ModifierInstance::new(modifier, level);
        self.attach_modifier_instance(instance.clone());
        instance
    }

    /// Detach an instance by reference identity.
    ///
    /// Returns `false` when the instance is not attached. A successful
    /// detach removes the level-change subscription, so later level
    /// changes no longer dirty this stat.
    pub fn try_detach_modifier_instance(&self, instance: &Rc<ModifierInstance>) -> bool {
        let removed = {
            let mut chain = self.modifiers.borrow_mut();
            let Some(index) = chain
                .iter()
                .position(|entry| Rc::ptr_eq(&entry.instance, instance))
            else {
                return false;
            };
            chain.remove(index)
        };

        removed.instance.level_changed().disconnect(removed.level_sub);
        self.mark_dirty();
        self.modifiers_changed.emit(&());
        true
    }

    /// Detach every instance of `modifier`; returns how many were
    /// detached.
    pub fn try_detach_modifier(&self, modifier: &Rc<dyn StatModifier>) -> usize {
        let matching = self.instances_of(modifier);
        matching
            .iter()
            .filter(|instance| self.try_detach_modifier_instance(instance))
            .count()
    }

    /// The first attached instance of `modifier`, if any.
    pub fn instance_of(&self, modifier: &Rc<dyn StatModifier>) -> Option<Rc<ModifierInstance>> {
        self.modifiers
            .borrow()
            .iter()
            .map(|entry| &entry.instance)
            .find(|instance| same_modifier(instance.modifier(), modifier))
            .cloned()
    }

    /// Every attached instance of `modifier`, in chain order.
    pub fn instances_of(&self, modifier: &Rc<dyn StatModifier>) -> Vec<Rc<ModifierInstance>> {
        self.modifiers
            .borrow()
            .iter()
            .map(|entry| &entry.instance)
            .filter(|instance| same_modifier(instance.modifier(), modifier))
            .cloned()
            .collect()
    }

    /// A snapshot of the attached instances, highest priority first.
    pub fn modifiers(&self) -> Vec<Rc<ModifierInstance>> {
        self.modifiers
            .borrow()
            .iter()
            .map(|entry| entry.instance.clone())
            .collect()
    }

    /// Fold the modifier chain over `input`, highest priority first.
    ///
    /// Operates on a stable snapshot, so modifiers may be attached or
    /// detached from inside observer callbacks without disturbing the
    /// fold in progress.
    pub fn apply_modifiers(&self, input: f64) -> f64 {
        let snapshot = self.modifiers();
        snapshot
            .into_iter()
            .fold(input, |value, instance| instance.modify(value))
    }

    // --- notifications ------------------------------------------------------

    /// Fired once on each Clean→Dirty edge.
    pub fn value_dirtied(&self) -> &Signal<()> {
        &self.value_dirtied
    }

    /// Fired on each recomputation with `(previous, current)`.
    pub fn value_updated(&self) -> &Signal<(f64, f64)> {
        &self.value_updated
    }

    /// Fired whenever the modifier chain changes.
    pub fn modifiers_changed(&self) -> &Signal<()> {
        &self.modifiers_changed
    }
}

impl std::fmt::Debug for Stat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stat")
            .field("label", &self.label)
            .field("policy", &self.policy)
            .field("dirty", &self.dirty.get())
            .field("cached", &self.cached.get())
            .field("modifiers", &self.modifiers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::modifier::{ModifierConfig, SimpleModifier};

    /// Evaluator stub that sums every bound variable.
    struct SumEvaluator;
    struct SumFormula;

    impl FormulaEvaluator for SumEvaluator {
        fn compile(
            &self,
            _expression: &str,
            _variables: &[&str],
        ) -> Result<Box<dyn CompiledFormula>, EvalError> {
            Ok(Box::new(SumFormula))
        }
    }

    impl CompiledFormula for SumFormula {
        fn evaluate(&self, values: &[f64]) -> Result<f64, EvalError> {
            Ok(values.iter().sum())
        }
    }

    fn simple(label: &str, base: f64) -> Rc<Stat> {
        Stat::simple(label, TagHolder::default(), UpdatePolicy::OnRequest, base)
    }

    fn prioritized(priority: i32, amount: f64) -> Rc<dyn StatModifier> {
        Rc::new(SimpleModifier::with_config(
            crate::modifier::ModifierOp::Flat,
            amount,
            ModifierConfig {
                priority,
                ..ModifierConfig::default()
            },
        ))
    }

    #[test]
    fn test_value_recomputes_on_request() {
        let stat = simple("hp", 10.0);
        assert!(stat.is_dirty());
        assert_eq!(stat.value(), 10.0);
        assert!(!stat.is_dirty());
    }

    #[test]
    fn test_idempotent_clean_read() {
        let stat = simple("hp", 10.0);
        let updates = Rc::new(Cell::new(0));
        let updates2 = updates.clone();
        stat.value_updated()
            .connect(move |_| updates2.set(updates2.get() + 1));

        assert_eq!(stat.value(), stat.value());
        assert_eq!(updates.get(), 1);
    }

    #[test]
    fn test_base_mutation_dirties() {
        let stat = simple("hp", 10.0);
        let _ = stat.value();
        stat.set_base_value(25.0);
        assert!(stat.is_dirty());
        assert_eq!(stat.value(), 25.0);
    }

    #[test]
    fn test_dirtied_fires_on_edge_only() {
        let stat = simple("hp", 10.0);
        let _ = stat.value();

        let edges = Rc::new(Cell::new(0));
        let edges2 = edges.clone();
        stat.value_dirtied()
            .connect(move |_| edges2.set(edges2.get() + 1));

        stat.set_base_value(1.0);
        stat.set_base_value(2.0); // already dirty, no second edge
        assert_eq!(edges.get(), 1);
    }

    #[test]
    fn test_priority_ordering_any_arrival_order() {
        let stat = simple("hp", 0.0);
        let low = prioritized(-5, 1.0);
        let mid = prioritized(0, 2.0);
        let high = prioritized(9, 3.0);

        stat.attach_modifier(mid.clone(), 1.0);
        stat.attach_modifier(high.clone(), 1.0);
        stat.attach_modifier(low.clone(), 1.0);

        let priorities: Vec<i32> = stat
            .modifiers()
            .iter()
            .map(|instance| instance.modifier().priority())
            .collect();
        assert_eq!(priorities, vec![9, 0, -5]);
    }

    #[test]
    fn test_priority_ties_keep_attachment_order() {
        let stat = simple("hp", 0.0);
        let first = prioritized(3, 1.0);
        let second = prioritized(3, 2.0);
        let third = prioritized(3, 3.0);

        let a = stat.attach_modifier(first, 1.0);
        let b = stat.attach_modifier(second, 1.0);
        let c = stat.attach_modifier(third, 1.0);

        let chain = stat.modifiers();
        assert!(Rc::ptr_eq(&chain[0], &a));
        assert!(Rc::ptr_eq(&chain[1], &b));
        assert!(Rc::ptr_eq(&chain[2], &c));
    }

    #[test]
    fn test_level_change_dirties_owner() {
        let stat = simple("hp", 10.0);
        let instance = stat.attach_modifier(prioritized(0, 5.0), 1.0);
        assert_eq!(stat.value(), 15.0);

        instance.set_level(3.0);
        assert!(stat.is_dirty());
        assert_eq!(stat.value(), 25.0);
    }

    #[test]
    fn test_detached_instance_level_change_no_longer_dirties() {
        let stat = simple("hp", 10.0);
        let instance = stat.attach_modifier(prioritized(0, 5.0), 1.0);
        assert!(stat.try_detach_modifier_instance(&instance));
        let _ = stat.value();

        instance.set_level(9.0);
        assert!(!stat.is_dirty());
    }

    #[test]
    fn test_detach_missing_instance_reports_false() {
        let stat = simple("hp", 10.0);
        let loose = ModifierInstance::of(prioritized(0, 5.0));
        assert!(!stat.try_detach_modifier_instance(&loose));
    }

    #[test]
    fn test_detach_modifier_counts_instances() {
        let stat = simple("hp", 10.0);
        let modifier = prioritized(0, 5.0);
        stat.attach_modifier(modifier.clone(), 1.0);
        stat.attach_modifier(modifier.clone(), 2.0);
        stat.attach_modifier(prioritized(1, 1.0), 1.0);

        assert_eq!(stat.try_detach_modifier(&modifier), 2);
        assert_eq!(stat.modifiers().len(), 1);
    }

    #[test]
    fn test_instances_of_and_instance_of() {
        let stat = simple("hp", 10.0);
        let modifier = prioritized(0, 5.0);
        let other = prioritized(0, 7.0);
        let first = stat.attach_modifier(modifier.clone(), 1.0);
        stat.attach_modifier(modifier.clone(), 2.0);
        stat.attach_modifier(other, 1.0);

        assert!(Rc::ptr_eq(&stat.instance_of(&modifier).unwrap(), &first));
        assert_eq!(stat.instances_of(&modifier).len(), 2);
    }

    #[test]
    fn test_on_dirtied_recomputes_immediately() {
        let stat = Stat::simple("hp", TagHolder::default(), UpdatePolicy::OnDirtied, 10.0);
        assert!(!stat.is_dirty());
        assert_eq!(stat.cached_value(), 10.0);

        stat.set_base_value(30.0);
        assert!(!stat.is_dirty());
        assert_eq!(stat.cached_value(), 30.0);
    }

    #[test]
    fn test_manual_never_auto_recomputes() {
        let stat = Stat::simple("hp", TagHolder::default(), UpdatePolicy::Manual, 10.0);
        assert_eq!(stat.value(), 0.0); // still the initial cache
        stat.update_value();
        assert_eq!(stat.value(), 10.0);
    }

    #[test]
    fn test_tick_policies_recompute_on_matching_phase() {
        let stat = Stat::simple("hp", TagHolder::default(), UpdatePolicy::OnTick, 10.0);
        stat.tick(TickPhase::Physics);
        assert_eq!(stat.cached_value(), 0.0);
        stat.tick(TickPhase::Update);
        assert_eq!(stat.cached_value(), 10.0);

        // unconditional, even when clean
        stat.set_base_value(12.0);
        stat.tick(TickPhase::Update);
        assert_eq!(stat.cached_value(), 12.0);
    }

    #[test]
    fn test_expression_stat_sums_inputs() {
        let str_stat = simple("str", 10.0);
        let dex_stat = simple("dex", 4.0);
        let atk = Stat::expression(
            "atk",
            TagHolder::default(),
            UpdatePolicy::OnRequest,
            "str + dex",
            Rc::new(SumEvaluator),
        );
        atk.bind_input("str", &str_stat).unwrap();
        atk.bind_input("dex", &dex_stat).unwrap();

        assert_eq!(atk.value(), 14.0);
        assert_eq!(atk.base_value(), 14.0);
    }

    #[test]
    fn test_expression_stat_dirties_on_input_update() {
        let str_stat = simple("str", 10.0);
        let atk = Stat::expression(
            "atk",
            TagHolder::default(),
            UpdatePolicy::OnRequest,
            "str",
            Rc::new(SumEvaluator),
        );
        atk.bind_input("str", &str_stat).unwrap();
        assert_eq!(atk.value(), 10.0);

        str_stat.set_base_value(12.0);
        let _ = str_stat.value(); // input recomputes, notifying atk
        assert!(atk.is_dirty());
        assert_eq!(atk.value(), 12.0);
    }

    #[test]
    fn test_bind_input_on_simple_stat_is_rejected() {
        let stat = simple("hp", 10.0);
        let other = simple("str", 1.0);
        assert_eq!(
            stat.bind_input("str", &other),
            Err(StatError::NotExpression { stat: "hp".into() })
        );
    }

    #[test]
    fn test_bind_input_rejects_cycles() {
        let a = Stat::expression(
            "a",
            TagHolder::default(),
            UpdatePolicy::OnRequest,
            "b",
            Rc::new(SumEvaluator),
        );
        let b = Stat::expression(
            "b",
            TagHolder::default(),
            UpdatePolicy::OnRequest,
            "a",
            Rc::new(SumEvaluator),
        );
        a.bind_input("b", &b).unwrap();

        let err = b.bind_input("a", &a).unwrap_err();
        assert!(matches!(err, StatError::Cycle { .. }));

        // self-binding is also a cycle
        let err = a.bind_input("a", &a).unwrap_err();
        assert!(matches!(err, StatError::Cycle { .. }));
    }

    #[test]
    fn test_expression_failure_falls_back_to_zero_base() {
        struct FailingEvaluator;
        impl FormulaEvaluator for FailingEvaluator {
            fn compile(
                &self,
                expression: &str,
                _variables: &[&str],
            ) -> Result<Box<dyn CompiledFormula>, EvalError> {
                Err(EvalError::Parse {
                    expression: expression.into(),
                    message: "bad".into(),
                })
            }
        }

        let stat = Stat::expression(
            "broken",
            TagHolder::default(),
            UpdatePolicy::OnRequest,
            "???",
            Rc::new(FailingEvaluator),
        );
        stat.attach_modifier(prioritized(0, 5.0), 1.0);
        // base degrades to 0, modifiers still apply
        assert_eq!(stat.value(), 5.0);
    }
}
