//! The central registry.
//!
//! A [`StatHub`] tracks the currently loaded containers, an index from
//! stat back to owning container, and the set of registered global
//! modifiers. Registering a global modifier attaches it to every matching
//! stat already loaded; loading a container afterwards attaches the
//! persistent registrations to its matching stats. Matching requires both
//! a container matcher and a stat matcher to pass.

use crate::container::StatContainer;
use crate::global::GlobalModifier;
use crate::matcher::TagMatcher;
use crate::modifier::StatModifier;
use crate::signal::Signal;
use crate::stat::{Stat, TickPhase};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use tracing::warn;

/// One reverse-index record from a stat back to its owning container.
struct IndexEntry {
    stat: Weak<Stat>,
    container: Weak<StatContainer>,
}

fn stat_key(stat: &Rc<Stat>) -> usize {
    Rc::as_ptr(stat) as usize
}

/// The central registry of loaded containers and global modifiers.
///
/// # Examples
///
/// ```rust
/// use stathub::modifier::{ModifierConfig, SimpleModifier};
/// use stathub::{Stat, StatContainer, StatHub, TagHolder, TagMatcher, UpdatePolicy};
/// use std::rc::Rc;
///
/// let hub = StatHub::new();
///
/// let player = StatContainer::new(TagHolder::of(["player"]));
/// player.add_stat(Stat::simple(
///     "hp",
///     TagHolder::of(["health"]),
///     UpdatePolicy::OnRequest,
///     100.0,
/// ));
/// hub.container_loaded(player.clone());
///
/// let blessing = SimpleModifier::with_config(
///     stathub::modifier::ModifierOp::Flat,
///     10.0,
///     ModifierConfig {
///         container_matcher: Some(TagMatcher::any(TagHolder::of(["player"]))),
///         stat_matcher: Some(TagMatcher::any(TagHolder::of(["health"]))),
///         ..ModifierConfig::default()
///     },
/// );
/// hub.create_and_add_global_modifier(Rc::new(blessing));
///
/// assert_eq!(player.stats()[0].value(), 110.0);
/// ```
pub struct StatHub {
    containers: RefCell<Vec<Rc<StatContainer>>>,
    index: RefCell<HashMap<usize, IndexEntry>>,
    globals: RefCell<Vec<Rc<GlobalModifier>>>,
    container_added: Signal<Rc<StatContainer>>,
    container_removed: Signal<Rc<StatContainer>>,
    global_modifier_added: Signal<Rc<GlobalModifier>>,
    global_modifier_removed: Signal<Rc<GlobalModifier>>,
}

impl StatHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            containers: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
            globals: RefCell::new(Vec::new()),
            container_added: Signal::new(),
            container_removed: Signal::new(),
            global_modifier_added: Signal::new(),
            global_modifier_removed: Signal::new(),
        }
    }

    // --- container lifecycle ------------------------------------------------

    /// Register `container` as loaded.
    ///
    /// Its stats (including those of nested children) enter the reverse
    /// index, and every registered global modifier is reconciled against
    /// them: any instance lingering from an earlier session is detached
    /// as stale, then persistent registrations attach fresh to matching
    /// stats. Non-persistent registrations never reach containers loaded
    /// after their activation.
    pub fn container_loaded(&self, container: Rc<StatContainer>) {
        self.containers.borrow_mut().push(container.clone());

        let stats = container.all_stats();
        {
            let mut index = self.index.borrow_mut();
            for stat in &stats {
                index.insert(stat_key(stat), IndexEntry {
                    stat: Rc::downgrade(stat),
                    container: Rc::downgrade(&container),
                });
            }
        }

        let globals = self.global_modifiers();
        for stat in &stats {
            for global in &globals {
                stat.try_detach_modifier(global.modifier());
                if global.persistent() {
                    self.try_attach_global(stat, global);
                }
            }
        }

        self.container_added.emit(&container);
    }

    /// Unregister `container`.
    ///
    /// Its stats leave the reverse index; attached global-modifier
    /// instances stay on the stats and are reconciled if the container is
    /// ever loaded again.
    pub fn container_unloaded(&self, container: &Rc<StatContainer>) {
        let removed = {
            let mut containers = self.containers.borrow_mut();
            match containers.iter().position(|held| Rc::ptr_eq(held, container)) {
                Some(index) => containers.remove(index),
                None => {
                    warn!("unloading a container that was never loaded; ignored");
                    return;
                }
            }
        };

        self.index.borrow_mut().retain(|_, entry| {
            entry.stat.strong_count() > 0
                && entry.container.as_ptr() != Rc::as_ptr(container)
        });

        self.container_removed.emit(&removed);
    }

    /// The container owning `stat`, if it is currently loaded.
    pub fn get_container(&self, stat: &Rc<Stat>) -> Option<Rc<StatContainer>> {
        let index = self.index.borrow();
        let entry = index.get(&stat_key(stat))?;
        // key is a raw address; guard against a recycled allocation
        if entry.stat.as_ptr() != Rc::as_ptr(stat) {
            return None;
        }
        entry.container.upgrade()
    }

    /// A snapshot of the loaded containers, in load order.
    pub fn active_containers(&self) -> Vec<Rc<StatContainer>> {
        self.containers.borrow().clone()
    }

    // --- global modifiers ---------------------------------------------------

    /// Wrap `modifier` in a registration and activate it.
    ///
    /// Persistence is taken from the modifier's own configuration.
    pub fn create_and_add_global_modifier(
        &self,
        modifier: Rc<dyn StatModifier>,
    ) -> Rc<GlobalModifier> {
        let persistent = modifier.persistent_if_global();
        let global = GlobalModifier::new(modifier, persistent);
        self.add_global_modifier(global.clone());
        global
    }

    /// Activate a global-modifier registration.
    ///
    /// The modifier attaches immediately to every loaded stat matched by
    /// both of its tag matchers.
    pub fn add_global_modifier(&self, global: Rc<GlobalModifier>) {
        self.globals.borrow_mut().push(global.clone());

        for stat in self.get_matching_stats(
            global.modifier().container_matcher(),
            global.modifier().stat_matcher(),
        ) {
            self.attach_global(&stat, &global);
        }

        self.global_modifier_added.emit(&global);
    }

    /// Deactivate a global-modifier registration, detaching its instances
    /// from every stat it reached.
    pub fn remove_global_modifier(&self, global: &Rc<GlobalModifier>) {
        for stat in global.attached_stats() {
            stat.try_detach_modifier(global.modifier());
        }
        global.clear_attachments();

        let mut globals = self.globals.borrow_mut();
        if let Some(index) = globals.iter().position(|held| Rc::ptr_eq(held, global)) {
            globals.remove(index);
        }
        drop(globals);

        self.global_modifier_removed.emit(global);
    }

    /// A snapshot of the active global-modifier registrations.
    pub fn global_modifiers(&self) -> Vec<Rc<GlobalModifier>> {
        self.globals.borrow().clone()
    }

    /// Every loaded stat matched by both matchers.
    ///
    /// The container matcher is tested against the owning container's
    /// tags, the stat matcher against the stat's own. Both matchers are
    /// required; a missing one logs a warning and matches nothing.
    pub fn get_matching_stats(
        &self,
        container_matcher: Option<&TagMatcher>,
        stat_matcher: Option<&TagMatcher>,
    ) -> Vec<Rc<Stat>> {
        let (Some(container_matcher), Some(stat_matcher)) = (container_matcher, stat_matcher)
        else {
            warn!("stat matching requires both a container matcher and a stat matcher");
            return Vec::new();
        };

        let mut seen: HashSet<usize> = HashSet::new();
        let mut out = Vec::new();
        for container in self.active_containers() {
            if !container_matcher.matches(Some(container.tag_holder())) {
                continue;
            }
            for stat in container.all_stats() {
                if stat_matcher.matches(Some(stat.tag_holder())) && seen.insert(stat_key(&stat)) {
                    out.push(stat);
                }
            }
        }
        out
    }

    /// Attach `global` to `stat` if both of its matchers pass.
    fn try_attach_global(&self, stat: &Rc<Stat>, global: &Rc<GlobalModifier>) {
        let (Some(container_matcher), Some(stat_matcher)) = (
            global.modifier().container_matcher(),
            global.modifier().stat_matcher(),
        ) else {
            warn!(
                modifier = global.modifier().debug_name(),
                "global modifier lacks a container matcher or stat matcher; never attaches"
            );
            return;
        };

        if !stat_matcher.matches(Some(stat.tag_holder())) {
            return;
        }
        let Some(container) = self.get_container(stat) else {
            return;
        };
        if !container_matcher.matches(Some(container.tag_holder())) {
            return;
        }

        self.attach_global(stat, global);
    }

    fn attach_global(&self, stat: &Rc<Stat>, global: &Rc<GlobalModifier>) {
        stat.attach_modifier(global.modifier().clone(), 1.0);
        global.record_attachment(stat);
    }

    // --- driving ------------------------------------------------------------

    /// Forward a host tick to every loaded stat; stats with a matching
    /// tick-driven policy recompute.
    pub fn tick(&self, phase: TickPhase) {
        for container in self.active_containers() {
            for stat in container.all_stats() {
                stat.tick(phase);
            }
        }
    }

    // --- notifications ------------------------------------------------------

    /// Fired after a container finishes loading.
    pub fn container_added(&self) -> &Signal<Rc<StatContainer>> {
        &self.container_added
    }

    /// Fired after a container is unloaded.
    pub fn container_removed(&self) -> &Signal<Rc<StatContainer>> {
        &self.container_removed
    }

    /// Fired after a global modifier finishes activating.
    pub fn global_modifier_added(&self) -> &Signal<Rc<GlobalModifier>> {
        &self.global_modifier_added
    }

    /// Fired after a global modifier is deactivated.
    pub fn global_modifier_removed(&self) -> &Signal<Rc<GlobalModifier>> {
        &self.global_modifier_removed
    }
}

impl Default for StatHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatHub")
            .field("containers", &self.containers.borrow().len())
            .field("globals", &self.globals.borrow().len())
            .finish()
    }
}
