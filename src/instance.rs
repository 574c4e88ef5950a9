//! Modifier instances module.
//!
//! A [`ModifierInstance`] is the live, attachable binding of one shared
//! [`StatModifier`] to a mutable `level` scalar. The level acts as the
//! strength of the modifier: simple modifiers scale linearly with it and
//! expression modifiers receive it as the `level` variable. Level changes
//! notify observers synchronously, which is how an owning stat learns it
//! has gone stale.

use crate::modifier::StatModifier;
use crate::signal::Signal;
use std::cell::Cell;
use std::rc::Rc;

/// A live, leveled binding of a modifier to one stat's chain.
///
/// Instances are created when attached to a stat (or pre-created and
/// reused across many stats) and shared as `Rc<ModifierInstance>`; the
/// owning stat keeps the only long-lived strong reference, so a detached
/// instance is freed once callers drop theirs.
///
/// # Examples
///
/// ```rust
/// use stathub::instance::ModifierInstance;
/// use stathub::modifier::SimpleModifier;
/// use std::rc::Rc;
///
/// let instance = ModifierInstance::new(Rc::new(SimpleModifier::flat(5.0)), 2.0);
/// assert_eq!(instance.level(), 2.0);
/// assert_eq!(instance.modify(10.0), 20.0);
///
/// instance.set_level(3.0);
/// assert_eq!(instance.modify(10.0), 25.0);
/// ```
pub struct ModifierInstance {
    modifier: Rc<dyn StatModifier>,
    level: Cell<f64>,
    level_changed: Signal<(f64, f64)>,
}

impl ModifierInstance {
    /// Create a new instance of `modifier` with the given initial level.
    pub fn new(modifier: Rc<dyn StatModifier>, level: f64) -> Rc<Self> {
        Rc::new(Self {
            modifier,
            level: Cell::new(level),
            level_changed: Signal::new(),
        })
    }

    /// Create a new instance of `modifier` at the default level of `1.0`.
    pub fn of(modifier: Rc<dyn StatModifier>) -> Rc<Self> {
        Self::new(modifier, 1.0)
    }

    /// The parent modifier of this instance.
    pub fn modifier(&self) -> &Rc<dyn StatModifier> {
        &self.modifier
    }

    /// The current level.
    pub fn level(&self) -> f64 {
        self.level.get()
    }

    /// Set the level, notifying observers with `(previous, current)`.
    pub fn set_level(&self, level: f64) {
        let previous = self.level.replace(level);
        self.level_changed.emit(&(previous, level));
    }

    /// Fired on every level change with `(previous, current)`.
    pub fn level_changed(&self) -> &Signal<(f64, f64)> {
        &self.level_changed
    }

    /// Modify `input` through the parent modifier.
    pub fn modify(&self, input: f64) -> f64 {
        self.modifier.modify(self, input)
    }

    /// Whether this instance's parent modifier lives at `modifier`.
    pub(crate) fn belongs_to(&self, modifier: *const ()) -> bool {
        Rc::as_ptr(&self.modifier).cast::<()>() == modifier
    }
}

impl std::fmt::Debug for ModifierInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModifierInstance")
            .field("modifier", &self.modifier.debug_name())
            .field("level", &self.level.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::SimpleModifier;
    use std::cell::RefCell;

    #[test]
    fn test_default_level_is_one() {
        let instance = ModifierInstance::of(Rc::new(SimpleModifier::flat(5.0)));
        assert_eq!(instance.level(), 1.0);
        assert_eq!(instance.modify(10.0), 15.0);
    }

    #[test]
    fn test_level_change_notifies_previous_and_current() {
        let instance = ModifierInstance::new(Rc::new(SimpleModifier::flat(1.0)), 2.0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen2 = seen.clone();
        instance
            .level_changed()
            .connect(move |&(previous, current)| seen2.borrow_mut().push((previous, current)));

        instance.set_level(5.0);
        instance.set_level(3.0);
        assert_eq!(*seen.borrow(), vec![(2.0, 5.0), (5.0, 3.0)]);
    }
}
