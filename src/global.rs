//! Global modifier registrations.
//!
//! A [`GlobalModifier`] is a hub-level registration of one shared
//! modifier plus the bookkeeping of which stats it is currently attached
//! to. The attachment set holds weak references only; stats freed with
//! their container simply disappear from it.

use crate::modifier::StatModifier;
use crate::stat::Stat;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A hub-registered modifier auto-attached to tag-matched stats.
pub struct GlobalModifier {
    modifier: Rc<dyn StatModifier>,
    persistent: bool,
    attached: RefCell<Vec<Weak<Stat>>>,
}

impl GlobalModifier {
    /// Register `modifier` as global. Persistent registrations survive
    /// re-attachment to stats of freshly loaded containers.
    pub fn new(modifier: Rc<dyn StatModifier>, persistent: bool) -> Rc<Self> {
        Rc::new(Self {
            modifier,
            persistent,
            attached: RefCell::new(Vec::new()),
        })
    }

    /// The registered modifier.
    pub fn modifier(&self) -> &Rc<dyn StatModifier> {
        &self.modifier
    }

    /// Whether this registration re-attaches to stale stats on container
    /// load.
    pub fn persistent(&self) -> bool {
        self.persistent
    }

    /// The stats this registration is currently attached to.
    ///
    /// Stats that have been freed are pruned from the bookkeeping as a
    /// side effect.
    pub fn attached_stats(&self) -> Vec<Rc<Stat>> {
        let mut attached = self.attached.borrow_mut();
        attached.retain(|weak| weak.strong_count() > 0);
        attached.iter().filter_map(Weak::upgrade).collect()
    }

    /// Whether this registration is attached to `stat`.
    pub fn is_attached_to(&self, stat: &Rc<Stat>) -> bool {
        self.attached
            .borrow()
            .iter()
            .any(|weak| weak.as_ptr() == Rc::as_ptr(stat))
    }

    pub(crate) fn record_attachment(&self, stat: &Rc<Stat>) {
        if !self.is_attached_to(stat) {
            self.attached.borrow_mut().push(Rc::downgrade(stat));
        }
    }

    pub(crate) fn clear_attachments(&self) {
        self.attached.borrow_mut().clear();
    }
}

impl std::fmt::Debug for GlobalModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalModifier")
            .field("modifier", &self.modifier.debug_name())
            .field("persistent", &self.persistent)
            .field("attached", &self.attached.borrow().len())
            .finish()
    }
}
