//! Stat containers.
//!
//! A [`StatContainer`] groups the stats of one entity and carries the tag
//! holder that container-level tag matchers are tested against. Containers
//! nest: a parent aggregates its children's stats transitively, so a hub
//! only ever tracks the roots.

use crate::stat::Stat;
use crate::tag::TagHolder;
use std::cell::RefCell;
use std::rc::Rc;

/// A tagged group of stats, optionally nesting child containers.
///
/// # Examples
///
/// ```rust
/// use stathub::{Stat, StatContainer, TagHolder, UpdatePolicy};
///
/// let player = StatContainer::new(TagHolder::of(["player"]));
/// let hp = Stat::simple("hp", TagHolder::of(["health"]), UpdatePolicy::OnRequest, 100.0);
/// player.add_stat(hp);
///
/// assert_eq!(player.all_stats().len(), 1);
/// ```
#[derive(Debug)]
pub struct StatContainer {
    tags: TagHolder,
    stats: RefCell<Vec<Rc<Stat>>>,
    children: RefCell<Vec<Rc<StatContainer>>>,
}

impl StatContainer {
    /// Create an empty container with the given tags.
    pub fn new(tags: TagHolder) -> Rc<Self> {
        Rc::new(Self {
            tags,
            stats: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
        })
    }

    /// The tag holder matched against container tag matchers.
    pub fn tag_holder(&self) -> &TagHolder {
        &self.tags
    }

    /// Add a stat to this container.
    pub fn add_stat(&self, stat: Rc<Stat>) {
        self.stats.borrow_mut().push(stat);
    }

    /// Remove a stat by reference identity; returns whether it was held.
    pub fn remove_stat(&self, stat: &Rc<Stat>) -> bool {
        let mut stats = self.stats.borrow_mut();
        match stats.iter().position(|held| Rc::ptr_eq(held, stat)) {
            Some(index) => {
                stats.remove(index);
                true
            }
            None => false,
        }
    }

    /// Nest a child container under this one.
    pub fn add_child(&self, child: Rc<StatContainer>) {
        self.children.borrow_mut().push(child);
    }

    /// A snapshot of the directly held stats.
    pub fn stats(&self) -> Vec<Rc<Stat>> {
        self.stats.borrow().clone()
    }

    /// A snapshot of the nested child containers.
    pub fn children(&self) -> Vec<Rc<StatContainer>> {
        self.children.borrow().clone()
    }

    /// Every stat held by this container and its descendants, depth
    /// first with own stats before children.
    pub fn all_stats(&self) -> Vec<Rc<Stat>> {
        let mut out = self.stats();
        for child in self.children.borrow().iter() {
            out.extend(child.all_stats());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::UpdatePolicy;

    fn stat(label: &str) -> Rc<Stat> {
        Stat::simple(label, TagHolder::default(), UpdatePolicy::OnRequest, 1.0)
    }

    #[test]
    fn test_add_and_remove_stat() {
        let container = StatContainer::new(TagHolder::default());
        let hp = stat("hp");
        container.add_stat(hp.clone());
        assert_eq!(container.stats().len(), 1);

        assert!(container.remove_stat(&hp));
        assert!(!container.remove_stat(&hp));
        assert!(container.stats().is_empty());
    }

    #[test]
    fn test_all_stats_traverses_children_depth_first() {
        let root = StatContainer::new(TagHolder::default());
        let child = StatContainer::new(TagHolder::default());
        let grandchild = StatContainer::new(TagHolder::default());

        root.add_stat(stat("root"));
        child.add_stat(stat("child"));
        grandchild.add_stat(stat("grandchild"));
        child.add_child(grandchild);
        root.add_child(child);

        let labels: Vec<String> = root
            .all_stats()
            .iter()
            .map(|s| s.label().to_string())
            .collect();
        assert_eq!(labels, vec!["root", "child", "grandchild"]);
    }
}
