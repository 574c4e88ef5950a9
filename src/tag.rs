//! Tag identity module.
//!
//! Provides the `Tag` type, an interned string identity token, and the
//! `TagHolder` type, an ordered collection of tags owned by a stat or a
//! container. Tags carry no behavior of their own; they exist to be
//! matched by a [`TagMatcher`](crate::matcher::TagMatcher).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::{OnceCell, RefCell};
use std::sync::Arc;
use tracing::warn;

/// Interned string identity token.
///
/// Uses `Arc<str>` for memory efficiency and fast comparison. Value-equal
/// tags are interchangeable; a tag has no behavior beyond its identity.
///
/// # Examples
///
/// ```rust
/// use stathub::Tag;
///
/// let fire = Tag::new("fire");
/// let fire2: Tag = "fire".into();
///
/// assert_eq!(fire, fire2);
/// assert_eq!(fire.as_str(), "fire");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tag(Arc<str>);

impl Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Tag::from(s))
    }
}

impl Tag {
    /// Create a new `Tag` from a string slice.
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the string representation of this `Tag`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered collection of tags.
///
/// Insertion order is preserved and duplicates are allowed. A holder is
/// built from a configured source list and frozen the first time it is
/// used for matching: tags may be pushed up until that point, after which
/// the live list is fixed ("lazy init once").
///
/// # Examples
///
/// ```rust
/// use stathub::{Tag, TagHolder};
///
/// let holder = TagHolder::of(["fire", "buff"]);
/// assert_eq!(holder.len(), 2);
/// assert!(holder.contains(&Tag::new("fire")));
/// assert!(!holder.contains(&Tag::new("ice")));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagHolder {
    /// The configured source list; mutable only until first use.
    source: RefCell<Vec<Tag>>,
    /// The frozen live list, populated once on first use.
    #[serde(skip)]
    live: OnceCell<Vec<Tag>>,
}

impl TagHolder {
    /// Create a holder from a configured source list of tags.
    pub fn new(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            source: RefCell::new(tags.into_iter().collect()),
            live: OnceCell::new(),
        }
    }

    /// Create a holder from anything tag-like, e.g. string slices.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stathub::TagHolder;
    ///
    /// let holder = TagHolder::of(["fire", "buff"]);
    /// assert_eq!(holder.len(), 2);
    /// ```
    pub fn of<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        Self::new(tags.into_iter().map(Into::into))
    }

    /// Append a tag to the source list.
    ///
    /// Once the holder has been used for matching the live list is frozen
    /// and further pushes are ignored with a warning.
    pub fn push(&self, tag: Tag) {
        if self.live.get().is_some() {
            warn!(tag = tag.as_str(), "tag pushed to an already-frozen tag holder; ignored");
            return;
        }
        self.source.borrow_mut().push(tag);
    }

    /// Idempotently freeze the live tag list from the source list.
    ///
    /// Called implicitly before any matching use; exposed for callers that
    /// want to pin the list at a known point in time.
    pub fn ensure_initialized(&self) {
        let _ = self.tags();
    }

    /// Get the live tag list, freezing it on first access.
    pub fn tags(&self) -> &[Tag] {
        self.live.get_or_init(|| self.source.borrow().clone())
    }

    /// Whether the holder contains the given tag.
    pub fn contains(&self, tag: &Tag) -> bool {
        self.tags().contains(tag)
    }

    /// Number of tags held, duplicates included.
    pub fn len(&self) -> usize {
        self.tags().len()
    }

    /// Whether the holder holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags().is_empty()
    }

    /// Iterate over the live tag list.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags().iter()
    }
}

impl FromIterator<Tag> for TagHolder {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self::new(iter)
    }
}
