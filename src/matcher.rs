//! Tag matching module.
//!
//! Provides the `TagMatcher` type, a pure predicate over a
//! [`TagHolder`]. Matchers decide which stats and containers a global
//! modifier applies to.

use crate::tag::TagHolder;
use serde::{Deserialize, Serialize};

fn default_required_matches() -> i32 {
    1
}

/// A predicate evaluated against a [`TagHolder`].
///
/// The matcher carries a filter holder, an invert flag, and a required
/// match count:
///
/// - `required_matches == 0`: trivially accepts (or rejects when
///   inverted) regardless of the holder.
/// - `required_matches > 0`: the holder must contain at least that many
///   tags from the filter.
/// - `required_matches < 0`: the holder must hit every tag in the filter;
///   the magnitude is ignored, negativity is purely a semantic flag.
///
/// An absent holder never matches (unless `required_matches == 0`).
/// The result is flipped by `invert`.
///
/// Matching is side-effect free and is reevaluated on every call; results
/// must not be cached because either endpoint's holder may still be
/// awaiting its one-time lazy initialization.
///
/// # Examples
///
/// ```rust
/// use stathub::{TagHolder, TagMatcher};
///
/// let matcher = TagMatcher::new(TagHolder::of(["fire", "buff"]), 2);
/// assert!(matcher.matches(Some(&TagHolder::of(["fire", "buff", "aura"]))));
/// assert!(!matcher.matches(Some(&TagHolder::of(["fire"]))));
/// assert!(!matcher.matches(None));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagMatcher {
    /// The tag holder used to filter applicable tags. A whitelist by
    /// default, a blacklist when `invert` is set.
    filter: TagHolder,

    /// Flips the final result, turning the filter into a blacklist.
    #[serde(default)]
    invert: bool,

    /// The number of filter matches required; negative means "all tags in
    /// the filter".
    #[serde(default = "default_required_matches")]
    required_matches: i32,
}

impl TagMatcher {
    /// Create a matcher requiring `required_matches` hits against `filter`.
    pub fn new(filter: TagHolder, required_matches: i32) -> Self {
        Self {
            filter,
            invert: false,
            required_matches,
        }
    }

    /// Create a matcher satisfied by any single tag from `filter`.
    pub fn any(filter: TagHolder) -> Self {
        Self::new(filter, 1)
    }

    /// Create a matcher requiring every tag in `filter` to be present.
    pub fn all(filter: TagHolder) -> Self {
        Self::new(filter, -1)
    }

    /// Flip the matcher into a blacklist.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stathub::{TagHolder, TagMatcher};
    ///
    /// let not_fire = TagMatcher::any(TagHolder::of(["fire"])).inverted();
    /// assert!(!not_fire.matches(Some(&TagHolder::of(["fire"]))));
    /// assert!(not_fire.matches(Some(&TagHolder::of(["ice"]))));
    /// ```
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// The filter holder.
    pub fn filter(&self) -> &TagHolder {
        &self.filter
    }

    /// Whether the result is inverted.
    pub fn invert(&self) -> bool {
        self.invert
    }

    /// The required match count.
    pub fn required_matches(&self) -> i32 {
        self.required_matches
    }

    /// Decide whether the tag holder satisfies this matcher's criteria.
    ///
    /// `None` stands for "no tags at all" and never matches except in the
    /// trivial `required_matches == 0` case.
    pub fn matches(&self, holder: Option<&TagHolder>) -> bool {
        if self.required_matches == 0 {
            return !self.invert;
        }

        let Some(holder) = holder else {
            return false;
        };

        if self.required_matches > 0 && (holder.len() as i32) < self.required_matches {
            return self.invert;
        }

        let filter_count = self.filter.len() as i32;
        let mut match_count = 0;
        let mut met = false;

        for tag in holder.iter() {
            if !self.filter.contains(tag) {
                continue;
            }
            match_count += 1;

            met = if self.required_matches > 0 {
                match_count >= self.required_matches
            } else {
                match_count == filter_count
            };

            if met {
                break;
            }
        }

        if met {
            !self.invert
        } else {
            self.invert
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_two_of_filter() {
        let matcher = TagMatcher::new(TagHolder::of(["a", "b"]), 2);
        assert!(matcher.matches(Some(&TagHolder::of(["a", "b", "c"]))));
        assert!(!matcher.matches(Some(&TagHolder::of(["a", "c"]))));
    }

    #[test]
    fn test_match_all_flag() {
        let matcher = TagMatcher::all(TagHolder::of(["a", "b"]));
        assert!(!matcher.matches(Some(&TagHolder::of(["a"]))));
        assert!(matcher.matches(Some(&TagHolder::of(["b", "a"]))));
    }

    #[test]
    fn test_zero_required_is_trivial() {
        let matcher = TagMatcher::new(TagHolder::of(["a"]), 0);
        assert!(matcher.matches(Some(&TagHolder::of(["zzz"]))));
        assert!(matcher.matches(None));

        let inverted = TagMatcher::new(TagHolder::of(["a"]), 0).inverted();
        assert!(!inverted.matches(Some(&TagHolder::of(["a"]))));
        assert!(!inverted.matches(None));
    }

    #[test]
    fn test_absent_holder_never_matches() {
        let matcher = TagMatcher::any(TagHolder::of(["a"]));
        assert!(!matcher.matches(None));
    }

    #[test]
    fn test_short_holder_takes_miss_branch() {
        let matcher = TagMatcher::new(TagHolder::of(["a", "b", "c"]), 3);
        // holder cannot possibly satisfy three matches
        assert!(!matcher.matches(Some(&TagHolder::of(["a", "b"]))));

        let inverted = TagMatcher::new(TagHolder::of(["a", "b", "c"]), 3).inverted();
        assert!(inverted.matches(Some(&TagHolder::of(["a", "b"]))));
    }

    #[test]
    fn test_inverted_flips_result() {
        let matcher = TagMatcher::any(TagHolder::of(["a"])).inverted();
        assert!(!matcher.matches(Some(&TagHolder::of(["a"]))));
        assert!(matcher.matches(Some(&TagHolder::of(["b"]))));
    }

    #[test]
    fn test_matcher_from_json() {
        let matcher: TagMatcher = serde_json::from_str(
            r#"{ "filter": { "source": ["fire", "buff"] }, "required_matches": -1 }"#,
        )
        .unwrap();
        assert_eq!(matcher.required_matches(), -1);
        assert!(!matcher.invert());
        assert!(matcher.matches(Some(&TagHolder::of(["buff", "fire"]))));
    }
}
