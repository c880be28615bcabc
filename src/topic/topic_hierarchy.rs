#![allow(missing_docs)]
use std::collections::{HashMap, HashSet};

use arcstr::ArcStr;

use super::topic_pattern::TopicPattern;
use super::topic_pattern_item::TopicPatternItem;

/// Prefix index over registered patterns.
///
/// Every pattern is recorded under each of its level prefixes, normalized
/// with [`TopicPatternItem::hierarchy_key`](super::TopicPatternItem::hierarchy_key):
/// `home/+/state` lands in `home`, `home/+` and `home/+/state`. Buckets that
/// become empty are deleted.
///
/// Lowercased keys only agree with the matcher's case folding for ASCII, so
/// patterns whose first level is a non-ASCII literal are also kept in
/// `unfolded_roots` and offered for every topic.
#[derive(Debug, Default)]
pub struct TopicHierarchy {
	buckets: HashMap<String, HashSet<ArcStr>>,
	unfolded_roots: HashSet<ArcStr>,
}

impl TopicHierarchy {
	pub fn new() -> Self {
		Self::default()
	}

	fn prefixes(pattern: &TopicPattern) -> Vec<String> {
		let mut prefix = String::with_capacity(pattern.pattern().len());
		pattern
			.iter()
			.enumerate()
			.map(|(i, segment)| {
				if i > 0 {
					prefix.push('/');
				}
				prefix.push_str(&segment.hierarchy_key());
				prefix.clone()
			})
			.collect()
	}

	fn has_unfolded_root(pattern: &TopicPattern) -> bool {
		matches!(
			pattern.iter().next(),
			Some(TopicPatternItem::Str(level)) if !level.is_ascii()
		)
	}

	/// Records `pattern` under all of its prefixes.
	pub fn insert(&mut self, pattern: &TopicPattern) {
		if Self::has_unfolded_root(pattern) {
			self.unfolded_roots.insert(pattern.pattern().clone());
		}
		for prefix in Self::prefixes(pattern) {
			self.buckets
				.entry(prefix)
				.or_default()
				.insert(pattern.pattern().clone());
		}
	}

	/// Removes `pattern` from its prefixes, returning how many buckets were
	/// deleted because they became empty.
	pub fn remove(&mut self, pattern: &TopicPattern) -> usize {
		self.unfolded_roots.remove(pattern.pattern().as_str());
		let mut pruned = 0;
		for prefix in Self::prefixes(pattern) {
			if let Some(bucket) = self.buckets.get_mut(&prefix) {
				bucket.remove(pattern.pattern().as_str());
				if bucket.is_empty() {
					self.buckets.remove(&prefix);
					pruned += 1;
				}
			}
		}
		pruned
	}

	/// Patterns recorded under exactly this normalized prefix.
	pub fn covering(&self, prefix: &str) -> Option<&HashSet<ArcStr>> {
		self.buckets.get(prefix)
	}

	/// Patterns that could match `topic`: those whose first level equals the
	/// topic's first level, is a wildcard, or is a non-ASCII literal.
	///
	/// A topic whose first level is not ASCII gets every root-level pattern.
	pub fn candidates(&self, topic: &str) -> HashSet<ArcStr> {
		let first_level = topic.split('/').next().unwrap_or_default();
		if !first_level.is_ascii() {
			return self
				.buckets
				.iter()
				.filter(|(prefix, _)| !prefix.contains('/'))
				.flat_map(|(_, bucket)| bucket.iter().cloned())
				.collect();
		}
		let first_level = first_level.to_ascii_lowercase();
		[first_level.as_str(), "+", "#"]
			.into_iter()
			.filter_map(|key| self.buckets.get(key))
			.flatten()
			.chain(&self.unfolded_roots)
			.cloned()
			.collect()
	}

	/// Number of prefix buckets.
	pub fn len(&self) -> usize {
		self.buckets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buckets.is_empty()
	}

	pub fn clear(&mut self) {
		self.buckets.clear();
		self.unfolded_roots.clear();
	}
}
