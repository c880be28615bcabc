use std::collections::BTreeMap;
use std::fmt;
use std::slice::Iter;

use arcstr::ArcStr;
use regex::{Regex, RegexBuilder};

use super::error::{PatternResult, validation};
use super::topic_pattern_item::{TopicPatternError, TopicPatternItem};

/// Filter name → filter value mapping attached to patterns and subscriptions
pub type FilterMap = BTreeMap<String, serde_json::Value>;

/// Semantic fields extracted from a Home Assistant style topic
pub type TopicGroups = BTreeMap<&'static str, String>;

/// Priority given to patterns created implicitly by a subscription
pub const DEFAULT_PRIORITY: i32 = 1;

const FOUR_LEVEL_GROUPS: [&str; 4] =
	["domain", "entity_type", "entity_name", "attribute"];
const FIVE_LEVEL_GROUPS: [&str; 5] =
	["domain", "entity_type", "node_id", "entity_name", "attribute"];

/// MQTT topic filter compiled into an anchored, case-insensitive matcher.
///
/// Construction either yields a fully valid pattern or fails with
/// [`TopicPatternError`]. The matcher is derived from the filter string only,
/// so two patterns with the same string match the same topics. The metadata
/// setters consume `self` and are meant to be used before the pattern is
/// registered with a manager, which shares it immutably afterwards.
#[derive(Debug, Clone)]
pub struct TopicPattern {
	pattern: ArcStr,
	description: String,
	priority: i32,
	enabled: bool,
	filters: FilterMap,
	segments: Vec<TopicPatternItem>,
	matcher: Regex,
}

impl TopicPattern {
	/// Parses, validates and compiles a topic filter.
	pub fn new(pattern: impl Into<ArcStr>) -> PatternResult<Self> {
		let pattern = pattern.into();
		validation::validate_pattern_for_subscription(&pattern)?;

		let segments: Result<Vec<_>, _> = pattern
			.split('/')
			.map(|s| pattern.substr_from(s))
			.map(TopicPatternItem::try_from)
			.collect();
		let segments = segments?;

		if let Some(hash_pos) = segments
			.iter()
			.position(|s| matches!(s, TopicPatternItem::Hash))
		{
			if hash_pos != segments.len() - 1 {
				return Err(TopicPatternError::hash_position(pattern.as_str()));
			}
		}

		let matcher = RegexBuilder::new(&Self::to_regex_source(&segments))
			.case_insensitive(true)
			.build()
			.map_err(|err| TopicPatternError::InvalidRegex {
				pattern: pattern.to_string(),
				details: err.to_string(),
			})?;

		Ok(Self {
			pattern,
			description: String::new(),
			priority: DEFAULT_PRIORITY,
			enabled: true,
			filters: FilterMap::new(),
			segments,
			matcher,
		})
	}

	fn to_regex_source(segments: &[TopicPatternItem]) -> String {
		let mut source = String::from("^");
		for (i, segment) in segments.iter().enumerate() {
			// `#` swallows its own separator so that `a/#` also matches `a`
			if let TopicPatternItem::Hash = segment {
				source.push_str(if i == 0 { ".*" } else { "(?:/.*)?" });
				continue;
			}
			if i > 0 {
				source.push('/');
			}
			match segment {
				| TopicPatternItem::Str(s) => source.push_str(&regex::escape(s)),
				| TopicPatternItem::Plus => source.push_str("[^/]+"),
				| TopicPatternItem::Custom(custom) => {
					source.push_str(&custom.regex_fragment())
				}
				| TopicPatternItem::Hash => {}
			}
		}
		source.push('$');
		source
	}

	/// Sets the human-readable description.
	pub fn with_description(self, description: impl Into<String>) -> Self {
		Self {
			description: description.into(),
			..self
		}
	}

	/// Sets the priority; higher priorities are matched and returned first.
	pub fn with_priority(self, priority: i32) -> Self {
		Self { priority, ..self }
	}

	/// Enables or disables the pattern. Disabled patterns never match.
	pub fn with_enabled(self, enabled: bool) -> Self {
		Self { enabled, ..self }
	}

	/// Attaches filter metadata.
	pub fn with_filters(self, filters: FilterMap) -> Self {
		Self { filters, ..self }
	}

	/// Returns the filter string.
	pub fn pattern(&self) -> &ArcStr {
		&self.pattern
	}

	/// Returns the description.
	pub fn description(&self) -> &str {
		&self.description
	}

	/// Returns the priority.
	pub fn priority(&self) -> i32 {
		self.priority
	}

	/// Returns true if the pattern takes part in matching.
	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Returns the filter metadata.
	pub fn filters(&self) -> &FilterMap {
		&self.filters
	}

	/// Returns iterator over pattern segments.
	pub fn iter(&self) -> Iter<'_, TopicPatternItem> {
		self.segments.iter()
	}

	/// Returns number of levels in the pattern.
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	/// Always false for a constructed pattern; present for API symmetry.
	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Returns true if pattern contains multi-level wildcard (#).
	pub fn contains_hash(&self) -> bool {
		self.segments
			.last()
			.is_some_and(|s| matches!(s, TopicPatternItem::Hash))
	}

	/// Number of wildcard tokens; fewer means more specific.
	pub fn wildcard_count(&self) -> usize {
		self.segments.iter().filter(|s| s.is_wildcard()).count()
	}

	/// Source of the compiled matcher.
	pub fn matcher_source(&self) -> &str {
		self.matcher.as_str()
	}

	/// Returns true if the pattern is enabled and matches the whole topic.
	pub fn matches(&self, topic: &str) -> bool {
		self.enabled && self.matcher.is_match(topic)
	}

	/// Extracts Home Assistant style fields from a matching topic.
	///
	/// Only 4-level (`domain/entity_type/entity_name/attribute`) and 5-level
	/// (`domain/entity_type/node_id/entity_name/attribute`) patterns without
	/// `#` are recognized. Any other pattern, or a topic the matcher rejects,
	/// yields an empty map. The enabled flag is ignored.
	pub fn extract_groups(&self, topic: &str) -> TopicGroups {
		let names: &[&'static str] = match self.segments.len() {
			| 4 => &FOUR_LEVEL_GROUPS,
			| 5 => &FIVE_LEVEL_GROUPS,
			| _ => return TopicGroups::new(),
		};
		if self.contains_hash() || !self.matcher.is_match(topic) {
			return TopicGroups::new();
		}
		names
			.iter()
			.zip(topic.split('/'))
			.map(|(name, value)| (*name, value.to_string()))
			.collect()
	}
}

impl fmt::Display for TopicPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.pattern)
	}
}

impl TryFrom<&str> for TopicPattern {
	type Error = TopicPatternError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl TryFrom<String> for TopicPattern {
	type Error = TopicPatternError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
