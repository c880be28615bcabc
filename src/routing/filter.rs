//! Per-subscription filter predicates
//!
//! Filters are a strict allow-list: every key must be one of the recognized
//! names below, all predicates must pass, and an unknown key or a malformed
//! value makes the subscription reject every message.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::topic::FilterMap;

/// Topic must contain a match for the regex
pub const TOPIC_REGEX: &str = "topic_regex";
/// Payload must contain a match for the regex
pub const PAYLOAD_REGEX: &str = "payload_regex";
/// Payload length (in characters) must be at least the value
pub const MIN_PAYLOAD_LENGTH: &str = "min_payload_length";
/// Payload length (in characters) must be at most the value
pub const MAX_PAYLOAD_LENGTH: &str = "max_payload_length";
/// Topic must start with the value
pub const TOPIC_PREFIX: &str = "topic_prefix";
/// Topic must end with the value
pub const TOPIC_SUFFIX: &str = "topic_suffix";

/// Errors found while evaluating subscription filters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
	/// Key is not one of the recognized filter names
	#[error("Unknown filter key '{key}'")]
	UnknownKey {
		/// The unrecognized key
		key: String,
	},

	/// Regex filter value failed to compile
	#[error("Filter '{key}' has an invalid regex: {details}")]
	InvalidRegex {
		/// Filter name
		key: String,
		/// Compiler error message
		details: String,
	},

	/// Filter value has the wrong type
	#[error("Filter '{key}' expects {expected}, got {found}")]
	TypeMismatch {
		/// Filter name
		key: String,
		/// Expected value type
		expected: &'static str,
		/// The value that was supplied
		found: String,
	},
}

impl FilterError {
	fn type_mismatch(key: &str, expected: &'static str, found: &Value) -> Self {
		Self::TypeMismatch {
			key: key.to_string(),
			expected,
			found: found.to_string(),
		}
	}
}

#[derive(Debug, Clone)]
enum FilterPredicate {
	TopicRegex(Regex),
	PayloadRegex(Regex),
	MinPayloadLength(usize),
	MaxPayloadLength(usize),
	TopicPrefix(String),
	TopicSuffix(String),
	Invalid(FilterError),
}

impl FilterPredicate {
	fn parse(key: &str, value: &Value) -> Result<Self, FilterError> {
		let predicate = match key {
			| TOPIC_REGEX => Self::TopicRegex(regex_value(key, value)?),
			| PAYLOAD_REGEX => Self::PayloadRegex(regex_value(key, value)?),
			| MIN_PAYLOAD_LENGTH => {
				Self::MinPayloadLength(length_value(key, value)?)
			}
			| MAX_PAYLOAD_LENGTH => {
				Self::MaxPayloadLength(length_value(key, value)?)
			}
			| TOPIC_PREFIX => Self::TopicPrefix(string_value(key, value)?.to_owned()),
			| TOPIC_SUFFIX => Self::TopicSuffix(string_value(key, value)?.to_owned()),
			| _ => {
				return Err(FilterError::UnknownKey {
					key: key.to_string(),
				});
			}
		};
		Ok(predicate)
	}

	fn test(&self, topic: &str, payload: &str) -> Result<bool, FilterError> {
		let passed = match self {
			| Self::TopicRegex(regex) => regex.is_match(topic),
			| Self::PayloadRegex(regex) => regex.is_match(payload),
			| Self::MinPayloadLength(min) => payload.chars().count() >= *min,
			| Self::MaxPayloadLength(max) => payload.chars().count() <= *max,
			| Self::TopicPrefix(prefix) => topic.starts_with(prefix.as_str()),
			| Self::TopicSuffix(suffix) => topic.ends_with(suffix.as_str()),
			| Self::Invalid(err) => return Err(err.clone()),
		};
		Ok(passed)
	}
}

fn string_value<'a>(key: &str, value: &'a Value) -> Result<&'a str, FilterError> {
	value
		.as_str()
		.ok_or_else(|| FilterError::type_mismatch(key, "a string", value))
}

fn regex_value(key: &str, value: &Value) -> Result<Regex, FilterError> {
	Regex::new(string_value(key, value)?).map_err(|err| FilterError::InvalidRegex {
		key: key.to_string(),
		details: err.to_string(),
	})
}

fn length_value(key: &str, value: &Value) -> Result<usize, FilterError> {
	value
		.as_u64()
		.and_then(|length| usize::try_from(length).ok())
		.ok_or_else(|| FilterError::type_mismatch(key, "a non-negative integer", value))
}

/// Compiled filter predicates of one subscription.
///
/// Values are parsed once at construction. A key or value that cannot be
/// parsed is kept as a failing predicate and reported on every evaluation,
/// so a misconfigured filter rejects messages instead of being ignored.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilters {
	source: FilterMap,
	predicates: Vec<FilterPredicate>,
}

impl SubscriptionFilters {
	/// Compiles a filter mapping.
	pub fn new(source: FilterMap) -> Self {
		let predicates = source
			.iter()
			.map(|(key, value)| {
				FilterPredicate::parse(key, value)
					.unwrap_or_else(FilterPredicate::Invalid)
			})
			.collect();
		Self { source, predicates }
	}

	/// The mapping these filters were built from.
	pub fn as_map(&self) -> &FilterMap {
		&self.source
	}

	/// Returns true if no filters are set.
	pub fn is_empty(&self) -> bool {
		self.predicates.is_empty()
	}

	/// Evaluates all predicates against a message.
	///
	/// `Ok(false)` means a predicate rejected the message; `Err` means the
	/// filter itself is unusable, which callers treat as a rejection too.
	pub fn evaluate(&self, topic: &str, payload: &str) -> Result<bool, FilterError> {
		// An unusable entry wins over a plain rejection from another one
		if let Some(FilterPredicate::Invalid(err)) = self
			.predicates
			.iter()
			.find(|p| matches!(p, FilterPredicate::Invalid(_)))
		{
			return Err(err.clone());
		}
		for predicate in &self.predicates {
			if !predicate.test(topic, payload)? {
				return Ok(false);
			}
		}
		Ok(true)
	}
}

impl From<FilterMap> for SubscriptionFilters {
	fn from(source: FilterMap) -> Self {
		Self::new(source)
	}
}
