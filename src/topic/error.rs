//! Shared constants and validation helpers for the topic module
//!
//! Individual error types live next to the code that raises them; this
//! module holds the limits every pattern is checked against before it is
//! parsed level by level.

use super::topic_pattern_item::TopicPatternError;

/// Convenient Result type for pattern operations
pub type PatternResult<T> = Result<T, TopicPatternError>;

/// Topic processing limits and constants
pub mod limits {
	/// Maximum topic nesting depth allowed
	pub const MAX_TOPIC_DEPTH: usize = 32;

	/// Maximum total topic path length
	pub const MAX_TOPIC_LENGTH: usize = 1024;
}

/// Validation utilities for topic operations
pub mod validation {
	use super::TopicPatternError;
	use super::limits::*;

	/// Validates topic pattern for subscription constraints
	pub fn validate_pattern_for_subscription(
		pattern: &str,
	) -> Result<(), TopicPatternError> {
		if pattern.is_empty() || pattern.trim().is_empty() {
			return Err(TopicPatternError::EmptyTopic);
		}

		if pattern.len() > MAX_TOPIC_LENGTH {
			return Err(TopicPatternError::TooLong {
				length: pattern.len(),
				max: MAX_TOPIC_LENGTH,
			});
		}

		let depth = pattern.split('/').count();
		if depth > MAX_TOPIC_DEPTH {
			return Err(TopicPatternError::wildcard_usage(format!(
				"Pattern too deep: {depth} segments > {MAX_TOPIC_DEPTH}"
			)));
		}

		Ok(())
	}

	/// Returns true if `topic` can be published to: non-empty and free of
	/// wildcard characters and null bytes.
	pub fn is_concrete_topic(topic: &str) -> bool {
		!topic.is_empty()
			&& topic.len() <= MAX_TOPIC_LENGTH
			&& !topic.chars().any(|c| matches!(c, '\0' | '#' | '+'))
	}
}
