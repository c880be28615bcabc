use thiserror::Error;

use super::subscription::SubscriptionId;
use crate::topic::TopicPatternError;

/// Expected, recoverable failures of registry mutations.
///
/// These are reported to the caller and logged; they never indicate a bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
	/// Pattern string is empty
	#[error("Topic pattern cannot be empty")]
	EmptyPattern,

	/// A pattern with the same string is already registered
	#[error("Topic pattern '{pattern}' is already registered")]
	DuplicatePattern {
		/// The duplicated pattern string
		pattern: String,
	},

	/// No pattern with this string is registered
	#[error("Topic pattern '{pattern}' is not registered")]
	PatternNotFound {
		/// The unknown pattern string
		pattern: String,
	},

	/// Subscription with given ID was not found
	#[error("Subscription {id} not found")]
	SubscriptionNotFound {
		/// The unknown subscription
		id: SubscriptionId,
	},
}

impl RegistryError {
	/// Creates a new DuplicatePattern error
	pub fn duplicate_pattern(pattern: impl Into<String>) -> Self {
		Self::DuplicatePattern {
			pattern: pattern.into(),
		}
	}

	/// Creates a new PatternNotFound error
	pub fn pattern_not_found(pattern: impl Into<String>) -> Self {
		Self::PatternNotFound {
			pattern: pattern.into(),
		}
	}

	/// Creates a new SubscriptionNotFound error
	pub fn subscription_not_found(id: SubscriptionId) -> Self {
		Self::SubscriptionNotFound { id }
	}
}

/// Errors returned by the router actor handle and by settings validation.
#[derive(Error, Debug)]
pub enum RouterError {
	/// The actor is no longer accepting commands
	#[error("Router command channel closed")]
	ChannelClosed,

	/// The actor dropped the reply channel before answering
	#[error("Router response lost")]
	ResponseLost,

	/// Settings failed validation
	#[error("Invalid router settings: {0}")]
	InvalidSettings(String),

	/// Pattern construction failed
	#[error("Topic pattern error: {0}")]
	Pattern(#[from] TopicPatternError),

	/// Registry mutation was rejected
	#[error("Registry error: {0}")]
	Registry(#[from] RegistryError),
}
