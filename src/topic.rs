//! Topic handling module
//!
//! This module provides components for working with MQTT topic patterns:
//! level parsing and validation, compilation into matchers, and the prefix
//! index used to narrow down candidate patterns for a topic.

// Submodules
pub mod error;
pub mod topic_hierarchy;
/// Compiled topic patterns
pub mod topic_pattern;
pub mod topic_pattern_item;


// Re-export commonly used types for convenience
pub use error::{PatternResult, limits, validation};
pub use topic_hierarchy::TopicHierarchy;
pub use topic_pattern::{DEFAULT_PRIORITY, FilterMap, TopicGroups, TopicPattern};
pub use topic_pattern_item::{
	CustomWildcard, TopicPatternError, TopicPatternItem,
};
