//! # MQTT Pattern Router
//!
//! A Rust library for matching MQTT topics against registered topic filters
//! and routing inbound messages to the subscriptions interested in them.
//!
//! ## Features
//!
//! - **Compiled Patterns**: Topic filters with `+`, `#` and Home Assistant
//!   tokens (`\ha_domain`, `\ha_entity`) compiled into anchored matchers
//! - **Priority Routing**: Matches and routes ordered by pattern priority
//! - **Subscription Filters**: Per-subscription topic/payload predicates
//! - **Match Caching**: Bounded topic → matching patterns cache, oldest evicted first
//! - **Subscription Optimization**: Collapse concrete topics into covering
//!   patterns before subscribing on the broker
//! - **Telemetry**: Counters, rolling latency history and tuning advice
//! - **Actor Access**: Share one router between tasks through a command channel
//!
//! ## Quick Start
//!
//! ```rust
//! use mqtt_pattern_router::prelude::*;
//!
//! let mut router = TopicPatternManager::new();
//! router
//! 	.add_pattern(TopicPattern::new("home/+/temperature")?.with_priority(5))
//! 	.unwrap();
//!
//! let id = router.subscribe_to_pattern(
//! 	"home/+/temperature",
//! 	Some(Callback::sync(|msg| {
//! 		println!("{} -> {}", msg.topic, msg.payload);
//! 		Ok(())
//! 	})),
//! 	QoS::AtLeastOnce,
//! 	None,
//! )?;
//!
//! let routes = router.route_message(
//! 	"home/kitchen/temperature",
//! 	"21.5",
//! 	&MessageMetadata::default(),
//! );
//! assert_eq!(routes.len(), 1);
//! assert_eq!(routes[0].subscription_id, id);
//! # Ok::<(), mqtt_pattern_router::TopicPatternError>(())
//! ```
//!
//! ## Pattern Matching
//!
//! - `+` matches exactly one non-empty topic level
//! - `#` (last level only) matches the parent level and everything below it
//! - matching is case-insensitive and always covers the whole topic

#![warn(missing_docs)]

// Core modules
pub mod config;
pub mod routing;
pub mod topic;

// === Core Public API ===
pub use config::{ActorSettings, RouterSettings};
pub use routing::{
	Callback, DispatchReport, MessageContext, MessageMetadata, Route,
	SubscriptionId, TopicPatternManager, dispatch_routes,
};
pub use topic::{TopicPattern, TopicPatternError};

// Essential external types
pub use rumqttc::QoS;

// === Advanced API ===
pub use routing::{
	PatternRouterActor, PatternRouterController, PatternRouterHandle,
};

/// Prelude module for convenient imports
///
/// This module provides the most commonly used types for routing messages.
///
/// ```rust
/// use mqtt_pattern_router::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for most routing setups

	pub use crate::{
		Callback, MessageContext, MessageMetadata, QoS, Route, RouterSettings,
		SubscriptionId, TopicPattern, TopicPatternManager, dispatch_routes,
	};
}

/// Error types used throughout the library
///
/// ```rust
/// use mqtt_pattern_router::errors::*;
/// ```
pub mod errors {
	//! All error types used in the library

	pub use crate::TopicPatternError;
	pub use crate::routing::{FilterError, RegistryError, RouterError};
}
