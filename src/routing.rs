//! Message routing and subscription management module
//!
//! This module provides the pattern registry, message routing with
//! per-subscription filters, callback dispatch, routing telemetry and the
//! actor that serializes access to a shared router.

/// Router actor, its controller and cloneable handle
pub mod actor;
/// Callback invocation for computed routes
pub mod dispatch;
/// Routing and registry error types
pub mod error;
pub mod filter;
pub mod metrics;
/// Pattern registry and message router
pub mod pattern_manager;
pub mod subscription;

#[cfg(test)]
mod pattern_manager_tests;

// Re-export commonly used types for convenience
pub use actor::{PatternRouterActor, PatternRouterController, PatternRouterHandle};
pub use dispatch::{DispatchReport, dispatch_routes};
pub use error::{RegistryError, RouterError};
pub use filter::{FilterError, SubscriptionFilters};
pub use metrics::{
	OptimizationAction, OptimizationReport, PerformanceAnalysis,
	PerformanceSample, PerformanceTrend, Recommendation, RouterMetrics,
};
pub use pattern_manager::TopicPatternManager;
pub use subscription::{
	Callback, CallbackError, CallbackResult, MessageContext, MessageMetadata,
	Route, Subscription, SubscriptionId,
};
