//! Configuration for the pattern manager and the router actor

use std::fmt::Display;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::routing::RouterError;

/// Pattern manager cache sizes and telemetry thresholds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
	/// Maximum number of topics kept in the match cache (must be > 0)
	pub match_cache_capacity: usize,
	/// Number of per-message performance samples retained (must be > 0)
	pub history_capacity: usize,
	/// Hierarchy buckets above which `optimize_performance` clears the index
	pub hierarchy_cache_limit: usize,
	/// Fill ratio of the match cache at which `optimize_performance` clears it
	pub cache_clear_ratio: f64,
	/// Cache hit rate below which a larger cache is recommended
	pub min_cache_hit_rate: f64,
	/// Wildcard count above which a pattern is reported as complex
	pub max_pattern_wildcards: usize,
	/// Subscriptions per pattern above which a split is recommended
	pub max_subscriptions_per_pattern: usize,
	/// Average routing time (µs) above which processing is reported as slow
	pub slow_processing_threshold_us: u64,
}

impl Default for RouterSettings {
	fn default() -> Self {
		Self {
			match_cache_capacity: 1000,
			history_capacity: 100,
			hierarchy_cache_limit: 1000,
			cache_clear_ratio: 0.9,
			min_cache_hit_rate: 0.5,
			max_pattern_wildcards: 3,
			max_subscriptions_per_pattern: 10,
			slow_processing_threshold_us: 1000,
		}
	}
}

impl RouterSettings {
	/// Default settings overridden by `MQTT_ROUTER_*` environment variables.
	///
	/// Recognized variables: `MQTT_ROUTER_MATCH_CACHE_SIZE`,
	/// `MQTT_ROUTER_HISTORY_SIZE`, `MQTT_ROUTER_HIERARCHY_LIMIT`,
	/// `MQTT_ROUTER_SLOW_THRESHOLD_US`. The result is validated.
	pub fn from_env() -> Result<Self, RouterError> {
		let mut settings = Self::default();
		if let Some(value) = env_value("MQTT_ROUTER_MATCH_CACHE_SIZE")? {
			settings.match_cache_capacity = value;
		}
		if let Some(value) = env_value("MQTT_ROUTER_HISTORY_SIZE")? {
			settings.history_capacity = value;
		}
		if let Some(value) = env_value("MQTT_ROUTER_HIERARCHY_LIMIT")? {
			settings.hierarchy_cache_limit = value;
		}
		if let Some(value) = env_value("MQTT_ROUTER_SLOW_THRESHOLD_US")? {
			settings.slow_processing_threshold_us = value;
		}
		settings.validate()?;
		Ok(settings)
	}

	/// Checks value ranges and returns the match cache capacity.
	pub fn validate(&self) -> Result<NonZeroUsize, RouterError> {
		if self.history_capacity == 0 {
			return Err(RouterError::InvalidSettings(
				"history_capacity must be greater than 0".to_string(),
			));
		}
		if !(self.cache_clear_ratio > 0.0 && self.cache_clear_ratio <= 1.0) {
			return Err(RouterError::InvalidSettings(format!(
				"cache_clear_ratio must be in (0, 1], got {}",
				self.cache_clear_ratio
			)));
		}
		if !(0.0 ..= 1.0).contains(&self.min_cache_hit_rate) {
			return Err(RouterError::InvalidSettings(format!(
				"min_cache_hit_rate must be in [0, 1], got {}",
				self.min_cache_hit_rate
			)));
		}
		NonZeroUsize::new(self.match_cache_capacity).ok_or_else(|| {
			RouterError::InvalidSettings(
				"match_cache_capacity must be greater than 0".to_string(),
			)
		})
	}

	/// Slow-processing threshold as a duration.
	pub fn slow_processing_threshold(&self) -> Duration {
		Duration::from_micros(self.slow_processing_threshold_us)
	}
}

fn env_value<T>(name: &str) -> Result<Option<T>, RouterError>
where
	T: FromStr,
	T::Err: Display,
{
	match std::env::var(name) {
		| Ok(raw) => raw.trim().parse().map(Some).map_err(|err| {
			RouterError::InvalidSettings(format!("{name}={raw}: {err}"))
		}),
		| Err(_) => Ok(None),
	}
}

/// Router actor settings
#[derive(Debug, Clone, PartialEq)]
pub struct ActorSettings {
	/// Capacity of the command channel
	pub command_channel_capacity: usize,
	/// Run `optimize_performance` on this period when set
	pub optimize_interval: Option<Duration>,
}

impl Default for ActorSettings {
	fn default() -> Self {
		Self {
			command_channel_capacity: 100,
			optimize_interval: None,
		}
	}
}
