//! Pattern registry and message router
//!
//! [`TopicPatternManager`] owns the registered patterns and subscriptions and
//! turns an inbound `(topic, payload)` pair into the ordered list of
//! subscriptions that should receive it. All operations are synchronous and
//! take `&mut self`; share a manager between tasks through
//! [`PatternRouterActor`](super::PatternRouterActor).

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use arcstr::ArcStr;
use lru::LruCache;
use rumqttc::QoS;
use tracing::{debug, trace, warn};

use super::error::{RegistryError, RouterError};
use super::filter::SubscriptionFilters;
use super::metrics::{
	OptimizationAction, OptimizationReport, PerformanceAnalysis,
	PerformanceHistory, PerformanceSample, Recommendation, RouterCounters,
	RouterMetrics,
};
use super::subscription::{
	Callback, MessageMetadata, Route, Subscription, SubscriptionId,
};
use crate::config::RouterSettings;
use crate::topic::{
	FilterMap, TopicHierarchy, TopicPattern, TopicPatternError, validation,
};

type MatchList = Vec<Arc<TopicPattern>>;

/// Registry of topic patterns and their subscriptions.
pub struct TopicPatternManager {
	settings: RouterSettings,
	/// Sorted by descending priority; equal priorities keep insertion order
	patterns: MatchList,
	pattern_index: HashMap<ArcStr, Arc<TopicPattern>>,
	subscriptions: HashMap<SubscriptionId, Subscription>,
	/// Subscription ids per pattern string, in registration order
	pattern_subscriptions: HashMap<ArcStr, Vec<SubscriptionId>>,
	match_cache: LruCache<ArcStr, MatchList>,
	hierarchy: TopicHierarchy,
	/// Set when the hierarchy was dropped; rebuilt before it is next queried
	hierarchy_stale: bool,
	counters: RouterCounters,
	history: PerformanceHistory,
	next_sequence: u64,
}

impl Default for TopicPatternManager {
	fn default() -> Self {
		Self::new()
	}
}

impl TopicPatternManager {
	/// Creates a manager with default settings.
	pub fn new() -> Self {
		let settings = RouterSettings::default();
		let capacity = NonZeroUsize::new(settings.match_cache_capacity)
			.unwrap_or(NonZeroUsize::MIN);
		Self::build(settings, capacity)
	}

	/// Creates a manager with validated custom settings.
	pub fn with_settings(settings: RouterSettings) -> Result<Self, RouterError> {
		let capacity = settings.validate()?;
		Ok(Self::build(settings, capacity))
	}

	fn build(settings: RouterSettings, match_cache_capacity: NonZeroUsize) -> Self {
		Self {
			history: PerformanceHistory::new(settings.history_capacity.max(1)),
			settings,
			patterns: Vec::new(),
			pattern_index: HashMap::new(),
			subscriptions: HashMap::new(),
			pattern_subscriptions: HashMap::new(),
			match_cache: LruCache::new(match_cache_capacity),
			hierarchy: TopicHierarchy::new(),
			hierarchy_stale: false,
			counters: RouterCounters::default(),
			next_sequence: 0,
		}
	}

	/// Settings this manager was built with.
	pub fn settings(&self) -> &RouterSettings {
		&self.settings
	}

	// ---- registry -------------------------------------------------------

	/// Registers a pattern.
	///
	/// Rejects empty and duplicate pattern strings. On success the pattern
	/// list is re-sorted, the hierarchy index extended and the match cache
	/// cleared.
	pub fn add_pattern(&mut self, pattern: TopicPattern) -> Result<(), RegistryError> {
		if pattern.pattern().is_empty() {
			warn!("Rejected empty topic pattern");
			return Err(RegistryError::EmptyPattern);
		}
		if self.pattern_index.contains_key(pattern.pattern()) {
			warn!(pattern = %pattern, "Topic pattern already registered");
			return Err(RegistryError::duplicate_pattern(pattern.pattern().as_str()));
		}
		self.insert_pattern(pattern);
		Ok(())
	}

	fn insert_pattern(&mut self, pattern: TopicPattern) -> ArcStr {
		let pattern = Arc::new(pattern);
		let key = pattern.pattern().clone();
		if !self.hierarchy_stale {
			self.hierarchy.insert(&pattern);
		}
		self.pattern_index.insert(key.clone(), Arc::clone(&pattern));
		debug!(
			pattern = %key,
			priority = pattern.priority(),
			"Topic pattern registered"
		);
		self.patterns.push(pattern);
		self.sort_patterns();
		self.invalidate_match_cache();
		key
	}

	/// Removes a pattern.
	///
	/// Subscriptions bound to the pattern are detached along with it.
	pub fn remove_pattern(&mut self, pattern: &str) -> Result<(), RegistryError> {
		let Some(removed) = self.pattern_index.remove(pattern) else {
			warn!(pattern = %pattern, "Cannot remove unknown topic pattern");
			return Err(RegistryError::pattern_not_found(pattern));
		};
		self.patterns.retain(|p| p.pattern().as_str() != pattern);
		let pruned = if self.hierarchy_stale {
			0
		} else {
			self.hierarchy.remove(&removed)
		};

		let detached = self.pattern_subscriptions.remove(pattern).unwrap_or_default();
		for id in &detached {
			if self.subscriptions.remove(id).is_some() {
				self.counters.subscriptions_removed += 1;
			}
		}

		self.invalidate_match_cache();
		debug!(
			pattern = %pattern,
			pruned_buckets = pruned,
			detached_subscriptions = detached.len(),
			"Topic pattern removed"
		);
		Ok(())
	}

	/// Changes the priority of a registered pattern.
	pub fn set_pattern_priority(
		&mut self,
		pattern: &str,
		priority: i32,
	) -> Result<(), RegistryError> {
		self.replace_pattern(pattern, |p| p.with_priority(priority))
	}

	/// Enables or disables a registered pattern.
	pub fn set_pattern_enabled(
		&mut self,
		pattern: &str,
		enabled: bool,
	) -> Result<(), RegistryError> {
		self.replace_pattern(pattern, |p| p.with_enabled(enabled))
	}

	// Registered patterns are shared immutably, so a change swaps in an
	// updated copy and drops every cached match list.
	fn replace_pattern<F>(&mut self, pattern: &str, update: F) -> Result<(), RegistryError>
	where F: FnOnce(TopicPattern) -> TopicPattern {
		let Some(current) = self.pattern_index.get(pattern) else {
			warn!(pattern = %pattern, "Cannot update unknown topic pattern");
			return Err(RegistryError::pattern_not_found(pattern));
		};
		let updated = Arc::new(update(current.as_ref().clone()));
		self.pattern_index
			.insert(updated.pattern().clone(), Arc::clone(&updated));
		if let Some(slot) = self
			.patterns
			.iter_mut()
			.find(|p| p.pattern().as_str() == pattern)
		{
			*slot = updated;
		}
		self.sort_patterns();
		self.invalidate_match_cache();
		Ok(())
	}

	/// Subscribes to a pattern string, registering the pattern on first use.
	///
	/// A missing pattern is created with the default priority, enabled, with
	/// `filters` as its metadata. Every call creates a new, independent
	/// subscription. Fails only if the pattern string is invalid.
	pub fn subscribe_to_pattern(
		&mut self,
		pattern: &str,
		callback: Option<Callback>,
		qos: QoS,
		filters: Option<FilterMap>,
	) -> Result<SubscriptionId, TopicPatternError> {
		let filters = filters.unwrap_or_default();
		let topic = match self.pattern_index.get(pattern) {
			| Some(existing) => existing.pattern().clone(),
			| None => {
				let created = TopicPattern::new(pattern)?.with_filters(filters.clone());
				self.insert_pattern(created)
			}
		};

		let created_at = SystemTime::now();
		let id = SubscriptionId::new(self.next_sequence, created_at);
		self.next_sequence += 1;

		let subscription = Subscription::new(
			id,
			topic.clone(),
			qos,
			callback,
			SubscriptionFilters::new(filters),
			created_at,
		);
		self.pattern_subscriptions
			.entry(topic)
			.or_default()
			.push(id);
		self.subscriptions.insert(id, subscription);
		self.counters.subscriptions_created += 1;

		debug!(subscription_id = %id, pattern = %pattern, qos = ?qos, "Subscription created");
		Ok(id)
	}

	/// Removes a subscription; the last one for a pattern removes the pattern.
	pub fn unsubscribe_from_pattern(
		&mut self,
		id: &SubscriptionId,
	) -> Result<(), RegistryError> {
		self.detach_subscription(id, true)
	}

	/// Undoes a subscription nobody will ever learn about.
	///
	/// The pattern is removed along with its last subscription only when
	/// `created_pattern` says the subscription registered it; a pattern added
	/// beforehand stays registered.
	pub(crate) fn rollback_subscription(
		&mut self,
		id: &SubscriptionId,
		created_pattern: bool,
	) -> Result<(), RegistryError> {
		self.detach_subscription(id, created_pattern)
	}

	fn detach_subscription(
		&mut self,
		id: &SubscriptionId,
		remove_unused_pattern: bool,
	) -> Result<(), RegistryError> {
		let Some(subscription) = self.subscriptions.remove(id) else {
			warn!(subscription_id = %id, "Cannot unsubscribe unknown subscription");
			return Err(RegistryError::subscription_not_found(*id));
		};
		self.counters.subscriptions_removed += 1;

		let topic = subscription.topic();
		let now_empty = match self.pattern_subscriptions.get_mut(topic) {
			| Some(ids) => {
				ids.retain(|existing| existing != id);
				ids.is_empty()
			}
			| None => true,
		};
		debug!(subscription_id = %id, pattern = %topic, "Subscription removed");

		if now_empty {
			self.pattern_subscriptions.remove(topic);
			if !remove_unused_pattern {
				return Ok(());
			}
			if let Err(err) = self.remove_pattern(topic) {
				debug!(pattern = %topic, error = %err, "Pattern already gone after last unsubscribe");
			}
		}
		Ok(())
	}

	/// Drops all patterns, subscriptions and cached state. Counters survive.
	pub fn clear(&mut self) {
		self.patterns.clear();
		self.pattern_index.clear();
		self.subscriptions.clear();
		self.pattern_subscriptions.clear();
		self.match_cache.clear();
		self.hierarchy.clear();
		self.hierarchy_stale = false;
	}

	// ---- queries --------------------------------------------------------

	/// Registered pattern by string.
	pub fn pattern(&self, pattern: &str) -> Option<&Arc<TopicPattern>> {
		self.pattern_index.get(pattern)
	}

	/// Registered patterns in descending priority order.
	pub fn patterns(&self) -> &[Arc<TopicPattern>] {
		&self.patterns
	}

	/// Number of registered patterns.
	pub fn pattern_count(&self) -> usize {
		self.patterns.len()
	}

	/// Subscription by id.
	pub fn subscription(&self, id: &SubscriptionId) -> Option<&Subscription> {
		self.subscriptions.get(id)
	}

	/// Number of live subscriptions.
	pub fn subscription_count(&self) -> usize {
		self.subscriptions.len()
	}

	/// Subscriptions bound to a pattern string, in registration order.
	pub fn subscriptions_for_pattern(&self, pattern: &str) -> Vec<&Subscription> {
		self.pattern_subscriptions
			.get(pattern)
			.into_iter()
			.flatten()
			.filter_map(|id| self.subscriptions.get(id))
			.collect()
	}

	/// Every pattern string with subscribers, paired with the highest QoS
	/// requested for it. This is what the wire client subscribes to.
	pub fn subscription_qos_by_pattern(&self) -> HashMap<ArcStr, QoS> {
		let mut result: HashMap<ArcStr, QoS> = HashMap::new();

		for subscription in self.subscriptions.values() {
			let qos = subscription.qos();
			result
				.entry(subscription.topic().clone())
				.and_modify(|existing_qos| {
					if qos as u8 > *existing_qos as u8 {
						*existing_qos = qos;
					}
				})
				.or_insert(qos);
		}

		result
	}

	// ---- matching & routing ---------------------------------------------

	/// All enabled patterns matching `topic`, highest priority first.
	///
	/// Results are cached per topic until the pattern set changes. Hits do
	/// not refresh an entry, so a full cache evicts the oldest topic first.
	pub fn find_matching_patterns(&mut self, topic: &str) -> Vec<Arc<TopicPattern>> {
		let started = Instant::now();
		if let Some(cached) = self.match_cache.peek(topic) {
			let matched = cached.clone();
			self.counters.cache_hits += 1;
			self.counters.total_match_time += started.elapsed();
			trace!(topic = %topic, matches = matched.len(), "Match cache hit");
			return matched;
		}

		let matched: MatchList = self
			.patterns
			.iter()
			.filter(|p| p.matches(topic))
			.cloned()
			.collect();
		self.counters.cache_misses += 1;
		self.counters.pattern_matches += matched.len() as u64;

		if let Some((evicted, _)) =
			self.match_cache.push(ArcStr::from(topic), matched.clone())
		{
			trace!(evicted = %evicted, "Match cache entry evicted");
		}
		self.counters.total_match_time += started.elapsed();
		matched
	}

	/// Computes the routes for one inbound message.
	///
	/// Routes follow pattern priority, then subscription registration order.
	/// Subscriptions whose filters reject the message, or that have no
	/// callback, produce no route. Callbacks are never invoked here.
	pub fn route_message(
		&mut self,
		topic: &str,
		payload: &str,
		metadata: &MessageMetadata,
	) -> Vec<Route> {
		let started = Instant::now();
		let matching = self.find_matching_patterns(topic);
		let received_at = metadata.timestamp.unwrap_or_else(SystemTime::now);

		let mut routes = Vec::new();
		for pattern in &matching {
			let Some(ids) = self.pattern_subscriptions.get(pattern.pattern())
			else {
				continue;
			};
			for id in ids {
				let Some(subscription) = self.subscriptions.get_mut(id) else {
					continue;
				};
				if !Self::passes_filters(subscription, topic, payload) {
					continue;
				}
				subscription.record_message(received_at);
				if let Some(callback) = subscription.callback() {
					routes.push(Route {
						subscription_id: *id,
						callback: callback.clone(),
					});
				}
			}
		}

		let elapsed = started.elapsed();
		self.counters.messages_routed += 1;
		self.counters.routes_produced += routes.len() as u64;
		self.counters.total_routing_time += elapsed;
		self.history.push(PerformanceSample {
			topic: ArcStr::from(topic),
			route_count: routes.len(),
			elapsed,
			pattern_matches: self.counters.pattern_matches,
			messages_routed: self.counters.messages_routed,
			cache_hit_rate: self.counters.cache_hit_rate(),
			recorded_at: SystemTime::now(),
		});
		trace!(topic = %topic, routes = routes.len(), elapsed = ?elapsed, "Message routed");
		routes
	}

	fn passes_filters(subscription: &Subscription, topic: &str, payload: &str) -> bool {
		match subscription.filters().evaluate(topic, payload) {
			| Ok(passed) => passed,
			| Err(err) => {
				warn!(
					subscription_id = %subscription.id(),
					topic = %topic,
					error = %err,
					"Subscription filter failed, message not routed"
				);
				false
			}
		}
	}

	// ---- optimization & telemetry ----------------------------------------

	/// Collapses concrete topics into the registered patterns covering them.
	///
	/// Each topic is covered by its most specific matching pattern (fewest
	/// wildcards, then most literal levels, then highest priority, then
	/// lowest pattern string). Topics no pattern matches, and inputs that are
	/// not concrete topics, are kept verbatim. The result holds no duplicates
	/// and keeps first-seen order.
	pub fn get_optimized_subscriptions<I>(&mut self, topics: I) -> Vec<ArcStr>
	where
		I: IntoIterator,
		I::Item: AsRef<str>,
	{
		if self.hierarchy_stale {
			self.rebuild_hierarchy();
		}

		let mut seen = HashSet::new();
		let mut optimized = Vec::new();
		let mut requested = 0usize;
		for topic in topics {
			let topic = topic.as_ref();
			requested += 1;
			let covering = if validation::is_concrete_topic(topic) {
				self.most_specific_pattern(topic)
			} else {
				None
			};
			let chosen = covering.unwrap_or_else(|| ArcStr::from(topic));
			if seen.insert(chosen.clone()) {
				optimized.push(chosen);
			}
		}
		debug!(
			topics = requested,
			subscriptions = optimized.len(),
			"Optimized subscription set"
		);
		optimized
	}

	fn most_specific_pattern(&self, topic: &str) -> Option<ArcStr> {
		self.hierarchy
			.candidates(topic)
			.iter()
			.filter_map(|candidate| self.pattern_index.get(candidate))
			.filter(|pattern| pattern.matches(topic))
			.min_by(|a, b| {
				let literals_a = a.len() - a.wildcard_count();
				let literals_b = b.len() - b.wildcard_count();
				a.wildcard_count()
					.cmp(&b.wildcard_count())
					.then_with(|| literals_b.cmp(&literals_a))
					.then_with(|| b.priority().cmp(&a.priority()))
					.then_with(|| a.pattern().cmp(b.pattern()))
			})
			.map(|pattern| pattern.pattern().clone())
	}

	fn rebuild_hierarchy(&mut self) {
		self.hierarchy.clear();
		for pattern in &self.patterns {
			self.hierarchy.insert(pattern);
		}
		self.hierarchy_stale = false;
		debug!(buckets = self.hierarchy.len(), "Hierarchy index rebuilt");
	}

	/// Snapshot of counters and cache sizes.
	pub fn get_metrics(&self) -> RouterMetrics {
		let counters = &self.counters;
		let average_routing_time_us = if counters.messages_routed == 0 {
			0.0
		} else {
			counters.total_routing_time.as_secs_f64() * 1e6
				/ counters.messages_routed as f64
		};
		RouterMetrics {
			pattern_count: self.patterns.len(),
			subscription_count: self.subscriptions.len(),
			pattern_matches: counters.pattern_matches,
			cache_hits: counters.cache_hits,
			cache_misses: counters.cache_misses,
			cache_hit_rate: counters.cache_hit_rate(),
			pattern_match_cache_size: self.match_cache.len(),
			pattern_match_cache_capacity: self.match_cache.cap().get(),
			hierarchy_cache_size: self.hierarchy.len(),
			total_match_time_us: counters.total_match_time.as_micros() as u64,
			total_routing_time_us: counters.total_routing_time.as_micros() as u64,
			average_routing_time_us,
			messages_routed: counters.messages_routed,
			routes_produced: counters.routes_produced,
			subscriptions_created: counters.subscriptions_created,
			subscriptions_removed: counters.subscriptions_removed,
			performance_samples: self.history.len(),
		}
	}

	/// Trend and tuning recommendations from the performance history.
	pub fn get_performance_analysis(&self) -> PerformanceAnalysis {
		let hit_rate = self.counters.cache_hit_rate();
		let average_us = self.history.average_us();
		let mut recommendations = Vec::new();

		let lookups = self.counters.cache_hits + self.counters.cache_misses;
		if lookups > 0 && hit_rate < self.settings.min_cache_hit_rate {
			recommendations.push(Recommendation::CacheTooSmall {
				hit_rate,
				capacity: self.match_cache.cap().get(),
			});
		}

		let complex: Vec<String> = self
			.patterns
			.iter()
			.filter(|p| p.wildcard_count() > self.settings.max_pattern_wildcards)
			.map(|p| p.pattern().to_string())
			.collect();
		if !complex.is_empty() {
			recommendations.push(Recommendation::ComplexPatterns { patterns: complex });
		}

		// Priority order keeps the report stable across calls
		for pattern in &self.patterns {
			let subscriptions = self
				.pattern_subscriptions
				.get(pattern.pattern())
				.map_or(0, Vec::len);
			if subscriptions > self.settings.max_subscriptions_per_pattern {
				recommendations.push(Recommendation::TooManySubscriptions {
					pattern: pattern.pattern().to_string(),
					subscriptions,
				});
			}
		}

		let threshold_us = self.settings.slow_processing_threshold_us;
		if !self.history.is_empty() && average_us > threshold_us as f64 {
			recommendations.push(Recommendation::SlowProcessing {
				average_us,
				threshold_us,
			});
		}

		PerformanceAnalysis {
			sample_count: self.history.len(),
			average_processing_time_us: average_us,
			min_processing_time: self.history.min(),
			max_processing_time: self.history.max(),
			trend: self.history.trend(),
			cache_hit_rate: hit_rate,
			recommendations,
		}
	}

	/// Threshold-driven maintenance of caches and ordering.
	pub fn optimize_performance(&mut self) -> OptimizationReport {
		let mut report = OptimizationReport::default();

		let cached = self.match_cache.len();
		let capacity = self.match_cache.cap().get();
		if cached > 0 && cached as f64 >= capacity as f64 * self.settings.cache_clear_ratio {
			self.match_cache.clear();
			report
				.actions
				.push(OptimizationAction::MatchCacheCleared { entries: cached });
		}

		self.sort_patterns();
		report.actions.push(OptimizationAction::PatternsResorted {
			patterns: self.patterns.len(),
		});

		let buckets = self.hierarchy.len();
		if buckets > self.settings.hierarchy_cache_limit {
			self.hierarchy.clear();
			self.hierarchy_stale = true;
			report
				.actions
				.push(OptimizationAction::HierarchyCacheCleared { buckets });
		}

		debug!(actions = ?report.actions, "Performance optimization finished");
		report
	}

	/// Resets counters and the performance history.
	pub fn clear_metrics(&mut self) {
		self.counters = RouterCounters::default();
		self.history.clear();
	}

	fn sort_patterns(&mut self) {
		self.patterns
			.sort_by(|a, b| b.priority().cmp(&a.priority()));
	}

	fn invalidate_match_cache(&mut self) {
		if !self.match_cache.is_empty() {
			trace!(entries = self.match_cache.len(), "Match cache invalidated");
			self.match_cache.clear();
		}
	}
}
