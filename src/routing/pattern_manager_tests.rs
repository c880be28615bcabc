use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use arcstr::ArcStr;
use rumqttc::QoS;
use serde_json::json;

use super::error::{RegistryError, RouterError};
use super::metrics::{OptimizationAction, Recommendation};
use super::pattern_manager::TopicPatternManager;
use super::subscription::{Callback, MessageMetadata, Route, SubscriptionId};
use crate::config::RouterSettings;
use crate::topic::{FilterMap, TopicPattern, TopicPatternError};

fn pattern(p: &str, priority: i32) -> TopicPattern {
	TopicPattern::new(p).unwrap().with_priority(priority)
}

fn noop() -> Callback {
	Callback::sync(|_| Ok(()))
}

fn matching(manager: &mut TopicPatternManager, topic: &str) -> Vec<String> {
	manager
		.find_matching_patterns(topic)
		.iter()
		.map(|p| p.pattern().to_string())
		.collect()
}

fn small_cache(capacity: usize) -> TopicPatternManager {
	TopicPatternManager::with_settings(RouterSettings {
		match_cache_capacity: capacity,
		..RouterSettings::default()
	})
	.unwrap()
}

#[test]
fn test_add_pattern_orders_by_priority() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+/c", 1)).unwrap();
	manager.add_pattern(pattern("a/#", 10)).unwrap();
	manager.add_pattern(pattern("+/b/c", 5)).unwrap();

	assert_eq!(matching(&mut manager, "a/b/c"), ["a/#", "+/b/c", "a/+/c"]);
	let ordered: Vec<i32> = manager.patterns().iter().map(|p| p.priority()).collect();
	assert_eq!(ordered, [10, 5, 1]);
}

#[test]
fn test_equal_priorities_keep_insertion_order() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 3)).unwrap();
	manager.add_pattern(pattern("+/b", 3)).unwrap();
	manager.add_pattern(pattern("#", 3)).unwrap();

	assert_eq!(matching(&mut manager, "a/b"), ["a/+", "+/b", "#"]);
}

#[test]
fn test_duplicate_pattern_rejected() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 1)).unwrap();

	assert_eq!(
		manager.add_pattern(pattern("a/+", 9)),
		Err(RegistryError::duplicate_pattern("a/+"))
	);
	assert_eq!(manager.pattern_count(), 1);
	assert_eq!(manager.pattern("a/+").unwrap().priority(), 1);
}

#[test]
fn test_remove_pattern() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 1)).unwrap();

	assert_eq!(
		manager.remove_pattern("x/y"),
		Err(RegistryError::pattern_not_found("x/y"))
	);
	manager.remove_pattern("a/+").unwrap();
	assert_eq!(manager.pattern_count(), 0);
	assert!(manager.pattern("a/+").is_none());
	assert!(matching(&mut manager, "a/b").is_empty());
}

#[test]
fn test_remove_pattern_detaches_subscriptions() {
	let mut manager = TopicPatternManager::new();
	let id = manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();

	manager.remove_pattern("a/+").unwrap();

	assert!(manager.subscription(&id).is_none());
	assert_eq!(manager.subscription_count(), 0);
	assert!(manager.subscriptions_for_pattern("a/+").is_empty());
	assert_eq!(manager.get_metrics().subscriptions_removed, 1);
	assert_eq!(
		manager.unsubscribe_from_pattern(&id),
		Err(RegistryError::subscription_not_found(id))
	);
}

#[test]
fn test_subscribe_creates_pattern_once() {
	let mut manager = TopicPatternManager::new();
	let first = manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtLeastOnce, None)
		.unwrap();
	let second = manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtLeastOnce, None)
		.unwrap();

	assert_ne!(first, second);
	assert_eq!(manager.pattern_count(), 1);
	assert_eq!(manager.subscription_count(), 2);

	let created = manager.pattern("a/+").unwrap();
	assert_eq!(created.priority(), 1);
	assert!(created.is_enabled());

	let bound: Vec<_> = manager
		.subscriptions_for_pattern("a/+")
		.iter()
		.map(|s| s.id())
		.collect();
	assert_eq!(bound, [first, second]);
}

#[test]
fn test_subscribe_keeps_existing_pattern_metadata() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 7)).unwrap();
	manager
		.subscribe_to_pattern("a/+", None, QoS::AtMostOnce, None)
		.unwrap();

	assert_eq!(manager.pattern("a/+").unwrap().priority(), 7);
}

#[test]
fn test_subscribe_pattern_filters_become_metadata() {
	let mut manager = TopicPatternManager::new();
	let filters: FilterMap =
		BTreeMap::from([("topic_prefix".to_string(), json!("a/"))]);
	manager
		.subscribe_to_pattern("a/+", None, QoS::AtMostOnce, Some(filters.clone()))
		.unwrap();

	assert_eq!(manager.pattern("a/+").unwrap().filters(), &filters);
}

#[test]
fn test_subscribe_invalid_pattern() {
	let mut manager = TopicPatternManager::new();
	let err = manager
		.subscribe_to_pattern("a/#/b", Some(noop()), QoS::AtMostOnce, None)
		.unwrap_err();

	assert!(matches!(err, TopicPatternError::HashPosition { .. }));
	assert_eq!(manager.pattern_count(), 0);
	assert_eq!(manager.subscription_count(), 0);
}

#[test]
fn test_subscription_ids_are_unique_and_formatted() {
	let mut manager = TopicPatternManager::new();
	let ids: Vec<_> = (0 .. 5)
		.map(|_| {
			manager
				.subscribe_to_pattern("a", None, QoS::AtMostOnce, None)
				.unwrap()
		})
		.collect();

	for (i, id) in ids.iter().enumerate() {
		assert_eq!(id.sequence(), i as u64);
		assert!(id.to_string().starts_with(&format!("sub_{i}_")));
		assert_ne!(id.to_string(), "a");
	}
}

#[test]
fn test_last_unsubscribe_removes_pattern() {
	let mut manager = TopicPatternManager::new();
	let first = manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();
	let second = manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();

	manager.unsubscribe_from_pattern(&first).unwrap();
	assert_eq!(manager.pattern_count(), 1);
	assert_eq!(manager.subscription_count(), 1);

	manager.unsubscribe_from_pattern(&second).unwrap();
	assert_eq!(manager.pattern_count(), 0);
	assert_eq!(manager.subscription_count(), 0);
}

#[test]
fn test_rollback_keeps_pattern_added_beforehand() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 7)).unwrap();
	let id = manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();

	manager.rollback_subscription(&id, false).unwrap();
	assert_eq!(manager.subscription_count(), 0);
	assert_eq!(manager.pattern("a/+").map(|p| p.priority()), Some(7));
	assert!(manager.subscriptions_for_pattern("a/+").is_empty());
	assert_eq!(manager.get_metrics().subscriptions_removed, 1);

	// a pattern the subscription created goes away with it
	let id = manager
		.subscribe_to_pattern("b/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();
	manager.rollback_subscription(&id, true).unwrap();
	assert!(manager.pattern("b/+").is_none());
	assert_eq!(manager.pattern_count(), 1);

	assert!(matches!(
		manager.rollback_subscription(&id, true),
		Err(RegistryError::SubscriptionNotFound { .. })
	));
}

#[test]
fn test_match_cache_hits_and_invalidation() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 1)).unwrap();

	assert_eq!(matching(&mut manager, "a/b"), ["a/+"]);
	assert_eq!(matching(&mut manager, "a/b"), ["a/+"]);
	let metrics = manager.get_metrics();
	assert_eq!(metrics.cache_misses, 1);
	assert_eq!(metrics.cache_hits, 1);
	assert_eq!(metrics.pattern_match_cache_size, 1);

	// cached topic reflects additions and removals
	manager.add_pattern(pattern("a/b", 5)).unwrap();
	assert_eq!(matching(&mut manager, "a/b"), ["a/b", "a/+"]);
	manager.remove_pattern("a/+").unwrap();
	assert_eq!(matching(&mut manager, "a/b"), ["a/b"]);
	assert_eq!(manager.get_metrics().cache_misses, 3);
}

#[test]
fn test_priority_change_reorders_cached_topic() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 1)).unwrap();
	manager.add_pattern(pattern("+/b", 2)).unwrap();
	assert_eq!(matching(&mut manager, "a/b"), ["+/b", "a/+"]);

	manager.set_pattern_priority("a/+", 3).unwrap();
	assert_eq!(matching(&mut manager, "a/b"), ["a/+", "+/b"]);
	assert_eq!(
		manager.set_pattern_priority("nope", 1),
		Err(RegistryError::pattern_not_found("nope"))
	);
}

#[test]
fn test_disabled_patterns_do_not_match() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 1)).unwrap();
	assert_eq!(matching(&mut manager, "a/b"), ["a/+"]);

	manager.set_pattern_enabled("a/+", false).unwrap();
	assert!(matching(&mut manager, "a/b").is_empty());

	manager.set_pattern_enabled("a/+", true).unwrap();
	assert_eq!(matching(&mut manager, "a/b"), ["a/+"]);
}

#[test]
fn test_match_cache_bounded() {
	let mut manager = small_cache(3);
	manager.add_pattern(pattern("t/+", 1)).unwrap();

	for i in 0 .. 10 {
		matching(&mut manager, &format!("t/{i}"));
		assert!(manager.get_metrics().pattern_match_cache_size <= 3);
	}

	// t/0 was evicted first, t/9 is still cached
	let misses = manager.get_metrics().cache_misses;
	matching(&mut manager, "t/9");
	assert_eq!(manager.get_metrics().cache_misses, misses);
	matching(&mut manager, "t/0");
	assert_eq!(manager.get_metrics().cache_misses, misses + 1);
}

#[test]
fn test_match_cache_evicts_oldest_despite_hits() {
	let mut manager = small_cache(2);
	manager.add_pattern(pattern("t/+", 1)).unwrap();

	matching(&mut manager, "t/first");
	matching(&mut manager, "t/second");
	// a hit does not make t/first younger than t/second
	matching(&mut manager, "t/first");
	assert_eq!(manager.get_metrics().cache_hits, 1);

	matching(&mut manager, "t/third");
	let misses = manager.get_metrics().cache_misses;
	matching(&mut manager, "t/second");
	assert_eq!(manager.get_metrics().cache_misses, misses);
	matching(&mut manager, "t/first");
	assert_eq!(manager.get_metrics().cache_misses, misses + 1);
}

#[test]
fn test_route_message_order() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 1)).unwrap();
	manager.add_pattern(pattern("a/#", 5)).unwrap();

	let low_1 = manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();
	let high = manager
		.subscribe_to_pattern("a/#", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();
	let low_2 = manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();

	let routes = manager.route_message("a/b", "x", &MessageMetadata::default());
	let ids: Vec<_> = routes.iter().map(|r| r.subscription_id).collect();
	assert_eq!(ids, [high, low_1, low_2]);
}

#[test]
fn test_route_message_is_idempotent() {
	let mut manager = TopicPatternManager::new();
	manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();
	manager
		.subscribe_to_pattern("#", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();

	let first = manager.route_message("a/b", "p", &MessageMetadata::default());
	let second = manager.route_message("a/b", "p", &MessageMetadata::default());
	assert_eq!(first.len(), 2);
	assert_eq!(first, second);
}

#[test]
fn test_route_without_callback_records_message_only() {
	let mut manager = TopicPatternManager::new();
	let id = manager
		.subscribe_to_pattern("a/+", None, QoS::AtMostOnce, None)
		.unwrap();
	let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

	let routes = manager.route_message("a/b", "x", &MessageMetadata::at(at));

	assert!(routes.is_empty());
	let subscription = manager.subscription(&id).unwrap();
	assert_eq!(subscription.message_count(), 1);
	assert_eq!(subscription.last_message_time(), Some(at));
}

#[test]
fn test_route_applies_filters() {
	let mut manager = TopicPatternManager::new();
	let filters: FilterMap =
		BTreeMap::from([("payload_regex".to_string(), json!("^on$"))]);
	let filtered = manager
		.subscribe_to_pattern("light/+", Some(noop()), QoS::AtMostOnce, Some(filters))
		.unwrap();
	let plain = manager
		.subscribe_to_pattern("light/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();

	let on = manager.route_message("light/porch", "on", &MessageMetadata::default());
	let off = manager.route_message("light/porch", "off", &MessageMetadata::default());

	let ids = |routes: Vec<Route>| -> Vec<SubscriptionId> {
		routes.iter().map(|r| r.subscription_id).collect()
	};
	assert_eq!(ids(on), [filtered, plain]);
	assert_eq!(ids(off), [plain]);
	assert_eq!(manager.subscription(&filtered).unwrap().message_count(), 1);
	assert_eq!(manager.subscription(&plain).unwrap().message_count(), 2);
}

#[test]
fn test_route_unknown_filter_key_never_routes() {
	let mut manager = TopicPatternManager::new();
	let filters: FilterMap = BTreeMap::from([("mystery".to_string(), json!(1))]);
	manager
		.subscribe_to_pattern("#", Some(noop()), QoS::AtMostOnce, Some(filters))
		.unwrap();

	for (topic, payload) in [("a", ""), ("a/b/c", "payload"), ("mystery", "1")] {
		assert!(
			manager
				.route_message(topic, payload, &MessageMetadata::default())
				.is_empty()
		);
	}
}

#[test]
fn test_subscription_qos_by_pattern() {
	let mut manager = TopicPatternManager::new();
	manager
		.subscribe_to_pattern("a/+", None, QoS::AtMostOnce, None)
		.unwrap();
	manager
		.subscribe_to_pattern("a/+", None, QoS::ExactlyOnce, None)
		.unwrap();
	manager
		.subscribe_to_pattern("b/#", None, QoS::AtLeastOnce, None)
		.unwrap();
	manager.add_pattern(pattern("c", 1)).unwrap();

	let qos = manager.subscription_qos_by_pattern();
	assert_eq!(qos.len(), 2);
	assert_eq!(qos[&ArcStr::from("a/+")], QoS::ExactlyOnce);
	assert_eq!(qos[&ArcStr::from("b/#")], QoS::AtLeastOnce);
}

#[test]
fn test_optimized_subscriptions() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+/+", 1)).unwrap();

	assert_eq!(manager.get_optimized_subscriptions(["a/b/c", "a/b/d"]), [
		ArcStr::from("a/+/+")
	]);
}

#[test]
fn test_optimized_subscriptions_prefers_specific_pattern() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("#", 100)).unwrap();
	manager.add_pattern(pattern("a/+/+", 1)).unwrap();
	manager.add_pattern(pattern("a/b/+", 1)).unwrap();

	// "#" has a single wildcard, so it beats "a/+/+" but loses to "a/b/+"
	let optimized = manager.get_optimized_subscriptions(["a/b/c", "a/x/y", "z"]);
	assert_eq!(optimized, ["a/b/+", "#"]);
}

#[test]
fn test_optimized_subscriptions_ties_break_on_priority() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 1)).unwrap();
	manager.add_pattern(pattern("+/b", 2)).unwrap();

	assert_eq!(manager.get_optimized_subscriptions(["a/b"]), ["+/b"]);
}

#[test]
fn test_optimized_subscriptions_keeps_uncovered_topics() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("a/+", 1)).unwrap();

	let optimized = manager.get_optimized_subscriptions(vec![
		"x/y".to_string(),
		"a/1".to_string(),
		"x/y".to_string(),
		"a/2".to_string(),
		"q/+".to_string(),
	]);
	assert_eq!(optimized, ["x/y", "a/+", "q/+"]);
}

#[test]
fn test_optimized_subscriptions_fold_case_like_matching() {
	let mut manager = TopicPatternManager::new();
	manager.add_pattern(pattern("ΟΔΟΣ/+", 1)).unwrap();
	manager.add_pattern(pattern("#", 1)).unwrap();

	assert_eq!(matching(&mut manager, "οδοσ/x"), ["ΟΔΟΣ/+", "#"]);
	let optimized = manager.get_optimized_subscriptions(["οδοσ/x", "οδος/y"]);
	assert_eq!(optimized, [ArcStr::from("ΟΔΟΣ/+")]);
}

#[test]
fn test_optimized_subscriptions_after_hierarchy_cleared() {
	let mut manager = TopicPatternManager::with_settings(RouterSettings {
		hierarchy_cache_limit: 1,
		..RouterSettings::default()
	})
	.unwrap();
	manager.add_pattern(pattern("a/+/+", 1)).unwrap();

	let report = manager.optimize_performance();
	assert!(report.contains(|a| matches!(a, OptimizationAction::HierarchyCacheCleared { .. })));
	assert_eq!(manager.get_metrics().hierarchy_cache_size, 0);

	assert_eq!(manager.get_optimized_subscriptions(["a/b/c"]), ["a/+/+"]);
	assert_eq!(manager.get_metrics().hierarchy_cache_size, 3);
}

#[test]
fn test_metrics_counters() {
	let mut manager = TopicPatternManager::new();
	let id = manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();
	manager.route_message("a/b", "1", &MessageMetadata::default());
	manager.route_message("a/b", "2", &MessageMetadata::default());
	manager.route_message("z", "3", &MessageMetadata::default());
	manager.unsubscribe_from_pattern(&id).unwrap();

	let metrics = manager.get_metrics();
	assert_eq!(metrics.messages_routed, 3);
	assert_eq!(metrics.routes_produced, 2);
	assert_eq!(metrics.pattern_matches, 1);
	assert_eq!(metrics.cache_hits, 1);
	assert_eq!(metrics.cache_misses, 2);
	assert!((metrics.cache_hit_rate - 1.0 / 3.0).abs() < 1e-9);
	assert_eq!(metrics.subscriptions_created, 1);
	assert_eq!(metrics.subscriptions_removed, 1);
	assert_eq!(metrics.performance_samples, 3);
	assert_eq!(metrics.pattern_count, 0);
	assert_eq!(metrics.pattern_match_cache_capacity, 1000);
}

#[test]
fn test_clear_metrics() {
	let mut manager = TopicPatternManager::new();
	manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();
	manager.route_message("a/b", "1", &MessageMetadata::default());

	manager.clear_metrics();

	let metrics = manager.get_metrics();
	assert_eq!(metrics.messages_routed, 0);
	assert_eq!(metrics.cache_misses, 0);
	assert_eq!(metrics.performance_samples, 0);
	assert_eq!(metrics.subscription_count, 1);
	assert_eq!(manager.get_performance_analysis().sample_count, 0);
}

#[test]
fn test_performance_history_is_bounded() {
	let mut manager = TopicPatternManager::with_settings(RouterSettings {
		history_capacity: 4,
		..RouterSettings::default()
	})
	.unwrap();
	for i in 0 .. 10 {
		manager.route_message(&format!("t/{i}"), "", &MessageMetadata::default());
	}

	let analysis = manager.get_performance_analysis();
	assert_eq!(analysis.sample_count, 4);
	assert!(analysis.trend.is_some());
	assert!(analysis.min_processing_time <= analysis.max_processing_time);
}

#[test]
fn test_analysis_recommendations() {
	let mut manager = TopicPatternManager::with_settings(RouterSettings {
		max_pattern_wildcards: 1,
		max_subscriptions_per_pattern: 1,
		min_cache_hit_rate: 0.9,
		..RouterSettings::default()
	})
	.unwrap();
	manager.add_pattern(pattern("+/+/#", 1)).unwrap();
	manager
		.subscribe_to_pattern("a", None, QoS::AtMostOnce, None)
		.unwrap();
	manager
		.subscribe_to_pattern("a", None, QoS::AtMostOnce, None)
		.unwrap();
	manager.find_matching_patterns("x/y/z");

	let recommendations = manager.get_performance_analysis().recommendations;
	assert!(recommendations.contains(&Recommendation::ComplexPatterns {
		patterns: vec!["+/+/#".to_string()]
	}));
	assert!(recommendations.contains(&Recommendation::TooManySubscriptions {
		pattern: "a".to_string(),
		subscriptions: 2,
	}));
	assert!(
		recommendations
			.iter()
			.any(|r| matches!(r, Recommendation::CacheTooSmall { .. }))
	);
}

#[test]
fn test_analysis_without_data() {
	let manager = TopicPatternManager::new();
	let analysis = manager.get_performance_analysis();

	assert_eq!(analysis.sample_count, 0);
	assert_eq!(analysis.trend, None);
	assert_eq!(analysis.min_processing_time, None);
	assert!(analysis.recommendations.is_empty());
}

#[test]
fn test_optimize_clears_full_match_cache() {
	let mut manager = small_cache(2);
	manager.add_pattern(pattern("t/+", 1)).unwrap();
	matching(&mut manager, "t/1");

	let report = manager.optimize_performance();
	assert!(!report.contains(|a| matches!(a, OptimizationAction::MatchCacheCleared { .. })));
	assert!(report.contains(|a| matches!(a, OptimizationAction::PatternsResorted { patterns: 1 })));

	matching(&mut manager, "t/2");
	let report = manager.optimize_performance();
	assert!(report.contains(|a| *a == OptimizationAction::MatchCacheCleared { entries: 2 }));
	assert_eq!(manager.get_metrics().pattern_match_cache_size, 0);
}

#[test]
fn test_invalid_settings() {
	let settings = RouterSettings {
		match_cache_capacity: 0,
		..RouterSettings::default()
	};
	assert!(matches!(
		TopicPatternManager::with_settings(settings),
		Err(RouterError::InvalidSettings(_))
	));
}

#[test]
fn test_clear() {
	let mut manager = TopicPatternManager::new();
	manager
		.subscribe_to_pattern("a/+", Some(noop()), QoS::AtMostOnce, None)
		.unwrap();
	matching(&mut manager, "a/b");

	manager.clear();

	let metrics = manager.get_metrics();
	assert_eq!(metrics.pattern_count, 0);
	assert_eq!(metrics.subscription_count, 0);
	assert_eq!(metrics.pattern_match_cache_size, 0);
	assert_eq!(metrics.hierarchy_cache_size, 0);
	assert!(matching(&mut manager, "a/b").is_empty());
}

#[test]
fn test_settings_from_env() {
	std::env::set_var("MQTT_ROUTER_MATCH_CACHE_SIZE", " 64 ");
	std::env::set_var("MQTT_ROUTER_SLOW_THRESHOLD_US", "250");
	let settings = RouterSettings::from_env().unwrap();
	assert_eq!(settings.match_cache_capacity, 64);
	assert_eq!(settings.slow_processing_threshold(), Duration::from_micros(250));
	assert_eq!(settings.history_capacity, 100);

	std::env::set_var("MQTT_ROUTER_MATCH_CACHE_SIZE", "lots");
	assert!(matches!(
		RouterSettings::from_env(),
		Err(RouterError::InvalidSettings(_))
	));

	std::env::remove_var("MQTT_ROUTER_MATCH_CACHE_SIZE");
	std::env::remove_var("MQTT_ROUTER_SLOW_THRESHOLD_US");
	assert_eq!(RouterSettings::from_env().unwrap(), RouterSettings::default());
}
