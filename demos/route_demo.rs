//! # Route Demo - MQTT Pattern Router
//!
//! Drives a `TopicPatternManager` directly with a handful of Home Assistant
//! style topics:
//! - priority ordering of overlapping patterns
//! - per-subscription filters
//! - callback dispatch with failure isolation
//! - subscription optimization and telemetry
//!
//! Run with `RUST_LOG=mqtt_pattern_router=debug` to see the router's logs.

mod shared;

use std::collections::BTreeMap;

use mqtt_pattern_router::prelude::*;
use mqtt_pattern_router::routing::CallbackResult;
use serde_json::json;

/// Fails for non-numeric payloads, which `dispatch_routes` reports
async fn print_numeric(msg: MessageContext) -> CallbackResult {
	let value: f64 = msg.payload.parse()?;
	println!("  numeric    -> {} = {value:.1}", msg.topic);
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	shared::tracing::setup(None);

	// === 1. ROUTER ===
	// MQTT_ROUTER_* variables (or demos/.env) override the defaults
	let mut router = TopicPatternManager::with_settings(RouterSettings::from_env()?)?;

	router.add_pattern(
		TopicPattern::new("homeassistant/+/+/state")?
			.with_description("Any entity state")
			.with_priority(1),
	)?;
	router.add_pattern(
		TopicPattern::new("homeassistant/sensor/+/state")?
			.with_description("Sensor states")
			.with_priority(5),
	)?;

	let topic = "homeassistant/sensor/temperature/state";
	println!("Patterns matching {topic}:");
	for pattern in router.find_matching_patterns(topic) {
		println!(
			"  [{}] {} ({})",
			pattern.priority(),
			pattern,
			pattern.description()
		);
	}

	// === 2. SUBSCRIPTIONS ===
	let temperature_only =
		BTreeMap::from([("topic_regex".to_string(), json!(".*temperature.*"))]);
	router.subscribe_to_pattern(
		"homeassistant/sensor/+/state",
		Some(Callback::sync(|msg| {
			println!("  temperature -> {} = {}", msg.topic, msg.payload);
			Ok(())
		})),
		QoS::AtLeastOnce,
		Some(temperature_only),
	)?;
	router.subscribe_to_pattern(
		"homeassistant/\\ha_domain/\\ha_entity/state",
		Some(Callback::asynchronous(print_numeric)),
		QoS::AtMostOnce,
		None,
	)?;

	// === 3. ROUTING ===
	let messages = [
		("homeassistant/sensor/temperature/state", "25.5"),
		("homeassistant/sensor/humidity/state", "60.0"),
		("homeassistant/light/porch/state", "on"),
	];
	for (topic, payload) in messages {
		println!("Routing {topic} ({payload}):");
		let metadata = MessageMetadata::default();
		let routes = router.route_message(topic, payload, &metadata);
		let report =
			dispatch_routes(&routes, &MessageContext::new(topic, payload, metadata))
				.await;
		for (id, reason) in &report.failed {
			println!("  {id} failed: {reason}");
		}
	}

	// === 4. OPTIMIZATION ===
	let wanted = [
		"homeassistant/sensor/kitchen/state",
		"homeassistant/sensor/garage/state",
		"zigbee2mqtt/bridge/state",
	];
	println!("Broker subscriptions for {wanted:?}:");
	for subscription in router.get_optimized_subscriptions(wanted) {
		println!("  {subscription}");
	}

	// === 5. TELEMETRY ===
	let metrics = router.get_metrics();
	println!("Metrics: {}", serde_json::to_string_pretty(&metrics)?);
	for recommendation in router.get_performance_analysis().recommendations {
		println!("Recommendation: {recommendation}");
	}

	Ok(())
}
