//! # Router Actor - MQTT Pattern Router
//!
//! Shares one router between the MQTT event loop and application tasks:
//! - subscriptions registered through a cloneable `PatternRouterHandle`
//! - broker subscriptions collapsed onto the registered patterns
//! - inbound publishes routed by the actor and dispatched on the event loop task
//! - periodic self-optimization
//!
//! Needs a broker; `MQTT_HOST` / `MQTT_PORT` default to `localhost:1883`.

mod shared;

use std::time::Duration;

use mqtt_pattern_router::prelude::*;
use mqtt_pattern_router::{ActorSettings, PatternRouterActor};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	shared::tracing::setup(None);

	// === 1. ROUTER ACTOR ===
	let manager = TopicPatternManager::with_settings(RouterSettings::from_env()?)?;
	let (controller, router) = PatternRouterActor::spawn(manager, ActorSettings {
		optimize_interval: Some(Duration::from_secs(30)),
		..ActorSettings::default()
	});

	router
		.add_pattern(TopicPattern::new("demo/+/temperature")?.with_priority(10))
		.await?;
	router
		.subscribe(
			"demo/+/temperature",
			Some(Callback::sync(|msg| {
				println!("temperature {} = {}", msg.topic, msg.payload);
				Ok(())
			})),
			QoS::AtLeastOnce,
			None,
		)
		.await?;
	router
		.subscribe(
			"demo/#",
			Some(Callback::sync(|msg| {
				println!("audit       {} ({} bytes)", msg.topic, msg.payload.len());
				Ok(())
			})),
			QoS::AtMostOnce,
			None,
		)
		.await?;

	// === 2. BROKER CONNECTION ===
	let host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".into());
	let port = std::env::var("MQTT_PORT")
		.ok()
		.and_then(|p| p.parse().ok())
		.unwrap_or(1883);
	let mut options = MqttOptions::new("pattern-router-demo", host, port);
	options.set_keep_alive(Duration::from_secs(30));
	let (client, mut event_loop) = AsyncClient::new(options, 100);

	// Collapse what we care about into the patterns that cover it
	let wanted = router
		.optimized_subscriptions(["demo/kitchen/temperature", "demo/garage/door"])
		.await?;
	for filter in &wanted {
		println!("subscribing to {filter}");
		client.subscribe(filter.as_str(), QoS::AtLeastOnce).await?;
	}

	let publisher = client.clone();
	tokio::spawn(async move {
		for (topic, payload) in [
			("demo/kitchen/temperature", "21.5"),
			("demo/garage/door", "open"),
			("demo/garage/temperature", "12.0"),
		] {
			if let Err(err) = publisher
				.publish(topic, QoS::AtLeastOnce, false, payload)
				.await
			{
				eprintln!("publish failed: {err}");
			}
			tokio::time::sleep(Duration::from_millis(200)).await;
		}
	});

	// === 3. EVENT LOOP ===
	let deadline = tokio::time::sleep(Duration::from_secs(3));
	tokio::pin!(deadline);
	loop {
		tokio::select! {
			_ = &mut deadline => break,
			event = event_loop.poll() => match event {
				Ok(Event::Incoming(Packet::Publish(publish))) => {
					let message = MessageContext::from_publish(&publish);
					let report = router
						.publish(&message.topic, &message.payload, message.metadata.clone())
						.await?;
					if !report.is_success() {
						eprintln!("{} callbacks failed", report.failed.len());
					}
				}
				Ok(_) => {}
				Err(err) => {
					eprintln!("connection error: {err}");
					break;
				}
			},
		}
	}

	// === 4. SHUTDOWN ===
	println!("{}", serde_json::to_string_pretty(&router.metrics().await?)?);
	client.disconnect().await.ok();
	let manager = controller.shutdown().await?;
	println!(
		"router stopped with {} patterns and {} subscriptions",
		manager.pattern_count(),
		manager.subscription_count()
	);
	Ok(())
}
