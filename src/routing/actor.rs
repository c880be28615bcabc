#![allow(missing_docs)]
use std::sync::Arc;

use arcstr::ArcStr;
use rumqttc::QoS;
use tokio::{
	sync::{
		mpsc::{Receiver, Sender, channel},
		oneshot,
	},
	task::{JoinError, JoinHandle},
	time::{Instant, Interval, MissedTickBehavior, interval_at},
};
use tracing::{debug, info, warn};

use super::dispatch::{DispatchReport, dispatch_routes};
use super::error::{RegistryError, RouterError};
use super::metrics::{OptimizationReport, PerformanceAnalysis, RouterMetrics};
use super::pattern_manager::TopicPatternManager;
use super::subscription::{
	Callback, MessageContext, MessageMetadata, Route, SubscriptionId,
};
use crate::config::ActorSettings;
use crate::topic::{FilterMap, TopicPattern, TopicPatternError};

type Reply<T> = oneshot::Sender<T>;

enum Command {
	AddPattern(TopicPattern, Reply<Result<(), RegistryError>>),
	RemovePattern(String, Reply<Result<(), RegistryError>>),
	SetPriority(String, i32, Reply<Result<(), RegistryError>>),
	SetEnabled(String, bool, Reply<Result<(), RegistryError>>),
	Subscribe {
		pattern: String,
		callback: Option<Callback>,
		qos: QoS,
		filters: Option<FilterMap>,
		reply: Reply<Result<SubscriptionId, TopicPatternError>>,
	},
	Unsubscribe(SubscriptionId, Reply<Result<(), RegistryError>>),
	FindMatching(String, Reply<Vec<Arc<TopicPattern>>>),
	Route {
		topic: String,
		payload: String,
		metadata: MessageMetadata,
		reply: Reply<Vec<Route>>,
	},
	OptimizedSubscriptions(Vec<String>, Reply<Vec<ArcStr>>),
	Metrics(Reply<RouterMetrics>),
	PerformanceAnalysis(Reply<PerformanceAnalysis>),
	Optimize(Reply<OptimizationReport>),
	ClearMetrics(Reply<()>),
}

/// Owns a [`TopicPatternManager`] and serializes every operation on it.
pub struct PatternRouterActor {
	manager: TopicPatternManager,
	command_rx: Receiver<Command>,
	shutdown_rx: oneshot::Receiver<()>,
	optimize_ticker: Option<Interval>,
}

impl PatternRouterActor {
	pub fn spawn(
		manager: TopicPatternManager,
		settings: ActorSettings,
	) -> (PatternRouterController, PatternRouterHandle) {
		let (command_tx, command_rx) =
			channel(settings.command_channel_capacity.max(1));
		let (shutdown_tx, shutdown_rx) = oneshot::channel();
		let optimize_ticker = settings
			.optimize_interval
			.filter(|period| !period.is_zero())
			.map(|period| {
				let mut ticker = interval_at(Instant::now() + period, period);
				ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
				ticker
			});
		let actor = Self {
			manager,
			command_rx,
			shutdown_rx,
			optimize_ticker,
		};
		let join_handler = tokio::spawn(async move { actor.run().await });

		let controller = PatternRouterController {
			shutdown_tx,
			join_handler,
		};
		let handle = PatternRouterHandle { command_tx };

		(controller, handle)
	}

	async fn run(mut self) -> TopicPatternManager {
		loop {
			tokio::select! {
				_ = &mut self.shutdown_rx => {
					info!("PatternRouterActor: Shutdown signal received");
					break;
				}
				_ = next_tick(&mut self.optimize_ticker) => {
					let report = self.manager.optimize_performance();
					debug!(actions = ?report.actions, "Periodic optimization ran");
				}
				cmd = self.command_rx.recv() => {
					let Some(cmd) = cmd else {
						info!("PatternRouterActor: Command channel closed, exiting");
						break;
					};
					self.handle_command(cmd);
				}
			}
		}
		info!(
			patterns = self.manager.pattern_count(),
			subscriptions = self.manager.subscription_count(),
			"PatternRouterActor: Exiting run loop"
		);
		self.manager
	}

	fn handle_command(&mut self, cmd: Command) {
		let manager = &mut self.manager;
		match cmd {
			| Command::AddPattern(pattern, reply) => {
				respond(reply, manager.add_pattern(pattern), "add_pattern")
			}
			| Command::RemovePattern(pattern, reply) => {
				respond(reply, manager.remove_pattern(&pattern), "remove_pattern")
			}
			| Command::SetPriority(pattern, priority, reply) => respond(
				reply,
				manager.set_pattern_priority(&pattern, priority),
				"set_pattern_priority",
			),
			| Command::SetEnabled(pattern, enabled, reply) => respond(
				reply,
				manager.set_pattern_enabled(&pattern, enabled),
				"set_pattern_enabled",
			),
			| Command::Subscribe {
				pattern,
				callback,
				qos,
				filters,
				reply,
			} => {
				let created_pattern = manager.pattern(&pattern).is_none();
				let result =
					manager.subscribe_to_pattern(&pattern, callback, qos, filters);
				if let (Ok(id), true) = (&result, reply.is_closed()) {
					// Nobody will learn the id, so nobody could unsubscribe it.
					// A pattern registered before this request stays.
					warn!(subscription_id = %id, "Subscriber gone, rolling back subscription");
					let _ = manager.rollback_subscription(id, created_pattern);
					return;
				}
				respond(reply, result, "subscribe")
			}
			| Command::Unsubscribe(id, reply) => {
				respond(reply, manager.unsubscribe_from_pattern(&id), "unsubscribe")
			}
			| Command::FindMatching(topic, reply) => respond(
				reply,
				manager.find_matching_patterns(&topic),
				"find_matching_patterns",
			),
			| Command::Route {
				topic,
				payload,
				metadata,
				reply,
			} => respond(
				reply,
				manager.route_message(&topic, &payload, &metadata),
				"route_message",
			),
			| Command::OptimizedSubscriptions(topics, reply) => respond(
				reply,
				manager.get_optimized_subscriptions(&topics),
				"optimized_subscriptions",
			),
			| Command::Metrics(reply) => {
				respond(reply, manager.get_metrics(), "metrics")
			}
			| Command::PerformanceAnalysis(reply) => respond(
				reply,
				manager.get_performance_analysis(),
				"performance_analysis",
			),
			| Command::Optimize(reply) => respond(
				reply,
				manager.optimize_performance(),
				"optimize_performance",
			),
			| Command::ClearMetrics(reply) => {
				manager.clear_metrics();
				respond(reply, (), "clear_metrics")
			}
		}
	}
}

async fn next_tick(ticker: &mut Option<Interval>) {
	match ticker {
		| Some(ticker) => {
			ticker.tick().await;
		}
		| None => std::future::pending::<()>().await,
	}
}

fn respond<T>(reply: Reply<T>, value: T, command: &'static str) {
	if reply.send(value).is_err() {
		warn!(command, "Could not send router response (receiver dropped)");
	}
}

pub struct PatternRouterController {
	shutdown_tx: oneshot::Sender<()>,
	join_handler: JoinHandle<TopicPatternManager>,
}

impl PatternRouterController {
	/// Stops the actor and returns the manager it owned.
	pub async fn shutdown(self) -> Result<TopicPatternManager, JoinError> {
		let _ = self.shutdown_tx.send(()).inspect_err(|_| {
			warn!("PatternRouterController: Shutdown signal already sent");
		});
		self.join_handler.await.inspect_err(|e| {
			warn!(error = ?e, "PatternRouterController: Actor run failed");
		})
	}
}

/// Cloneable handle to a running [`PatternRouterActor`].
#[derive(Clone)]
pub struct PatternRouterHandle {
	command_tx: Sender<Command>,
}

impl PatternRouterHandle {
	async fn request<T>(
		&self,
		build: impl FnOnce(Reply<T>) -> Command,
	) -> Result<T, RouterError> {
		let (tx, rx) = oneshot::channel();
		self.command_tx
			.send(build(tx))
			.await
			.map_err(|_| RouterError::ChannelClosed)?;
		rx.await.map_err(|_| RouterError::ResponseLost)
	}

	pub async fn add_pattern(&self, pattern: TopicPattern) -> Result<(), RouterError> {
		Ok(self
			.request(|reply| Command::AddPattern(pattern, reply))
			.await??)
	}

	pub async fn remove_pattern(&self, pattern: &str) -> Result<(), RouterError> {
		let pattern = pattern.to_string();
		Ok(self
			.request(|reply| Command::RemovePattern(pattern, reply))
			.await??)
	}

	pub async fn set_pattern_priority(
		&self,
		pattern: &str,
		priority: i32,
	) -> Result<(), RouterError> {
		let pattern = pattern.to_string();
		Ok(self
			.request(|reply| Command::SetPriority(pattern, priority, reply))
			.await??)
	}

	pub async fn set_pattern_enabled(
		&self,
		pattern: &str,
		enabled: bool,
	) -> Result<(), RouterError> {
		let pattern = pattern.to_string();
		Ok(self
			.request(|reply| Command::SetEnabled(pattern, enabled, reply))
			.await??)
	}

	pub async fn subscribe(
		&self,
		pattern: &str,
		callback: Option<Callback>,
		qos: QoS,
		filters: Option<FilterMap>,
	) -> Result<SubscriptionId, RouterError> {
		let pattern = pattern.to_string();
		Ok(self
			.request(|reply| Command::Subscribe {
				pattern,
				callback,
				qos,
				filters,
				reply,
			})
			.await??)
	}

	pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), RouterError> {
		Ok(self
			.request(|reply| Command::Unsubscribe(id, reply))
			.await??)
	}

	pub async fn find_matching_patterns(
		&self,
		topic: &str,
	) -> Result<Vec<Arc<TopicPattern>>, RouterError> {
		let topic = topic.to_string();
		self.request(|reply| Command::FindMatching(topic, reply))
			.await
	}

	pub async fn route_message(
		&self,
		topic: &str,
		payload: &str,
		metadata: MessageMetadata,
	) -> Result<Vec<Route>, RouterError> {
		let topic = topic.to_string();
		let payload = payload.to_string();
		self.request(|reply| Command::Route {
			topic,
			payload,
			metadata,
			reply,
		})
		.await
	}

	/// Routes a message through the actor and runs the callbacks on the
	/// calling task, so slow subscribers never stall the actor loop.
	pub async fn publish(
		&self,
		topic: &str,
		payload: &str,
		metadata: MessageMetadata,
	) -> Result<DispatchReport, RouterError> {
		let routes = self.route_message(topic, payload, metadata.clone()).await?;
		let message = MessageContext::new(topic, payload, metadata);
		Ok(dispatch_routes(&routes, &message).await)
	}

	pub async fn optimized_subscriptions<I>(
		&self,
		topics: I,
	) -> Result<Vec<ArcStr>, RouterError>
	where
		I: IntoIterator,
		I::Item: Into<String>,
	{
		let topics = topics.into_iter().map(Into::into).collect();
		self.request(|reply| Command::OptimizedSubscriptions(topics, reply))
			.await
	}

	pub async fn metrics(&self) -> Result<RouterMetrics, RouterError> {
		self.request(Command::Metrics).await
	}

	pub async fn performance_analysis(
		&self,
	) -> Result<PerformanceAnalysis, RouterError> {
		self.request(Command::PerformanceAnalysis).await
	}

	pub async fn optimize_performance(
		&self,
	) -> Result<OptimizationReport, RouterError> {
		self.request(Command::Optimize).await
	}

	pub async fn clear_metrics(&self) -> Result<(), RouterError> {
		self.request(Command::ClearMetrics).await
	}
}
