//! Subscriptions, their identifiers and the callbacks they carry

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arcstr::ArcStr;
use futures::FutureExt;
use futures::future::BoxFuture;
use rumqttc::{Publish, QoS};

use super::filter::SubscriptionFilters;

/// A subscription identifier.
///
/// Composed of the manager's running sequence number and the creation time,
/// so an id is never reused within one manager and never equals a pattern
/// string.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, PartialOrd, Ord)]
pub struct SubscriptionId {
	sequence: u64,
	created_millis: u64,
}

impl SubscriptionId {
	pub(crate) fn new(sequence: u64, created_at: SystemTime) -> Self {
		let created_millis = created_at
			.duration_since(UNIX_EPOCH)
			.map(|since_epoch| since_epoch.as_millis() as u64)
			.unwrap_or_default();
		Self {
			sequence,
			created_millis,
		}
	}

	/// Position in the creating manager's sequence.
	pub fn sequence(&self) -> u64 {
		self.sequence
	}

	/// Creation time in milliseconds since the Unix epoch.
	pub fn created_millis(&self) -> u64 {
		self.created_millis
	}
}

impl Display for SubscriptionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "sub_{}_{}", self.sequence, self.created_millis)
	}
}

/// Per-message metadata supplied by the upstream client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageMetadata {
	/// Arrival time; routing uses the current time when absent
	pub timestamp: Option<SystemTime>,
	/// QoS the message was delivered with
	pub qos: Option<QoS>,
	/// Retain flag of the publish packet
	pub retain: bool,
	/// Free-form extra properties
	pub properties: BTreeMap<String, String>,
}

impl MessageMetadata {
	/// Metadata carrying only an arrival timestamp.
	pub fn at(timestamp: SystemTime) -> Self {
		Self {
			timestamp: Some(timestamp),
			..Self::default()
		}
	}
}

/// Message handed to subscriber callbacks.
#[derive(Debug, Clone)]
pub struct MessageContext {
	/// Concrete topic the message was published on
	pub topic: ArcStr,
	/// Message payload
	pub payload: ArcStr,
	/// Metadata supplied with the message
	pub metadata: MessageMetadata,
}

impl MessageContext {
	/// Creates a message context.
	pub fn new(
		topic: impl Into<ArcStr>,
		payload: impl Into<ArcStr>,
		metadata: MessageMetadata,
	) -> Self {
		Self {
			topic: topic.into(),
			payload: payload.into(),
			metadata,
		}
	}

	/// Builds a context from an inbound publish packet.
	///
	/// Payloads that are not valid UTF-8 are converted lossily. The arrival
	/// time is the moment of conversion.
	pub fn from_publish(publish: &Publish) -> Self {
		let metadata = MessageMetadata {
			timestamp: Some(SystemTime::now()),
			qos: Some(publish.qos),
			retain: publish.retain,
			properties: BTreeMap::new(),
		};
		Self::new(
			publish.topic.as_str(),
			&*String::from_utf8_lossy(&publish.payload),
			metadata,
		)
	}
}

/// Error returned by a subscriber callback
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;
/// Result returned by a subscriber callback
pub type CallbackResult = Result<(), CallbackError>;

type SyncHandler = dyn Fn(&MessageContext) -> CallbackResult + Send + Sync;
type AsyncHandler =
	dyn Fn(MessageContext) -> BoxFuture<'static, CallbackResult> + Send + Sync;

/// Subscriber callback, synchronous or asynchronous.
///
/// The variant is fixed when the callback is created, so dispatching is a
/// single match rather than a per-message capability check.
#[derive(Clone)]
pub enum Callback {
	/// Runs to completion on the dispatching task
	Sync(Arc<SyncHandler>),
	/// Returns a future that the dispatcher awaits
	Async(Arc<AsyncHandler>),
}

impl Callback {
	/// Wraps a synchronous closure.
	pub fn sync<F>(handler: F) -> Self
	where F: Fn(&MessageContext) -> CallbackResult + Send + Sync + 'static {
		Self::Sync(Arc::new(handler))
	}

	/// Wraps a closure returning a future.
	pub fn asynchronous<F, Fut>(handler: F) -> Self
	where
		F: Fn(MessageContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = CallbackResult> + Send + 'static,
	{
		Self::Async(Arc::new(
			move |message: MessageContext| -> BoxFuture<'static, CallbackResult> {
				handler(message).boxed()
			},
		))
	}

	/// Returns true for the asynchronous variant.
	pub fn is_async(&self) -> bool {
		matches!(self, Callback::Async(_))
	}

	/// Returns true if both values wrap the same handler.
	pub fn ptr_eq(&self, other: &Callback) -> bool {
		match (self, other) {
			| (Callback::Sync(a), Callback::Sync(b)) => Arc::ptr_eq(a, b),
			| (Callback::Async(a), Callback::Async(b)) => Arc::ptr_eq(a, b),
			| _ => false,
		}
	}
}

impl fmt::Debug for Callback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			| Callback::Sync(handler) => {
				write!(f, "Callback::Sync({:p})", Arc::as_ptr(handler))
			}
			| Callback::Async(handler) => {
				write!(f, "Callback::Async({:p})", Arc::as_ptr(handler))
			}
		}
	}
}

/// A message-to-subscription pairing produced by routing.
#[derive(Debug, Clone)]
pub struct Route {
	/// Subscription the message is routed to
	pub subscription_id: SubscriptionId,
	/// Callback to invoke
	pub callback: Callback,
}

impl PartialEq for Route {
	fn eq(&self, other: &Self) -> bool {
		self.subscription_id == other.subscription_id
			&& self.callback.ptr_eq(&other.callback)
	}
}

/// Registration of interest in topics matching a pattern.
#[derive(Debug, Clone)]
pub struct Subscription {
	id: SubscriptionId,
	topic: ArcStr,
	qos: QoS,
	callback: Option<Callback>,
	filters: SubscriptionFilters,
	created_at: SystemTime,
	message_count: u64,
	last_message_time: Option<SystemTime>,
}

impl Subscription {
	pub(crate) fn new(
		id: SubscriptionId,
		topic: ArcStr,
		qos: QoS,
		callback: Option<Callback>,
		filters: SubscriptionFilters,
		created_at: SystemTime,
	) -> Self {
		Self {
			id,
			topic,
			qos,
			callback,
			filters,
			created_at,
			message_count: 0,
			last_message_time: None,
		}
	}

	/// Unique identifier.
	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	/// Pattern string this subscription is bound to.
	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}

	/// Requested QoS.
	pub fn qos(&self) -> QoS {
		self.qos
	}

	/// Callback, if any. Callback-less subscriptions never produce routes.
	pub fn callback(&self) -> Option<&Callback> {
		self.callback.as_ref()
	}

	/// Filter predicates applied before routing.
	pub fn filters(&self) -> &SubscriptionFilters {
		&self.filters
	}

	/// Creation time.
	pub fn created_at(&self) -> SystemTime {
		self.created_at
	}

	/// Messages that passed this subscription's filters.
	pub fn message_count(&self) -> u64 {
		self.message_count
	}

	/// Arrival time of the last accepted message.
	pub fn last_message_time(&self) -> Option<SystemTime> {
		self.last_message_time
	}

	pub(crate) fn record_message(&mut self, received_at: SystemTime) {
		self.message_count += 1;
		self.last_message_time = Some(received_at);
	}
}
