//! Callback invocation for computed routes

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;
use tracing::{error, trace};

use super::subscription::{Callback, MessageContext, Route, SubscriptionId};

/// Outcome of delivering one message to its routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
	/// Subscriptions whose callback completed successfully
	pub delivered: Vec<SubscriptionId>,
	/// Subscriptions whose callback returned an error or panicked
	pub failed: Vec<(SubscriptionId, String)>,
}

impl DispatchReport {
	/// Routes attempted.
	pub fn attempted(&self) -> usize {
		self.delivered.len() + self.failed.len()
	}

	/// Returns true if every callback succeeded.
	pub fn is_success(&self) -> bool {
		self.failed.is_empty()
	}
}

/// Invokes each route's callback in route order.
///
/// Synchronous callbacks run inline; asynchronous ones are awaited before the
/// next route is served. A failing or panicking callback is logged and
/// recorded, and never prevents delivery to the remaining routes.
pub async fn dispatch_routes(
	routes: &[Route],
	message: &MessageContext,
) -> DispatchReport {
	let mut report = DispatchReport::default();

	for route in routes {
		let id = route.subscription_id;
		let outcome = match &route.callback {
			| Callback::Sync(handler) => {
				catch_unwind(AssertUnwindSafe(|| handler(message)))
			}
			| Callback::Async(handler) => {
				AssertUnwindSafe(handler(message.clone()))
					.catch_unwind()
					.await
			}
		};

		match outcome {
			| Ok(Ok(())) => {
				trace!(subscription_id = %id, topic = %message.topic, "Callback delivered");
				report.delivered.push(id);
			}
			| Ok(Err(err)) => {
				error!(
					subscription_id = %id,
					topic = %message.topic,
					error = %err,
					"Subscriber callback failed"
				);
				report.failed.push((id, err.to_string()));
			}
			| Err(panic) => {
				let reason = panic_message(panic.as_ref());
				error!(
					subscription_id = %id,
					topic = %message.topic,
					panic = %reason,
					"Subscriber callback panicked"
				);
				report.failed.push((id, format!("callback panicked: {reason}")));
			}
		}
	}

	report
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	if let Some(message) = panic.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = panic.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}
