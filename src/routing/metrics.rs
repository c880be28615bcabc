//! Routing telemetry: counters, performance history and the reports built
//! from them

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, SystemTime};

use arcstr::ArcStr;
use serde::Serialize;

/// Running counters kept by the pattern manager.
#[derive(Debug, Clone, Default)]
pub(crate) struct RouterCounters {
	pub pattern_matches: u64,
	pub cache_hits: u64,
	pub cache_misses: u64,
	pub messages_routed: u64,
	pub routes_produced: u64,
	pub subscriptions_created: u64,
	pub subscriptions_removed: u64,
	pub total_match_time: Duration,
	pub total_routing_time: Duration,
}

impl RouterCounters {
	pub fn cache_hit_rate(&self) -> f64 {
		let lookups = self.cache_hits + self.cache_misses;
		if lookups == 0 {
			0.0
		} else {
			self.cache_hits as f64 / lookups as f64
		}
	}
}

/// One routed message, as recorded in the performance history.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSample {
	/// Routed topic
	pub topic: ArcStr,
	/// Routes produced for the message
	pub route_count: usize,
	/// Time spent in `route_message`
	pub elapsed: Duration,
	/// Total pattern matches at the time of the sample
	pub pattern_matches: u64,
	/// Total routed messages at the time of the sample
	pub messages_routed: u64,
	/// Cache hit rate at the time of the sample
	pub cache_hit_rate: f64,
	/// When the sample was taken
	pub recorded_at: SystemTime,
}

/// Bounded rolling history; the oldest sample is dropped first.
#[derive(Debug, Clone)]
pub(crate) struct PerformanceHistory {
	samples: VecDeque<PerformanceSample>,
	capacity: usize,
}

impl PerformanceHistory {
	pub fn new(capacity: usize) -> Self {
		Self {
			samples: VecDeque::with_capacity(capacity),
			capacity,
		}
	}

	pub fn push(&mut self, sample: PerformanceSample) {
		while self.samples.len() >= self.capacity {
			self.samples.pop_front();
		}
		self.samples.push_back(sample);
	}

	pub fn len(&self) -> usize {
		self.samples.len()
	}

	pub fn is_empty(&self) -> bool {
		self.samples.is_empty()
	}

	pub fn clear(&mut self) {
		self.samples.clear();
	}

	fn mean_us<'a>(samples: impl Iterator<Item = &'a PerformanceSample>) -> f64 {
		let (count, total) = samples.fold((0usize, 0f64), |(count, total), s| {
			(count + 1, total + s.elapsed.as_secs_f64() * 1e6)
		});
		if count == 0 { 0.0 } else { total / count as f64 }
	}

	pub fn average_us(&self) -> f64 {
		Self::mean_us(self.samples.iter())
	}

	pub fn min(&self) -> Option<Duration> {
		self.samples.iter().map(|s| s.elapsed).min()
	}

	pub fn max(&self) -> Option<Duration> {
		self.samples.iter().map(|s| s.elapsed).max()
	}

	/// Compares the mean of the older half with the newer half.
	pub fn trend(&self) -> Option<PerformanceTrend> {
		if self.samples.len() < 2 {
			return None;
		}
		let half = self.samples.len() / 2;
		let older = Self::mean_us(self.samples.iter().take(half));
		let newer = Self::mean_us(self.samples.iter().skip(half));
		Some(if newer < older {
			PerformanceTrend::Improving
		} else {
			PerformanceTrend::Degrading
		})
	}
}

/// Snapshot of the manager's counters and cache sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterMetrics {
	/// Registered patterns
	pub pattern_count: usize,
	/// Live subscriptions
	pub subscription_count: usize,
	/// Patterns matched on cache misses
	pub pattern_matches: u64,
	/// Match cache hits
	pub cache_hits: u64,
	/// Match cache misses
	pub cache_misses: u64,
	/// Hits over lookups, 0 when nothing was looked up
	pub cache_hit_rate: f64,
	/// Topics currently in the match cache
	pub pattern_match_cache_size: usize,
	/// Match cache capacity
	pub pattern_match_cache_capacity: usize,
	/// Buckets in the hierarchy index
	pub hierarchy_cache_size: usize,
	/// Cumulative time spent matching (µs)
	pub total_match_time_us: u64,
	/// Cumulative time spent routing (µs)
	pub total_routing_time_us: u64,
	/// Mean routing time per message (µs)
	pub average_routing_time_us: f64,
	/// Messages passed to `route_message`
	pub messages_routed: u64,
	/// Routes produced in total
	pub routes_produced: u64,
	/// Subscriptions ever created
	pub subscriptions_created: u64,
	/// Subscriptions ever removed
	pub subscriptions_removed: u64,
	/// Samples in the performance history
	pub performance_samples: usize,
}

/// Direction of routing latency over the retained history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTrend {
	/// Newer samples are faster on average
	Improving,
	/// Newer samples are as slow or slower on average
	Degrading,
}

/// Heuristic tuning advice derived from telemetry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
	/// Hit rate is below the configured minimum
	CacheTooSmall {
		/// Observed hit rate
		hit_rate: f64,
		/// Current capacity
		capacity: usize,
	},
	/// Patterns with more wildcards than the configured maximum
	ComplexPatterns {
		/// Offending pattern strings
		patterns: Vec<String>,
	},
	/// A pattern with more subscriptions than the configured maximum
	TooManySubscriptions {
		/// Pattern string
		pattern: String,
		/// Its subscription count
		subscriptions: usize,
	},
	/// Mean routing time above the configured threshold
	SlowProcessing {
		/// Observed mean (µs)
		average_us: f64,
		/// Threshold (µs)
		threshold_us: u64,
	},
}

impl fmt::Display for Recommendation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			| Self::CacheTooSmall { hit_rate, capacity } => write!(
				f,
				"cache hit rate {:.1}% is low, consider a match cache larger \
				 than {capacity}",
				hit_rate * 100.0
			),
			| Self::ComplexPatterns { patterns } => write!(
				f,
				"{} pattern(s) use many wildcards: {}",
				patterns.len(),
				patterns.join(", ")
			),
			| Self::TooManySubscriptions {
				pattern,
				subscriptions,
			} => write!(
				f,
				"pattern '{pattern}' has {subscriptions} subscriptions, \
				 consider splitting it"
			),
			| Self::SlowProcessing {
				average_us,
				threshold_us,
			} => write!(
				f,
				"average routing time {average_us:.1}µs exceeds {threshold_us}µs"
			),
		}
	}
}

/// Result of `get_performance_analysis`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceAnalysis {
	/// Samples the analysis is based on
	pub sample_count: usize,
	/// Mean routing time (µs)
	pub average_processing_time_us: f64,
	/// Fastest sample
	pub min_processing_time: Option<Duration>,
	/// Slowest sample
	pub max_processing_time: Option<Duration>,
	/// Trend, when at least two samples exist
	pub trend: Option<PerformanceTrend>,
	/// Current cache hit rate
	pub cache_hit_rate: f64,
	/// Tuning advice
	pub recommendations: Vec<Recommendation>,
}

/// An action taken by `optimize_performance`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OptimizationAction {
	/// Match cache was near capacity and has been emptied
	MatchCacheCleared {
		/// Entries dropped
		entries: usize,
	},
	/// Pattern list re-sorted by priority
	PatternsResorted {
		/// Patterns in the list
		patterns: usize,
	},
	/// Hierarchy index exceeded its limit and has been emptied
	HierarchyCacheCleared {
		/// Buckets dropped
		buckets: usize,
	},
}

/// Actions taken by one `optimize_performance` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizationReport {
	/// Actions in the order they were taken
	pub actions: Vec<OptimizationAction>,
}

impl OptimizationReport {
	/// Returns true if the given action kind was taken.
	pub fn contains(&self, predicate: impl Fn(&OptimizationAction) -> bool) -> bool {
		self.actions.iter().any(predicate)
	}
}
