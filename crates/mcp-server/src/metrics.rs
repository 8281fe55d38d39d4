//! In-process metrics: atomic counters, gauges computed at snapshot time,
//! and bounded sliding-window histograms with percentile summaries.

use parking_lot::Mutex;
use rlm_session::SessionRegistry;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

const HISTOGRAM_WINDOW: usize = 1_000;

#[derive(Default)]
pub struct Histogram {
    window: Mutex<VecDeque<f64>>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct HistogramSnapshot {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Histogram {
    pub fn record(&self, value_ms: f64) {
        let mut window = self.window.lock();
        window.push_back(value_ms);
        while window.len() > HISTOGRAM_WINDOW {
            window.pop_front();
        }
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let window = self.window.lock();
        if window.is_empty() {
            return HistogramSnapshot::default();
        }
        let mut sorted: Vec<f64> = window.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let sum: f64 = sorted.iter().sum();
        let percentile = |p: f64| -> f64 {
            let rank = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
            sorted[rank.min(sorted.len() - 1)]
        };
        HistogramSnapshot {
            count: sorted.len(),
            min: sorted[0],
            max: *sorted.last().expect("non-empty"),
            avg: sum / sorted.len() as f64,
            sum,
            p50: percentile(50.0),
            p90: percentile(90.0),
            p95: percentile(95.0),
            p99: percentile(99.0),
        }
    }
}

macro_rules! counters {
    ($($name:ident),* $(,)?) => {
        #[derive(Default)]
        pub struct Counters {
            $(pub $name: AtomicU64,)*
        }

        #[derive(Debug, Clone, Serialize)]
        pub struct CountersSnapshot {
            $(pub $name: u64,)*
        }

        impl Counters {
            fn snapshot(&self) -> CountersSnapshot {
                CountersSnapshot {
                    $($name: self.$name.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

counters! {
    tool_calls_total,
    tool_calls_failed,
    contexts_loaded,
    contexts_appended,
    contexts_unloaded,
    code_executions,
    code_failures,
    searches,
    cache_hits,
    cache_misses,
    index_builds,
    index_hits,
    sessions_created,
    sessions_evicted,
}

/// `cache_size` and `index_size` are both estimated bytes.
#[derive(Debug, Clone, Serialize)]
pub struct GaugesSnapshot {
    pub active_sessions: usize,
    pub total_memory_bytes: usize,
    pub cache_size: usize,
    pub index_size: usize,
}

#[derive(Default)]
pub struct Histograms {
    pub tool_duration_ms: Histogram,
    pub search_duration_ms: Histogram,
    pub decompose_duration_ms: Histogram,
    pub code_execution_duration_ms: Histogram,
    pub load_context_duration_ms: Histogram,
    pub append_context_duration_ms: Histogram,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramsSnapshot {
    pub tool_duration_ms: HistogramSnapshot,
    pub search_duration_ms: HistogramSnapshot,
    pub decompose_duration_ms: HistogramSnapshot,
    pub code_execution_duration_ms: HistogramSnapshot,
    pub load_context_duration_ms: HistogramSnapshot,
    pub append_context_duration_ms: HistogramSnapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub counters: CountersSnapshot,
    pub gauges: GaugesSnapshot,
    pub histograms: HistogramsSnapshot,
}

pub struct Metrics {
    started_at: Instant,
    pub counters: Counters,
    pub histograms: Histograms,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            counters: Counters::default(),
            histograms: Histograms::default(),
        }
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, registry: &SessionRegistry) -> MetricsSnapshot {
        let stats = registry.stats();
        // Session-eviction counting lives in the registry; mirror it here so
        // the counter survives in one place on the wire.
        self.counters
            .sessions_evicted
            .store(registry.evictions_total(), Ordering::Relaxed);
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            counters: self.counters.snapshot(),
            gauges: GaugesSnapshot {
                active_sessions: stats.session_count,
                total_memory_bytes: stats.total_memory_bytes,
                cache_size: stats.chunk_cache_bytes,
                index_size: stats.index_cache_bytes,
            },
            histograms: HistogramsSnapshot {
                tool_duration_ms: self.histograms.tool_duration_ms.snapshot(),
                search_duration_ms: self.histograms.search_duration_ms.snapshot(),
                decompose_duration_ms: self.histograms.decompose_duration_ms.snapshot(),
                code_execution_duration_ms: self
                    .histograms
                    .code_execution_duration_ms
                    .snapshot(),
                load_context_duration_ms: self.histograms.load_context_duration_ms.snapshot(),
                append_context_duration_ms: self
                    .histograms
                    .append_context_duration_ms
                    .snapshot(),
            },
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
