//! Health statistics for the exporter.
//!
//! Tracks scrape performance, service discovery requests and HTTP traffic
//! for the plain-text `/health` report.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns `(current, average, max, min)`.
    pub fn snapshot(&self) -> (f64, f64, f64, f64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min)
        } else {
            (0.0, 0.0, 0.0, 0.0)
        }
    }
}

/// Request timestamps of the last ten minutes.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    const RETENTION: Duration = Duration::from_secs(600);

    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            while guard
                .front()
                .is_some_and(|&t| now.duration_since(t) > Self::RETENTION)
            {
                guard.pop_front();
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            guard
                .iter()
                .filter(|t| t.elapsed() <= Duration::from_secs(60))
                .count() as u64
        } else {
            0
        }
    }
}

/// Exporter-internal statistics shown on `/health`.
pub struct HealthStats {
    // Scrape performance
    pub scrape_duration_seconds: Stat,
    pub metric_families: Stat,
    pub total_scrapes: AtomicU64,
    pub scrape_failures: AtomicU64,

    // Service discovery
    pub sd_requests: AtomicU64,
    pub sd_unreachable: AtomicU64,

    // HTTP server
    pub http_request_timestamps: RequestTimestamps,

    pub start_time: Instant,
    pub last_scrape_time: StdRwLock<Option<Instant>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            scrape_duration_seconds: Stat::default(),
            metric_families: Stat::default(),
            total_scrapes: AtomicU64::new(0),
            scrape_failures: AtomicU64::new(0),
            sd_requests: AtomicU64::new(0),
            sd_unreachable: AtomicU64::new(0),
            http_request_timestamps: RequestTimestamps::default(),
            start_time: Instant::now(),
            last_scrape_time: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_scrape(&self, duration_seconds: f64, families: usize) {
        self.scrape_duration_seconds.add_sample(duration_seconds);
        self.metric_families.add_sample(families as f64);
        self.total_scrapes.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_scrape_time.write() {
            *guard = Some(Instant::now());
        }
    }

    pub fn record_scrape_failure(&self) {
        self.scrape_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sd_request(&self, reachable: bool) {
        self.sd_requests.fetch_add(1, Ordering::Relaxed);
        if !reachable {
            self.sd_unreachable.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Seconds since the last completed scrape, formatted for display.
    pub fn get_last_scrape_str(&self) -> String {
        match self.last_scrape_time.read().ok().and_then(|guard| *guard) {
            Some(last) => format!("{:.1}s ago", last.elapsed().as_secs_f64()),
            None => "N/A".to_string(),
        }
    }

    pub fn render_table(&self, collector_errors: u64) -> String {
        let left_col = 26usize;
        let col_w = 12usize;
        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - EXPORTER INTERNAL STATS").ok();
        writeln!(out, "==========================================").ok();
        writeln!(out).ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "SCRAPE PERFORMANCE").ok();
        writeln!(out, "------------------").ok();
        for (name, stat, precision) in [
            ("scrape_duration (s)", &self.scrape_duration_seconds, 3usize),
            ("metric_families", &self.metric_families, 0),
        ] {
            let (cur, avg, max, min) = stat.snapshot();
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                name,
                format!("{:.*}", precision, cur),
                format!("{:.*}", precision.max(1), avg),
                format!("{:.*}", precision, max),
                format!("{:.*}", precision, min),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "COUNTERS").ok();
        writeln!(out, "--------").ok();
        for (name, value) in [
            ("total_scrapes", self.total_scrapes.load(Ordering::Relaxed)),
            ("scrape_failures", self.scrape_failures.load(Ordering::Relaxed)),
            ("collector_errors_total", collector_errors),
            ("sd_requests", self.sd_requests.load(Ordering::Relaxed)),
            ("sd_unreachable", self.sd_unreachable.load(Ordering::Relaxed)),
            (
                "http_requests_last_minute",
                self.http_request_timestamps.count_last_minute(),
            ),
        ] {
            writeln!(out, "{:left$} | {:>col$}", name, value, left = left_col, col = col_w).ok();
        }

        writeln!(out).ok();
        writeln!(out, "Last scrape: {}", self.get_last_scrape_str()).ok();
        out
    }
}
