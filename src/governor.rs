//! Sliding-window call pacing for a single backend.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// At most `max_calls` calls in any window of length `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub max_calls: u32,
    #[serde(with = "duration_ms", rename = "window_ms")]
    pub window: Duration,
}

impl RateLimit {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self { max_calls, window }
    }

    pub fn per_second(max_calls: u32) -> Self {
        Self::new(max_calls, Duration::from_secs(1))
    }

    pub fn per_minute(max_calls: u32) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }

    pub fn per_day(max_calls: u32) -> Self {
        Self::new(max_calls, Duration::from_secs(86_400))
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Debug)]
struct Window {
    limit: RateLimit,
    calls: VecDeque<Instant>,
}

impl Window {
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.calls.front() {
            if now.duration_since(oldest) >= self.limit.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until a slot opens, or `None` if one is free now.
    fn wait_time(&mut self, now: Instant) -> Option<Duration> {
        self.prune(now);
        if (self.calls.len() as u32) < self.limit.max_calls {
            return None;
        }
        self.calls
            .front()
            .map(|&oldest| self.limit.window.saturating_sub(now.duration_since(oldest)))
    }
}

/// Snapshot of one window for introspection.
#[derive(Debug, Clone, Serialize)]
pub struct WindowStatus {
    pub max_calls: u32,
    pub window_ms: u64,
    pub calls_in_window: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GovernorStatus {
    pub windows: Vec<WindowStatus>,
    pub can_make_request: bool,
    pub wait_time_ms: u64,
}

/// Delays callers so that no configured [`RateLimit`] is ever exceeded.
///
/// The check-and-record step runs under one lock, so concurrent callers
/// cannot both claim the last slot. Callers that must wait queue on an
/// async mutex and are served in arrival order.
#[derive(Debug)]
pub struct RateGovernor {
    windows: Mutex<Vec<Window>>,
    queue: tokio::sync::Mutex<()>,
}

impl RateGovernor {
    /// Build a governor enforcing every limit in `limits`.
    ///
    /// A limit with `max_calls == 0` or a zero window can never admit a
    /// call, so it is dropped with a warning and does not pace anything.
    /// `Config::validate` rejects such limits before they get here.
    pub fn new(limits: Vec<RateLimit>) -> Self {
        let windows = limits
            .into_iter()
            .filter(|limit| {
                let usable = limit.max_calls > 0 && !limit.window.is_zero();
                if !usable {
                    warn!(
                        "Ignoring rate limit of {} calls per {}ms",
                        limit.max_calls,
                        limit.window.as_millis()
                    );
                }
                usable
            })
            .map(|limit| Window {
                limit,
                calls: VecDeque::with_capacity(limit.max_calls as usize),
            })
            .collect();
        Self {
            windows: Mutex::new(windows),
            queue: tokio::sync::Mutex::new(()),
        }
    }

    /// A governor that never delays.
    pub fn unlimited() -> Self {
        Self::new(Vec::new())
    }

    fn lock_windows(&self) -> MutexGuard<'_, Vec<Window>> {
        // Window state stays consistent even if a holder panicked.
        self.windows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a call if every window has room; otherwise report the wait.
    fn try_record(&self) -> Option<Duration> {
        let mut windows = self.lock_windows();
        let now = Instant::now();
        let wait = windows.iter_mut().filter_map(|w| w.wait_time(now)).max();
        if wait.is_none() {
            for window in windows.iter_mut() {
                window.calls.push_back(now);
            }
        }
        wait
    }

    /// Wait until a call slot is available, then claim it.
    pub async fn acquire(&self) {
        let _turn = self.queue.lock().await;
        while let Some(wait) = self.try_record() {
            debug!("Rate limit reached, waiting {}ms for a slot", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
    }

    pub fn status(&self) -> GovernorStatus {
        let mut windows = self.lock_windows();
        let now = Instant::now();
        let wait = windows
            .iter_mut()
            .filter_map(|w| w.wait_time(now))
            .max()
            .unwrap_or(Duration::ZERO);

        GovernorStatus {
            windows: windows
                .iter()
                .map(|w| WindowStatus {
                    max_calls: w.limit.max_calls,
                    window_ms: w.limit.window.as_millis() as u64,
                    calls_in_window: w.calls.len(),
                })
                .collect(),
            can_make_request: wait.is_zero(),
            wait_time_ms: wait.as_millis() as u64,
        }
    }
}
