//! Progress feed
//!
//! A cancellable repeating task that cycles through human-readable status
//! lines while a single slow operation is outstanding. It is spawned on the
//! same runtime as the operation it accompanies and interleaves with it at
//! each tick boundary.
//!
//! Once [`ProgressFeed::stop`] returns, the sink is never invoked again by
//! that feed. Stopping is idempotent and also happens on drop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default cadence between progress lines.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1500);

/// Smallest cadence accepted; tokio intervals reject a zero period.
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Receiver for progress text. Must tolerate any number of calls, including zero.
pub type ProgressSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Build a [`ProgressSink`] from a closure.
pub fn sink<F>(f: F) -> ProgressSink
where
    F: Fn(&str) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A sink that drops every message.
pub fn silent_sink() -> ProgressSink {
    Arc::new(|_: &str| {})
}

struct FeedState {
    /// Guards every sink invocation, so flipping it under the lock fences
    /// out any tick that has not yet started.
    active: Mutex<bool>,
    sink: ProgressSink,
}

/// Handle to a running ticker.
pub struct ProgressFeed {
    state: Arc<FeedState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProgressFeed {
    /// Start emitting `messages` to `sink` every `interval`, wrapping around
    /// at the end of the list. The first line is emitted one interval after
    /// start.
    ///
    /// Must be called from within a tokio runtime. An empty message list
    /// produces a feed that never ticks.
    pub fn start<I, S>(messages: I, interval: Duration, sink: ProgressSink) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let messages: Vec<String> = messages.into_iter().map(Into::into).collect();
        let state = Arc::new(FeedState {
            active: Mutex::new(true),
            sink,
        });
        let cancel = CancellationToken::new();

        if messages.is_empty() {
            return Self {
                state,
                cancel,
                task: None,
            };
        }

        let period = interval.max(MIN_TICK_INTERVAL);
        let task = tokio::spawn(run_feed(
            messages,
            period,
            Arc::clone(&state),
            cancel.clone(),
        ));

        tracing::trace!(interval_ms = period.as_millis() as u64, "progress feed started");

        Self {
            state,
            cancel,
            task: Some(task),
        }
    }

    /// Stop the feed. Calling this more than once is a no-op.
    pub fn stop(&self) {
        {
            let mut active = self.state.active.lock();
            if !*active {
                return;
            }
            *active = false;
        }
        self.cancel.cancel();
        if let Some(task) = &self.task {
            task.abort();
        }
        tracing::trace!("progress feed stopped");
    }

    /// Whether the feed may still emit.
    pub fn is_active(&self) -> bool {
        *self.state.active.lock()
    }
}

impl Drop for ProgressFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ProgressFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressFeed")
            .field("active", &self.is_active())
            .finish()
    }
}

async fn run_feed(
    messages: Vec<String>,
    period: Duration,
    state: Arc<FeedState>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut index = 0usize;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !emit(&state, &messages[index % messages.len()]) {
                    break;
                }
                index = index.wrapping_add(1);
            }
        }
    }
}

/// Deliver one line if the feed is still active. Returns false once stopped.
fn emit(state: &FeedState, line: &str) -> bool {
    let active = state.active.lock();
    if !*active {
        return false;
    }
    (state.sink)(line);
    true
}
