//! Poll-based incremental diff monitor.
//!
//! Each poll cycle fetches the full snapshot of a growing text resource,
//! works out which lines are new relative to the previous snapshot, and
//! forwards them one line at a time through a [`ChunkForwarder`]. Cycles
//! are strictly sequential: fetch, diff, forward, sleep.

use crate::chunk::ChunkForwarder;
use crate::fetch::{Fetch, FetchError};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::sink::Sink;
use std::time::Duration;
use tracing::{debug, error};

/// Lines to forward after comparing two snapshots.
#[derive(Debug, PartialEq, Eq)]
pub enum LineDelta<'a> {
    /// Nothing changed.
    Unchanged,
    /// The resource grew; these lines were appended.
    Appended(&'a [String]),
    /// The resource shrank or was rewritten; re-emit all of it.
    Resync(&'a [String]),
}

impl LineDelta<'_> {
    pub fn lines(&self) -> &[String] {
        match self {
            LineDelta::Unchanged => &[],
            LineDelta::Appended(lines) | LineDelta::Resync(lines) => lines,
        }
    }
}

/// Compare the previous snapshot to the current one.
///
/// Growth is assumed append-only, so only the tail past the old line count
/// is forwarded. Any other change re-emits the whole current snapshot.
pub fn diff_snapshots<'a>(previous: &[String], current: &'a [String]) -> LineDelta<'a> {
    if current.len() > previous.len() {
        LineDelta::Appended(&current[previous.len()..])
    } else if current == previous {
        LineDelta::Unchanged
    } else {
        LineDelta::Resync(current)
    }
}

/// Per-monitor state: the last snapshot and the poll cadence.
#[derive(Debug)]
struct PollState {
    snapshot: Option<Vec<String>>,
    interval: Duration,
    polls: u64,
}

pub struct PollDiffMonitor {
    forwarder: ChunkForwarder,
    verbose: bool,
    retry: RetryPolicy,
    state: PollState,
}

impl PollDiffMonitor {
    /// A monitor that treats the first fetch failure as fatal.
    pub fn new(forwarder: ChunkForwarder, interval: Duration, verbose: bool) -> Self {
        Self {
            forwarder,
            verbose,
            retry: RetryPolicy::never(),
            state: PollState {
                snapshot: None,
                interval,
                polls: 0,
            },
        }
    }

    /// Retry failed polls according to `retry` instead of stopping.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Poll until a fetch failure exhausts the retry policy.
    ///
    /// Never returns `Ok` on its own; callers stop it by dropping the future
    /// (e.g. racing it against Ctrl-C).
    pub async fn run<F, S>(&mut self, fetch: &F, sink: &mut S) -> Result<(), FetchError>
    where
        F: Fetch,
        S: Sink + ?Sized,
    {
        loop {
            match self.poll_once(fetch, sink).await {
                Ok(_) => self.retry.reset(),
                Err(e) => {
                    error!("{}", e.describe(self.verbose));
                    match self.retry.on_failure() {
                        RetryDecision::Retry { attempt, delay } => {
                            debug!(attempt, poll = self.state.polls + 1, "retrying poll");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        RetryDecision::GiveUp => return Err(e),
                    }
                }
            }
            tokio::time::sleep(self.state.interval).await;
        }
    }

    /// One fetch-diff-forward cycle without the trailing sleep. Returns the
    /// number of lines forwarded.
    pub async fn poll_once<F, S>(&mut self, fetch: &F, sink: &mut S) -> Result<usize, FetchError>
    where
        F: Fetch,
        S: Sink + ?Sized,
    {
        let current = fetch.fetch().await?;
        self.state.polls += 1;

        let forwarded = match &self.state.snapshot {
            None => {
                forward_lines(&self.forwarder, &current, sink);
                current.len()
            }
            Some(previous) => {
                let delta = diff_snapshots(previous, &current);
                if let LineDelta::Resync(_) = delta {
                    debug!(
                        previous = previous.len(),
                        current = current.len(),
                        "snapshot rewritten, re-emitting all lines"
                    );
                }
                forward_lines(&self.forwarder, delta.lines(), sink);
                delta.lines().len()
            }
        };

        debug!(
            poll = self.state.polls,
            lines = current.len(),
            forwarded,
            "poll complete"
        );
        self.state.snapshot = Some(current);
        Ok(forwarded)
    }
}

fn forward_lines<S: Sink + ?Sized>(forwarder: &ChunkForwarder, lines: &[String], sink: &mut S) {
    for line in lines {
        forwarder.forward(&format!("{line}\n"), sink);
    }
}
