//! Insight pipeline - sequences the three stages
//!
//! IDLE → FETCHING → SUMMARIZING → READY, with FAILED reachable from either
//! working state. A second `run()` while one is outstanding is rejected with
//! `ConcurrentRunError`; the running one is never abandoned. Dropping a
//! `run()` future mid-flight counts as a failure: the state becomes `Failed`
//! and the stored summary is left as it was.

use crate::banking::BankDataAggregator;
use crate::error::InsightError;
use crate::models::SummaryResult;
use crate::notify::NotificationDispatcher;
use crate::summarizer::Summarizer;
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Fetching,
    Summarizing,
    Ready,
    Failed,
}

impl PipelineState {
    pub fn is_running(self) -> bool {
        matches!(self, PipelineState::Fetching | PipelineState::Summarizing)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Fetching => "fetching",
            PipelineState::Summarizing => "summarizing",
            PipelineState::Ready => "ready",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    pub state: PipelineState,
    pub summary: Option<SummaryResult>,
}

/// Owns the pipeline state and the last good summary
pub struct InsightPipeline {
    aggregator: BankDataAggregator,
    summarizer: Summarizer,
    dispatcher: NotificationDispatcher,
    state: watch::Sender<PipelineState>,
    summary: RwLock<Option<SummaryResult>>,
}

impl InsightPipeline {
    pub fn new(
        aggregator: BankDataAggregator,
        summarizer: Summarizer,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);

        Self {
            aggregator,
            summarizer,
            dispatcher,
            state,
            summary: RwLock::new(None),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    pub async fn summary(&self) -> Option<SummaryResult> {
        self.summary.read().await.clone()
    }

    /// State and summary read together; `run` moves to `Ready` while
    /// holding the summary write lock.
    pub async fn snapshot(&self) -> PipelineSnapshot {
        let summary = self.summary.read().await;
        PipelineSnapshot {
            state: self.state(),
            summary: summary.clone(),
        }
    }

    /// Subscribe to state transitions
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Fetch, summarize and store the result.
    ///
    /// Errors from either stage are returned unchanged; the state becomes
    /// `Failed` and the previous summary (if any) is kept.
    pub async fn run(&self) -> Result<SummaryResult> {
        // check-and-set under the channel's lock
        let accepted = self.state.send_if_modified(|state| {
            if state.is_running() {
                return false;
            }
            *state = PipelineState::Fetching;
            true
        });

        if !accepted {
            warn!("Rejecting run: pipeline already in progress");
            return Err(InsightError::ConcurrentRunError);
        }

        let run_id = Uuid::new_v4();
        let start_time = Instant::now();
        let mut guard = RunGuard {
            state: &self.state,
            run_id,
            armed: true,
        };

        info!(%run_id, "Pipeline: fetching account data");

        let narrative = match self.aggregator.collect().await {
            Ok(narrative) => narrative,
            Err(e) => {
                guard.armed = false;
                return Err(self.fail(run_id, e));
            }
        };

        debug!(%run_id, chars = narrative.as_str().len(), "Narrative assembled");

        self.transition(PipelineState::Summarizing);
        info!(%run_id, "Pipeline: summarizing");

        let result = match self.summarizer.summarize(narrative).await {
            Ok(result) => result,
            Err(e) => {
                guard.armed = false;
                return Err(self.fail(run_id, e));
            }
        };

        {
            let mut summary = self.summary.write().await;
            *summary = Some(result.clone());
            self.transition(PipelineState::Ready);
            guard.armed = false;
        }

        info!(
            %run_id,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Pipeline: summary ready"
        );

        Ok(result)
    }

    /// Deliver the stored summary as a voice call.
    ///
    /// Only valid in `Ready` with a non-empty summary; otherwise returns
    /// `NotReadyError` without touching the voice provider.
    pub async fn notify(&self) -> Result<()> {
        if self.state() != PipelineState::Ready {
            debug!(state = %self.state(), "Notify requested before summary is ready");
            return Err(InsightError::NotReadyError);
        }

        let text = match self.summary().await {
            Some(summary) if !summary.text.trim().is_empty() => summary.text,
            _ => return Err(InsightError::NotReadyError),
        };

        self.dispatcher.call(&text).await
    }

    fn transition(&self, next: PipelineState) {
        let previous = self.state.send_replace(next);
        debug!(from = %previous, to = %next, "State transition");
    }

    fn fail(&self, run_id: Uuid, error: InsightError) -> InsightError {
        warn!(%run_id, "Pipeline failed: {}", error);
        self.transition(PipelineState::Failed);
        error
    }
}

/// Moves an abandoned run to `Failed` when the `run()` future is dropped
/// before reaching `Ready` or `Failed` itself.
struct RunGuard<'a> {
    state: &'a watch::Sender<PipelineState>,
    run_id: Uuid,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let abandoned = self.state.send_if_modified(|state| {
            if !state.is_running() {
                return false;
            }
            *state = PipelineState::Failed;
            true
        });

        if abandoned {
            warn!(run_id = %self.run_id, "Pipeline run cancelled before completion");
        }
    }
}
