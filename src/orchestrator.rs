use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, MediaError, RunError};
use crate::ledger::CompletionLedger;
use crate::media::MediaBundle;
use crate::state_machine::{Stage, StageReport, StageRunner};
use crate::surface::FormSurface;
use crate::target::Target;
use crate::work_item::WorkItem;

/// Caller-owned abort switch, checked at every stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
    /// The target already holds this item; nothing was touched.
    Skipped,
}

/// Result of one (work-item, target) run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub item_key: String,
    pub target: Target,
    pub status: RunStatus,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    pub stages: Vec<StageReport>,
    /// This run's completion archived the item. On the last variant run of a
    /// target it also reports the parent's archival.
    pub archived: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunOutcome {
    /// The run did not list the item: it failed or was cancelled.
    pub fn is_failure(&self) -> bool {
        matches!(self.status, RunStatus::Failed | RunStatus::Cancelled)
    }

    fn start(item: &WorkItem, target: Target) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4().to_string(),
            item_key: item.key.clone(),
            target,
            status: RunStatus::Failed,
            success: false,
            failed_stage: None,
            cause: None,
            stages: Vec::new(),
            archived: false,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    fn finish(mut self, status: RunStatus) -> Self {
        self.status = status;
        self.success = status == RunStatus::Completed;
        self.finished_at = Utc::now();
        self.duration_ms = (self.finished_at - self.started_at).num_milliseconds();
        self
    }

    fn failed(mut self, stage: Option<&str>, cause: String) -> Self {
        self.failed_stage = stage.map(str::to_string);
        self.cause = Some(cause);
        self.finish(RunStatus::Failed)
    }
}

/// Sequences a target's stages for one work-item and records completion.
pub struct WorkflowOrchestrator {
    runner: StageRunner,
    ledger: Arc<CompletionLedger>,
    media: Arc<dyn MediaBundle>,
}

impl WorkflowOrchestrator {
    pub fn new(
        runner: StageRunner,
        ledger: Arc<CompletionLedger>,
        media: Arc<dyn MediaBundle>,
    ) -> Self {
        Self {
            runner,
            ledger,
            media,
        }
    }

    pub fn ledger(&self) -> &CompletionLedger {
        &self.ledger
    }

    /// Runs every stage of `target` for `item` in order.
    ///
    /// Stage and setup failures come back as a failed [`RunOutcome`]; only
    /// ledger persistence failures are returned as `Err`.
    pub async fn run<S: FormSurface>(
        &self,
        surface: &mut S,
        item: &WorkItem,
        target: Target,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, LedgerError> {
        let mut outcome = RunOutcome::start(item, target);
        info!(run = %outcome.run_id, item = %item.key, %target, "run started");

        self.ledger.ensure_registered(&item.key)?;
        if self.ledger.is_complete(&item.key, target)? {
            info!(item = %item.key, %target, "already complete, skipping");
            outcome.cause = Some("already complete".to_string());
            return Ok(outcome.finish(RunStatus::Skipped));
        }

        let stages = match self.prepare(item, target) {
            Ok(stages) => stages,
            Err(e) => {
                warn!(item = %item.key, %target, %e, "run aborted before touching the surface");
                return Ok(outcome.failed(None, e.to_string()));
            }
        };

        let surface: &S = surface;
        for stage in &stages {
            if cancel.is_cancelled() {
                info!(item = %item.key, %target, stage = %stage.name, "cancelled");
                outcome.cause = Some(format!("cancelled before {}", stage.name));
                return Ok(outcome.finish(RunStatus::Cancelled));
            }

            let run = self.runner.run(surface, stage).await;
            outcome.stages.push(run.report);
            if let Some(failure) = run.failure {
                warn!(item = %item.key, %target, stage = %stage.name, %failure, "stage failed");
                return Ok(outcome.failed(Some(&stage.name), failure.to_string()));
            }
        }

        let marked = self
            .ledger
            .mark_complete_with_media(&item.key, target, item.owned_media())?;
        outcome.archived = marked.archived_now;
        let outcome = outcome.finish(RunStatus::Completed);
        info!(
            run = %outcome.run_id,
            item = %item.key,
            %target,
            duration_ms = outcome.duration_ms,
            archived = outcome.archived,
            "run completed"
        );
        Ok(outcome)
    }

    /// Runs `item`, or each of its variants under their derived keys.
    ///
    /// The parent of a multi-variant item is tracked in the ledger too: its
    /// flag for `target` is set once every variant holds that target, and its
    /// media bundle is archived when the parent completes everywhere.
    pub async fn run_all_variants<S: FormSurface>(
        &self,
        surface: &mut S,
        item: &WorkItem,
        target: Target,
        cancel: &CancelFlag,
    ) -> Result<Vec<RunOutcome>, LedgerError> {
        if !item.is_multi_variant() {
            return Ok(vec![self.run(surface, item, target, cancel).await?]);
        }

        self.ledger.ensure_registered(&item.key)?;
        let variants = item.variant_items();
        let mut outcomes = Vec::new();
        for variant in &variants {
            if cancel.is_cancelled() {
                break;
            }
            outcomes.push(self.run(surface, variant, target, cancel).await?);
        }

        for variant in &variants {
            if !self.ledger.is_complete(&variant.key, target)? {
                return Ok(outcomes);
            }
        }
        let marked =
            self.ledger
                .mark_complete_with_media(&item.key, target, item.owned_media())?;
        if marked.changed {
            info!(item = %item.key, %target, "every variant listed");
        }
        if marked.archived_now
            && let Some(last) = outcomes.last_mut()
        {
            last.archived = true;
        }
        Ok(outcomes)
    }

    /// Validates the item and binds every stage. Nothing here touches the surface.
    fn prepare(&self, item: &WorkItem, target: Target) -> Result<Vec<Stage>, RunError> {
        let problems = item.validate_for(target);
        if !problems.is_empty() {
            return Err(RunError::Invalid {
                item: item.key.clone(),
                target: target.to_string(),
                problems: problems.join("; "),
            });
        }

        let definitions = target.stages();
        if definitions.is_empty() {
            return Err(RunError::NoStages(target.to_string()));
        }

        let media = if definitions.iter().any(|d| d.needs_media()) {
            self.media
                .files(item.media_bundle())
                .map_err(|e| match e {
                    MediaError::FolderMissing(_) | MediaError::Empty(_) => {
                        RunError::MissingMedia(item.key.clone())
                    }
                    other => RunError::Media(other.to_string()),
                })?
        } else {
            Vec::new()
        };

        definitions
            .iter()
            .map(|definition| definition.bind(item, &media))
            .collect()
    }
}
