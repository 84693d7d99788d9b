//! Drives one bound [`Stage`] against a [`FormSurface`].
//!
//! EXPAND → VERIFY-EXPANDED → FILL → SAVE → VERIFY-SAVED, with every unit
//! operation going through the [`RetryExecutor`]. Expansion is recovered by
//! trying each of the stage's expand strategies with its own attempt budget.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::error::{FailureKind, OperationError, StageFailure, SurfaceError};
use crate::resolver::{ResolutionResult, resolve};
use crate::retry::{RetryDecision, RetryExecutor};
use crate::surface::{FormSurface, SectionHandle};

use super::stage::{FieldOperation, Stage};
use super::state::{StageEvent, StageMachine, StageProgress, StageState};

/// Bounded waits used while driving a stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    /// How long readiness evidence may take to appear after an expand command.
    #[serde(default = "default_expand_timeout_secs")]
    pub expand_timeout_secs: f64,
    #[serde(default = "default_save_timeout_secs")]
    pub save_timeout_secs: f64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_expand_timeout_secs() -> f64 {
    10.0
}

fn default_save_timeout_secs() -> f64 {
    10.0
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for StageTimings {
    fn default() -> Self {
        Self {
            expand_timeout_secs: default_expand_timeout_secs(),
            save_timeout_secs: default_save_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl StageTimings {
    fn expand_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.expand_timeout_secs.max(0.0))
    }

    fn save_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.save_timeout_secs.max(0.0))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// A resolved option field, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResolution {
    pub field_id: String,
    pub desired: String,
    #[serde(flatten)]
    pub result: ResolutionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub final_state: StageState,
    pub history: Vec<StageState>,
    pub resolutions: Vec<FieldResolution>,
    /// Expand commands issued for this stage during the run.
    pub expand_calls: u32,
}

/// Report plus the failure that ended the stage, if any.
#[derive(Debug, Clone)]
pub struct StageRun {
    pub report: StageReport,
    pub failure: Option<StageFailure>,
}

impl StageRun {
    pub fn is_saved(&self) -> bool {
        self.report.final_state == StageState::Saved
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StageRunner {
    retry: RetryExecutor,
    timings: StageTimings,
}

struct Driving {
    progress: StageProgress,
    resolutions: Vec<FieldResolution>,
    expand_calls: u32,
}

impl Driving {
    fn advance(&mut self, event: StageEvent) {
        match StageMachine::next(&mut self.progress, event) {
            Ok(state) => debug!(stage = %self.progress.stage, ?event, %state, "stage transition"),
            Err(e) => error!(stage = %self.progress.stage, %e, "stage machine rejected event"),
        }
    }
}

impl StageRunner {
    pub fn new(retry: RetryExecutor, timings: StageTimings) -> Self {
        Self { retry, timings }
    }

    /// Drives `stage` to SAVED or FAILED.
    pub async fn run<S: FormSurface>(&self, surface: &S, stage: &Stage) -> StageRun {
        let mut driving = Driving {
            progress: StageProgress::new(&stage.name),
            resolutions: Vec::new(),
            expand_calls: 0,
        };

        let result = self.drive(surface, stage, &mut driving).await;
        if result.is_err() {
            driving.advance(StageEvent::Abandoned);
        }

        let report = StageReport {
            stage: stage.name.clone(),
            final_state: driving.progress.state,
            history: driving.progress.history,
            resolutions: driving.resolutions,
            expand_calls: driving.expand_calls,
        };
        StageRun {
            report,
            failure: result.err(),
        }
    }

    async fn drive<S: FormSurface>(
        &self,
        surface: &S,
        stage: &Stage,
        driving: &mut Driving,
    ) -> Result<(), StageFailure> {
        let handle = self.open(surface, stage, driving).await?;

        driving.advance(StageEvent::FillStarted);
        for operation in &stage.operations {
            self.retry.pacing().pause().await;
            if let Some(resolution) = self.apply(surface, operation).await? {
                driving.resolutions.push(resolution);
            }
        }

        self.save(surface, stage, &handle).await?;
        driving.advance(StageEvent::SaveConfirmed);
        info!(stage = %stage.name, "stage saved");
        Ok(())
    }

    /// Locates the section and brings it to EXPANDED_VERIFIED.
    async fn open<S: FormSurface>(
        &self,
        surface: &S,
        stage: &Stage,
        driving: &mut Driving,
    ) -> Result<SectionHandle, StageFailure> {
        let title = stage.base_title.as_str();
        let handle = self
            .retry
            .run(&format!("locate {title}"), move || async move {
                surface
                    .locate_by_title(title)
                    .await
                    .map_err(OperationError::from)
            })
            .await?;

        if matches!(self.is_ready(surface, &handle, stage).await, Ok(true)) {
            debug!(stage = %stage.name, "stage already open, skipping expand");
            driving.advance(StageEvent::FoundOpen);
            return Ok(handle);
        }

        let mut last_failure = None;
        for &strategy in &stage.expand_strategies {
            let mut attempts = self.retry.attempts(format!("expand {title} via {strategy}"));
            loop {
                let attempt = attempts.begin();
                driving.advance(StageEvent::ExpandIssued);
                driving.expand_calls += 1;

                let cause = match surface.expand(&handle, strategy).await {
                    Err(e) => {
                        driving.advance(StageEvent::ExpandRaised);
                        OperationError::from(e)
                    }
                    Ok(()) => {
                        driving.advance(StageEvent::ExpandReturned);
                        if self.await_ready(surface, &handle, stage).await {
                            driving.advance(StageEvent::Verified);
                            return Ok(handle);
                        }
                        driving.advance(StageEvent::VerifyTimedOut);
                        OperationError::from(SurfaceError::NotReady(format!(
                            "{title} not open within {}s",
                            self.timings.expand_timeout_secs
                        )))
                    }
                };

                match attempts.record_failure(cause) {
                    RetryDecision::Retry {
                        lower_secs,
                        upper_secs,
                    } => {
                        warn!(stage = %stage.name, %strategy, attempt, "expand not verified, retrying");
                        self.retry.back_off(lower_secs, upper_secs).await;
                    }
                    RetryDecision::GiveUp(failure) => {
                        warn!(stage = %stage.name, %strategy, %failure, "expand strategy exhausted");
                        last_failure = Some(failure);
                        break;
                    }
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| StageFailure {
            operation: format!("expand {title}"),
            attempts: 0,
            kind: FailureKind::Terminal,
            cause: SurfaceError::NotFound(format!("no expand strategy for {title}")).into(),
        }))
    }

    /// Readiness evidence: expanded, and every ready marker present.
    async fn is_ready<S: FormSurface>(
        &self,
        surface: &S,
        handle: &SectionHandle,
        stage: &Stage,
    ) -> Result<bool, SurfaceError> {
        if !surface.is_expanded(handle).await? {
            return Ok(false);
        }
        for marker in &stage.ready_markers {
            if !surface.has_control(handle, marker).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Polls readiness until it holds or the expand timeout elapses.
    async fn await_ready<S: FormSurface>(
        &self,
        surface: &S,
        handle: &SectionHandle,
        stage: &Stage,
    ) -> bool {
        let deadline = Instant::now() + self.timings.expand_timeout();
        loop {
            match self.is_ready(surface, handle, stage).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!(stage = %stage.name, %e, "readiness probe failed"),
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.timings.poll_interval()).await;
        }
    }

    async fn apply<S: FormSurface>(
        &self,
        surface: &S,
        operation: &FieldOperation,
    ) -> Result<Option<FieldResolution>, StageFailure> {
        let name = operation.describe();
        match operation {
            FieldOperation::SetLiteral { field_id, value } => {
                let (field_id, value) = (field_id.as_str(), value.as_str());
                self.retry
                    .run(&name, move || async move {
                        surface
                            .set_field(field_id, value)
                            .await
                            .map_err(OperationError::from)
                    })
                    .await?;
                Ok(None)
            }
            FieldOperation::SetFromOptions {
                field_id,
                desired,
                fallback,
            } => {
                let (field_id, wanted, fallback) =
                    (field_id.as_str(), desired.as_str(), fallback.as_deref());
                let result = self
                    .retry
                    .run(&name, move || async move {
                        let options = surface.read_options(field_id).await?;
                        let resolved = resolve(wanted, &options, fallback)?;
                        surface.select_option(field_id, &resolved.value).await?;
                        Ok::<_, OperationError>(resolved)
                    })
                    .await?;
                debug!(field = field_id, value = %result.value, tier = %result.tier, "option resolved");
                Ok(Some(FieldResolution {
                    field_id: field_id.to_string(),
                    desired: desired.clone(),
                    result,
                }))
            }
            FieldOperation::UploadMedia { field_id, files } => {
                let (field_id, files) = (field_id.as_str(), files.as_slice());
                self.retry
                    .run(&name, move || async move {
                        surface
                            .upload(field_id, files)
                            .await
                            .map_err(OperationError::from)
                    })
                    .await?;
                Ok(None)
            }
        }
    }

    /// Save and its confirmation are retried as one unit.
    async fn save<S: FormSurface>(
        &self,
        surface: &S,
        stage: &Stage,
        handle: &SectionHandle,
    ) -> Result<(), StageFailure> {
        let timeout = self.timings.save_timeout();
        self.retry
            .run(&format!("save {}", stage.name), move || async move {
                surface.save(handle).await?;
                surface.wait_for_save_confirmation(handle, timeout).await?;
                Ok::<_, OperationError>(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::PacingPolicy;
    use crate::resolver::ResolutionTier;
    use crate::retry::RetryPolicy;
    use crate::state_machine::stage::{ExpandStrategy, FieldSpec, StageDefinition};
    use crate::surface::{ScriptedSection, ScriptedSurface};
    use crate::work_item::WorkItem;

    fn runner(max_attempts: u32) -> StageRunner {
        StageRunner::new(
            RetryExecutor::new(
                RetryPolicy {
                    max_attempts,
                    backoff_min_secs: 0.0,
                    backoff_max_secs: 0.0,
                },
                PacingPolicy::immediate(),
            ),
            StageTimings {
                expand_timeout_secs: 0.02,
                save_timeout_secs: 0.02,
                poll_interval_ms: 5,
            },
        )
    }

    fn description_stage() -> Stage {
        let item = WorkItem::new("NKL1234")
            .with_attribute("color", "Rose Gold")
            .with_attribute("plating", "Unknown Finish");
        StageDefinition::new("Product Description")
            .field(FieldSpec::literal("model_number", "{key}"))
            .field(FieldSpec::options("color", "{color}"))
            .field(FieldSpec::options_or("plating", "{plating}", "Gold"))
            .ready_marker("model_number")
            .bind(&item, &[])
            .unwrap()
    }

    fn surface_with(section: ScriptedSection) -> ScriptedSurface {
        ScriptedSurface::new()
            .section(section)
            .options("color", &["Gold", "Silver", "Rose-Gold"])
            .options("plating", &["Gold", "Silver"])
    }

    #[tokio::test]
    async fn collapsed_stage_is_expanded_filled_and_saved() {
        let surface = surface_with(
            ScriptedSection::new("Product Description (0/3)").controls(&["model_number"]),
        );
        let run = runner(3).run(&surface, &description_stage()).await;

        assert!(run.is_saved(), "{:?}", run.failure);
        assert_eq!(
            run.report.history,
            vec![
                StageState::Collapsed,
                StageState::Expanding,
                StageState::ExpandedUnverified,
                StageState::ExpandedVerified,
                StageState::Filling,
            ]
        );
        assert_eq!(run.report.expand_calls, 1);
        assert_eq!(surface.value("model_number").as_deref(), Some("NKL1234"));
        assert_eq!(surface.value("color").as_deref(), Some("Rose-Gold"));
        assert_eq!(surface.value("plating").as_deref(), Some("Gold"));

        let tiers: Vec<_> = run.report.resolutions.iter().map(|r| r.result.tier).collect();
        assert_eq!(tiers, vec![ResolutionTier::Normalized, ResolutionTier::Fallback]);
        assert_eq!(surface.save_calls("Product Description"), 1);
    }

    #[tokio::test]
    async fn already_open_stage_is_never_expanded() {
        let surface = surface_with(
            ScriptedSection::new("Product Description")
                .expanded()
                .controls(&["model_number"]),
        );
        let run = runner(3).run(&surface, &description_stage()).await;

        assert!(run.is_saved());
        assert_eq!(run.report.expand_calls, 0);
        assert_eq!(surface.expand_calls("Product Description"), 0);
        assert_eq!(
            run.report.history,
            vec![
                StageState::Collapsed,
                StageState::ExpandedVerified,
                StageState::Filling,
            ]
        );
    }

    #[tokio::test]
    async fn falls_back_to_second_strategy() {
        let surface = surface_with(
            ScriptedSection::new("Product Description")
                .controls(&["model_number"])
                .opens_with(&[ExpandStrategy::CardClick]),
        );
        let run = runner(2).run(&surface, &description_stage()).await;

        assert!(run.is_saved());
        // two failed edit-control attempts, then the card click
        assert_eq!(run.report.expand_calls, 3);
        assert_eq!(surface.expand_calls("Product Description"), 3);
    }

    #[tokio::test]
    async fn never_expanding_stage_fails_after_all_strategies() {
        let surface = surface_with(
            ScriptedSection::new("Product Description")
                .controls(&["model_number"])
                .opens_with(&[]),
        );
        let run = runner(2).run(&surface, &description_stage()).await;

        assert_eq!(run.report.final_state, StageState::Failed);
        assert_eq!(run.report.expand_calls, 4);
        let failure = run.failure.unwrap();
        assert_eq!(failure.operation, "expand Product Description via card-click");
        assert_eq!(failure.kind, FailureKind::Retriable);
        assert!(surface.value("model_number").is_none());
        assert_eq!(surface.save_calls("Product Description"), 0);
    }

    #[tokio::test]
    async fn expanded_without_markers_is_not_verified() {
        let surface = surface_with(ScriptedSection::new("Product Description").expanded());
        let run = runner(1).run(&surface, &description_stage()).await;

        assert_eq!(run.report.final_state, StageState::Failed);
        assert_eq!(run.report.expand_calls, 2);
    }

    #[tokio::test]
    async fn transient_field_failures_are_absorbed() {
        let surface = surface_with(
            ScriptedSection::new("Product Description").controls(&["model_number"]),
        )
        .fail_next("set:model_number", SurfaceError::NotReady("stale".into()), 2);
        let run = runner(3).run(&surface, &description_stage()).await;

        assert!(run.is_saved());
        assert_eq!(surface.value("model_number").as_deref(), Some("NKL1234"));
    }

    #[tokio::test]
    async fn empty_option_set_fails_terminally() {
        let surface = ScriptedSurface::new()
            .section(ScriptedSection::new("Product Description").controls(&["model_number"]))
            .options("color", &[])
            .options("plating", &["Gold"]);
        let run = runner(3).run(&surface, &description_stage()).await;

        assert_eq!(run.report.final_state, StageState::Failed);
        let failure = run.failure.unwrap();
        assert_eq!(failure.operation, "choose color");
        assert_eq!(failure.attempts, 1);
        assert_eq!(failure.kind, FailureKind::Terminal);
    }

    #[tokio::test]
    async fn unconfirmed_save_is_retried_then_fails() {
        let surface = surface_with(
            ScriptedSection::new("Product Description")
                .controls(&["model_number"])
                .unconfirmed_save(),
        );
        let run = runner(2).run(&surface, &description_stage()).await;

        assert_eq!(run.report.final_state, StageState::Failed);
        assert_eq!(surface.save_calls("Product Description"), 2);
        assert_eq!(run.failure.unwrap().operation, "save Product Description");
    }

    #[tokio::test]
    async fn missing_section_is_terminal() {
        let surface = ScriptedSurface::new();
        let run = runner(3).run(&surface, &description_stage()).await;

        let failure = run.failure.unwrap();
        assert_eq!(failure.operation, "locate Product Description");
        assert_eq!(failure.attempts, 1);
        assert_eq!(run.report.history, vec![StageState::Collapsed]);
    }
}
