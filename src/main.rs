mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use cli::{Cli, Command};
use listwright::config::AppConfig;
use listwright::ledger::{Archiver, CompletionLedger, NoopArchiver};
use listwright::media::MediaLibrary;
use listwright::orchestrator::{CancelFlag, RunOutcome, WorkflowOrchestrator};
use listwright::pacing::PacingPolicy;
use listwright::retry::RetryExecutor;
use listwright::state_machine::StageRunner;
use listwright::surface::webdriver::WebDriverClient;
use listwright::surface::{ScriptedSurface, WebDriverSurface};
use listwright::target::Target;
use listwright::ui::{self, RunProgress};
use listwright::work_item::{WorkItem, sample_necklace};
use listwright::{logging, resolver};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }

    match cli.command {
        Command::Run { item, target, json } => {
            let item = WorkItem::load(&item)?;
            let outcomes = run_item(&config, &item, &target.targets(), json).await?;
            if outcomes.iter().any(RunOutcome::is_failure) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Status { key } => {
            let ledger = open_ledger(&config, NoopArchiver)?;
            ui::print_status(&key, &ledger.status(&key)?);
        }
        Command::Register { key } => {
            let ledger = open_ledger(&config, NoopArchiver)?;
            let record = ledger.ensure_registered(&key)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Mark { key, target } => {
            let ledger = open_ledger(&config, media_library(&config))?;
            for target in target.targets() {
                let outcome = ledger.mark_complete(&key, target)?;
                info!(item = %key, %target, changed = outcome.changed, "marked");
            }
            ui::print_status(&key, &ledger.status(&key)?);
        }
        Command::Resolve {
            value,
            options,
            fallback,
        } => {
            let result = resolver::resolve(&value, &options, fallback.as_deref())?;
            ui::print_resolution(&value, &result);
        }
        Command::Demo => demo(&config).await?,
    }

    Ok(ExitCode::SUCCESS)
}

fn open_ledger(
    config: &AppConfig,
    archiver: impl Archiver + 'static,
) -> Result<CompletionLedger> {
    CompletionLedger::open(&config.ledger_path, &config.archive_ledger_path, archiver)
        .with_context(|| format!("failed to open ledger {}", config.ledger_path.display()))
}

fn media_library(config: &AppConfig) -> MediaLibrary {
    MediaLibrary::new(&config.media_root, &config.archive_root)
}

fn stage_runner(config: &AppConfig, pacing: PacingPolicy) -> StageRunner {
    StageRunner::new(RetryExecutor::new(config.retry, pacing), config.stage)
}

/// Cancels the returned flag on Ctrl-C; the current stage finishes first.
fn cancel_on_interrupt() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current stage");
            flag.cancel();
        }
    });
    cancel
}

async fn run_item(
    config: &AppConfig,
    item: &WorkItem,
    targets: &[Target],
    json: bool,
) -> Result<Vec<RunOutcome>> {
    let media = media_library(config);
    let ledger = Arc::new(open_ledger(config, media.clone())?);
    let pacing = PacingPolicy::new(config.pacing);
    let orchestrator =
        WorkflowOrchestrator::new(stage_runner(config, pacing), ledger, Arc::new(media));
    let cancel = cancel_on_interrupt();

    let mut outcomes = Vec::new();
    for &target in targets {
        if cancel.is_cancelled() {
            break;
        }
        let client = WebDriverClient::connect(&config.webdriver.url, config.webdriver.capabilities.clone())
            .await
            .with_context(|| format!("failed to start a WebDriver session at {}", config.webdriver.url))?;
        let mut surface = WebDriverSurface::new(client, config.webdriver.selectors.clone(), pacing)
            .with_poll_interval(Duration::from_millis(config.stage.poll_interval_ms));
        if let Some(url) = config.start_url(target) {
            surface
                .open(url)
                .await
                .with_context(|| format!("failed to open {url}"))?;
        }

        let progress = RunProgress::start(&item.key, target);
        let result = orchestrator
            .run_all_variants(&mut surface, item, target, &cancel)
            .await;
        if let Err(e) = surface.close().await {
            warn!(%target, %e, "failed to close WebDriver session");
        }
        for outcome in result? {
            progress.complete(&outcome);
            if json {
                progress.print_outcome(&outcome);
            }
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

/// Lists the sample item on every target against scripted forms, using a
/// scratch ledger and media folder.
async fn demo(config: &AppConfig) -> Result<()> {
    let scratch = std::env::temp_dir().join(format!("listwright-demo-{}", uuid::Uuid::new_v4()));
    let item = sample_necklace();
    seed_media(&scratch.join("images").join(item.media_bundle()))?;

    let media = MediaLibrary::new(scratch.join("images"), scratch.join("listing_done"));
    let ledger = CompletionLedger::open(
        scratch.join("ledger.json"),
        scratch.join("ledger_archived.json"),
        media.clone(),
    )?;
    let orchestrator = WorkflowOrchestrator::new(
        stage_runner(config, PacingPolicy::immediate()),
        Arc::new(ledger),
        Arc::new(media),
    );
    let cancel = CancelFlag::new();

    for target in Target::ALL {
        let progress = RunProgress::start(&item.key, target);
        let mut surface = ScriptedSurface::for_stages(&target.stages(), &item);
        let outcome = orchestrator.run(&mut surface, &item, target, &cancel).await?;
        progress.complete(&outcome);
    }

    ui::print_status(&item.key, &orchestrator.ledger().status(&item.key)?);
    println!("scratch files left in {}", scratch.display());
    Ok(())
}

fn seed_media(folder: &Path) -> Result<()> {
    std::fs::create_dir_all(folder)
        .with_context(|| format!("failed to create {}", folder.display()))?;
    for name in ["1_front.jpg", "2_side.jpg"] {
        std::fs::write(folder.join(name), b"demo")
            .with_context(|| format!("failed to write {name}"))?;
    }
    Ok(())
}
