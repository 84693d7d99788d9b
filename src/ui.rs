//! Terminal output: a spinner while a run is in flight and a colored summary.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::ledger::LedgerEntry;
use crate::orchestrator::{RunOutcome, RunStatus};
use crate::resolver::ResolutionResult;
use crate::target::Target;

/// Spinner for one (work-item, target) run.
pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl RunProgress {
    pub fn start(item_key: &str, target: Target) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(format!("{target}: {item_key}"));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn complete(&self, outcome: &RunOutcome) {
        self.pb.finish_and_clear();
        let label = format!("{} on {}", outcome.item_key, outcome.target);
        match outcome.status {
            RunStatus::Completed => {
                let archived = if outcome.archived { " (archived)" } else { "" };
                println!(
                    "  {} {label} listed in {} ms{archived}",
                    self.green.apply_to("✓"),
                    outcome.duration_ms
                );
            }
            RunStatus::Skipped => {
                println!("  {} {label} already listed", self.yellow.apply_to("↻"));
            }
            RunStatus::Cancelled => {
                println!("  {} {label} cancelled", self.yellow.apply_to("↻"));
            }
            RunStatus::Failed => {
                let stage = outcome.failed_stage.as_deref().unwrap_or("setup");
                let cause = outcome.cause.as_deref().unwrap_or("unknown cause");
                println!(
                    "  {} {label} failed at {stage}: {cause}",
                    self.red.apply_to("✗")
                );
            }
        }
    }

    pub fn print_outcome(&self, outcome: &RunOutcome) {
        let style = match outcome.status {
            RunStatus::Completed => &self.green,
            RunStatus::Failed => &self.red,
            _ => &self.yellow,
        };
        println!();
        println!("{}", style.apply_to("─── Run Outcome ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(outcome).unwrap_or_default()
        );
    }
}

pub fn print_status(item_key: &str, entry: &LedgerEntry) {
    let header = Style::new().cyan().bold();
    println!("{}", header.apply_to(format!("─── {item_key} ───")));
    println!("{}", serde_json::to_string_pretty(entry).unwrap_or_default());
}

pub fn print_resolution(desired: &str, result: &ResolutionResult) {
    let tier = Style::new().cyan();
    match result.score {
        Some(score) => println!(
            "{desired} -> {} [{} {score:.1}]",
            result.value,
            tier.apply_to(result.tier)
        ),
        None => println!("{desired} -> {} [{}]", result.value, tier.apply_to(result.tier)),
    }
}
