//! `sweep clean`: the full pipeline, interactive by default

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sweep_lib::{
    AuditLogger, DeleteOptions, DeletionConfig, DeletionExecutor, DeletionObserver,
    DeletionOutcome, DeletionReport, DeletionStatus, ResourceKind, ResourceRecord,
    SelectionEngine, SelectionResult, SelectionSet,
};

use super::{print_inventory, GlobalOptions, RunContext};
use crate::output::{
    color_status, format_currency, print_error, print_info, print_success, print_warning,
    Console, OutputFormat, DELETION_WARNINGS,
};
use crate::prompt;

#[derive(Args, Debug, Clone, Default)]
pub struct CleanArgs {
    /// Run everything except the delete calls
    #[arg(long)]
    pub dry_run: bool,

    /// Selection expression (indices like 1,3 or all, inactive, safe, a variant)
    #[arg(long)]
    pub select: Option<String>,

    /// Skip confirmation prompts
    #[arg(long, short)]
    pub yes: bool,

    /// Do not ask the service for a final snapshot before deleting
    #[arg(long)]
    pub skip_final_snapshot: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    pub emit_metrics: bool,
}

/// Prints progress and writes audit events for each deletion
struct ConsoleObserver {
    audit: AuditLogger,
    kind: ResourceKind,
    dry_run: bool,
    verbose_output: bool,
}

impl DeletionObserver for ConsoleObserver {
    fn on_intent(&self, record: &ResourceRecord, position: usize, total: usize) {
        self.audit
            .log_intent(&record.id, &record.region, record.monthly_cost_estimate);
        if !self.verbose_output {
            return;
        }

        println!();
        println!(
            "[{}/{}] Processing {}: {}",
            position,
            total,
            self.kind.noun(),
            record.id.bold()
        );
        println!(
            "  Variant: {}, Region: {}, Cost: {}/month",
            record.variant().unwrap_or("-"),
            record.region,
            format_currency(record.monthly_cost_estimate)
        );
        for warning in record.risk.warnings.iter().take(DELETION_WARNINGS) {
            println!("  {}", format!("⚠ {}", warning).yellow());
        }
    }

    fn on_outcome(&self, outcome: &DeletionOutcome) {
        self.audit.log_outcome(outcome);
        if !self.verbose_output {
            return;
        }

        let status = color_status(outcome.status, self.dry_run);
        match (&outcome.status, &outcome.error) {
            (DeletionStatus::Failed, Some(error)) => {
                println!("  {} {} {}: {}", "✗".red(), status, outcome.id, error)
            }
            _ => println!("  {} {} {}", "✓".green(), status, outcome.id),
        }
    }
}

/// Run the full pipeline
pub async fn run(options: &GlobalOptions, args: CleanArgs) -> Result<()> {
    let ctx = RunContext::open(options)?;
    let table = ctx.format == OutputFormat::Table;
    let noun = ctx.kind.noun();
    let console = Console::new(ctx.format);
    let audit = AuditLogger::new(ctx.session.account_id.clone(), ctx.kind, args.dry_run);

    if table && args.dry_run {
        print_info("Running in DRY RUN mode - no actual deletions will be performed");
    }

    let (_, inventory) = ctx.inventory(&audit).await?;
    let engine = SelectionEngine::new(ctx.kind, &inventory.records);
    if table {
        print_inventory(&inventory, &engine);
    }

    if inventory.is_empty() {
        return finish(&ctx.metrics, &args);
    }

    let interactive = !args.yes && args.select.is_none();
    if interactive {
        if !args.dry_run {
            console.warning("Deletion cannot be undone (except from snapshots)!");
        }
        let question = if args.dry_run {
            "Do you want to see what would be deleted?"
        } else {
            "Do you want to proceed with selection?"
        };
        if prompt::confirm(console, question).await? != Some(true) {
            console.info("Operation cancelled.");
            return finish(&ctx.metrics, &args);
        }
    }

    let Some(selection) = resolve_selection(console, &engine, args.select.as_deref()).await? else {
        console.info("Operation cancelled.");
        return finish(&ctx.metrics, &args);
    };
    if selection.is_empty() {
        console.info(&format!("No {}s selected. Exiting.", noun));
        return finish(&ctx.metrics, &args);
    }

    let final_snapshot = match final_snapshot(console, &args).await? {
        Some(value) => value,
        None => {
            console.info("Operation cancelled.");
            return finish(&ctx.metrics, &args);
        }
    };

    let summary = engine.summarize(&selection);
    if table || !args.yes {
        console.line("");
        let heading = if args.dry_run {
            "DRY RUN CONFIRMATION"
        } else {
            "FINAL CONFIRMATION"
        };
        console.line(&heading.red().bold().to_string());
        console.line(&format!("Selected {}s: {}", noun, summary.count.to_string().yellow()));
        console.line(&format!("Monthly savings: {}", format_currency(summary.monthly_cost).green()));
        console.line(&format!("Annual savings: {}", format_currency(summary.annual_cost).green()));
        if !args.dry_run {
            let snapshot_text = if final_snapshot {
                "WITH final snapshots"
            } else {
                "WITHOUT final snapshots"
            };
            console.line(&format!("Final snapshots: {}", snapshot_text.yellow()));
        }
    }

    if !args.yes {
        let question = if args.dry_run {
            "Proceed with analysis?".to_string()
        } else {
            format!("Are you absolutely sure you want to delete these {}s?", noun)
        };
        if prompt::confirm(console, &question).await? != Some(true) {
            console.info("Operation cancelled by user.");
            return finish(&ctx.metrics, &args);
        }
    }

    let config = DeletionConfig::from_pipeline(&ctx.config, args.dry_run)
        .with_options(DeleteOptions { final_snapshot });
    let cancel = Arc::new(AtomicBool::new(false));
    let executor = DeletionExecutor::new(ctx.provider.clone(), ctx.session.clone(), config)
        .with_cancellation(Arc::clone(&cancel));

    // Ctrl-C during deletion stops before the next item
    let watcher = tokio::spawn({
        let cancel = Arc::clone(&cancel);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
            }
        }
    });

    if table {
        println!();
        let banner = if args.dry_run {
            format!("DRY RUN - DELETING {}S", noun.to_uppercase())
        } else {
            format!("DELETING {}S - THIS CANNOT BE UNDONE!", noun.to_uppercase())
        };
        println!("{}", "=".repeat(70).red());
        println!("{}", banner.red());
        println!("{}", "=".repeat(70).red());
    }

    let observer = ConsoleObserver {
        audit: audit.clone(),
        kind: ctx.kind,
        dry_run: args.dry_run,
        verbose_output: table,
    };
    let report = executor
        .execute(&engine.targets(&selection), &observer)
        .await;
    watcher.abort();

    audit.log_summary(
        report.removed_count,
        report.failed_count,
        report.monthly_savings,
        report.cancelled,
    );

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_report(&report, noun, selection.len(), final_snapshot),
    }

    finish(&ctx.metrics, &args)
}

/// Selection from `--select`, or interactively; `None` when cancelled
async fn resolve_selection(
    console: Console,
    engine: &SelectionEngine<'_>,
    preset: Option<&str>,
) -> Result<Option<SelectionSet>> {
    match preset {
        Some(expression) => match engine.parse_selection(expression) {
            SelectionResult::Selected(selection) => Ok(Some(selection)),
            SelectionResult::Cancelled => Ok(None),
            SelectionResult::Retry(reason) => {
                bail!("Invalid selection '{}': {}", expression, reason)
            }
        },
        None => prompt::select(console, engine).await,
    }
}

/// Whether to request final snapshots; `None` when interrupted
async fn final_snapshot(console: Console, args: &CleanArgs) -> Result<Option<bool>> {
    if args.dry_run {
        return Ok(Some(false));
    }
    if args.skip_final_snapshot || args.yes {
        return Ok(Some(!args.skip_final_snapshot));
    }

    console.line("");
    console.line(&"FINAL SNAPSHOT OPTION".yellow().to_string());
    console.line("A final snapshot can be taken before deletion for backup purposes.");
    console.line("This costs extra storage but allows recovery if needed.");
    let skip = prompt::confirm(console, "Skip final snapshot? (not recommended for production)").await?;
    Ok(skip.map(|skip| !skip))
}

fn print_report(report: &DeletionReport, noun: &str, selected: usize, final_snapshot: bool) {
    println!();
    let heading = if report.dry_run {
        "DRY RUN DELETION SUMMARY"
    } else {
        "DELETION SUMMARY"
    };
    println!("{}", heading.bold());
    println!("{}", "=".repeat(50).blue());

    let verb = if report.dry_run {
        "would be deleted"
    } else {
        "deleted"
    };
    print_success(&format!(
        "Successfully {}: {} {}s",
        verb, report.removed_count, noun
    ));
    if report.failed_count > 0 {
        print_error(&format!("Failed: {} {}s", report.failed_count, noun));
        for failure in report.failures() {
            println!(
                "  {} ({}): {}",
                failure.id,
                failure.region,
                failure.error.as_deref().unwrap_or("unknown error").red()
            );
        }
    } else {
        println!("Failed: {}", format!("0 {}s", noun).green());
    }
    println!(
        "Estimated monthly savings: {}",
        format_currency(report.monthly_savings).green()
    );
    println!(
        "Estimated annual savings: {}",
        format_currency(report.annual_savings).green()
    );

    if report.cancelled {
        print_warning(&format!(
            "Interrupted: {} of {} selected {}s processed",
            report.outcomes.len(),
            selected,
            noun
        ));
    }
    if !report.dry_run && report.removed_count > 0 {
        println!();
        print_info("Deletion may take several minutes to complete on the provider side.");
        if final_snapshot {
            print_info("Final snapshots are being created for backup purposes.");
        }
    }
}

fn finish(metrics: &sweep_lib::SweepMetrics, args: &CleanArgs) -> Result<()> {
    if args.emit_metrics {
        eprint!("{}", metrics.render());
    }
    Ok(())
}
