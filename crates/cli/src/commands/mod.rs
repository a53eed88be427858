//! Subcommand implementations and the setup they share

pub mod clean;
pub mod scan;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use sweep_lib::{
    AuditLogger, CloudProvider, Inventory, InventoryCollector, PipelineConfig, ProbeReport,
    RegionProbe, ResourceKind, SelectionEngine, Session, SnapshotProvider, SweepMetrics,
};
use tabled::Tabled;
use tracing::debug;

use crate::config;
use crate::output::{
    format_currency, print_info, print_table, print_warning, OutputFormat, RecordRow,
};

/// Options shared by every subcommand, after settings are applied
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub profile: Option<String>,
    pub account_file: Option<PathBuf>,
    pub kind: ResourceKind,
    pub format: OutputFormat,
}

/// Account, session and configuration for one run
pub struct RunContext {
    pub provider: Arc<SnapshotProvider>,
    pub session: Session,
    pub config: PipelineConfig,
    pub kind: ResourceKind,
    pub format: OutputFormat,
    pub metrics: SweepMetrics,
}

impl RunContext {
    /// Resolve the account document and session; any failure here is fatal
    pub fn open(options: &GlobalOptions) -> Result<Self> {
        let path = config::account_document_path(
            options.profile.as_deref(),
            options.account_file.as_deref(),
        )?;
        let provider = SnapshotProvider::load(&path)
            .with_context(|| format!("Failed to load account document {}", path.display()))?;
        let session = provider.session(options.profile.clone())?;
        let pipeline = config::load_pipeline_config()?;

        debug!(
            account = %session.account_id,
            profile = %session.profile_name(),
            kind = %options.kind,
            "Run context ready"
        );

        Ok(Self {
            provider: Arc::new(provider),
            session,
            config: pipeline,
            kind: options.kind,
            format: options.format,
            metrics: SweepMetrics::new(),
        })
    }

    fn is_table(&self) -> bool {
        self.format == OutputFormat::Table
    }

    /// Probe regions and collect the inventory
    pub async fn inventory(&self, audit: &AuditLogger) -> Result<(ProbeReport, Inventory)> {
        let candidates = self
            .config
            .candidates_or(self.provider.list_region_candidates(self.kind));

        if self.is_table() {
            print_info(&format!(
                "Checking {} region(s) for {}s...",
                candidates.len(),
                self.kind.noun()
            ));
        }

        let report = RegionProbe::new(self.provider.clone(), self.session.clone())
            .with_timeout(self.config.probe_timeout)
            .observe(self.kind, &candidates)
            .await;

        for observation in &report.observations {
            audit.log_region(observation);
            if self.is_table() {
                match &observation.message {
                    None => println!("  {} {}", "✓".green(), observation.region),
                    Some(reason) => println!(
                        "  {} {} ({})",
                        "✗".red(),
                        observation.region,
                        reason.dimmed()
                    ),
                }
            }
        }

        let regions = report.require_reachable(self.kind)?;
        self.metrics.set_regions_reachable(regions.len());
        if self.is_table() {
            print_info(&format!("Accessible regions: {}", regions.join(", ")));
        }

        let inventory = InventoryCollector::new(
            self.provider.clone(),
            self.session.clone(),
            self.config.clone(),
        )
        .collect(self.kind, &regions)
        .await;

        Ok((report, inventory))
    }
}

/// Row for the per-variant breakdown
#[derive(Tabled)]
struct VariantRow {
    #[tabled(rename = "Variant")]
    variant: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Monthly")]
    monthly: String,
}

/// Print the numbered inventory listing and its totals
pub fn print_inventory(inventory: &Inventory, engine: &SelectionEngine<'_>) {
    let noun = inventory.kind.noun();

    println!();
    println!("{}", format!("{} inventory", capitalize(noun)).bold());
    println!("{}", "=".repeat(70));

    for failure in &inventory.failures {
        print_warning(&format!(
            "Could not scan {}: {}",
            failure.region, failure.reason
        ));
    }

    if inventory.is_empty() {
        println!("{}", format!("No {}s found.", noun).green());
        return;
    }

    let rows: Vec<RecordRow> = engine
        .display_order()
        .iter()
        .enumerate()
        .map(|(i, record)| RecordRow::from_record(i + 1, record))
        .collect();
    print_table(&rows);

    let variants: Vec<VariantRow> = inventory
        .by_variant()
        .into_iter()
        .map(|(variant, breakdown)| VariantRow {
            variant,
            count: breakdown.count,
            monthly: format_currency(breakdown.monthly_cost),
        })
        .collect();
    println!();
    println!("{}", "By variant".bold());
    print_table(&variants);

    println!();
    println!("{}", "Summary".bold());
    println!("{}", "-".repeat(50));
    println!("Total {}s:              {}", noun, inventory.len().to_string().blue());
    println!("With warnings:           {}", inventory.risky_count().to_string().red());
    println!("Inactive:                {}", inventory.inactive_count().to_string().yellow());
    println!(
        "Total monthly cost:      {}",
        format_currency(inventory.total_monthly_cost()).yellow()
    );
    println!(
        "Potential annual savings: {}",
        format_currency(inventory.total_annual_cost()).green()
    );

    let degraded: Vec<_> = inventory
        .records
        .iter()
        .filter(|r| !r.degradations.is_empty())
        .collect();
    if !degraded.is_empty() {
        println!();
        print_warning(&format!(
            "{} {}(s) use default values where data was unavailable:",
            degraded.len(),
            noun
        ));
        for record in degraded {
            for degradation in &record.degradations {
                println!(
                    "  {} [{}] {}",
                    record.id,
                    degradation.step,
                    degradation.reason.dimmed()
                );
            }
        }
    }
}

/// Totals emitted alongside JSON inventories
#[derive(Debug, Serialize)]
pub struct InventorySummary {
    pub total: usize,
    pub risky: usize,
    pub inactive: usize,
    pub degraded: usize,
    pub monthly_cost: f64,
    pub annual_cost: f64,
}

impl InventorySummary {
    pub fn of(inventory: &Inventory) -> Self {
        Self {
            total: inventory.len(),
            risky: inventory.risky_count(),
            inactive: inventory.inactive_count(),
            degraded: inventory.degraded_count(),
            monthly_cost: inventory.total_monthly_cost(),
            annual_cost: inventory.total_annual_cost(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
