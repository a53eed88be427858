//! `sweep scan`: inventory without deleting anything

use anyhow::Result;
use serde::Serialize;
use sweep_lib::{AuditLogger, Inventory, RegionObservation, SelectionEngine};

use super::{print_inventory, GlobalOptions, InventorySummary, RunContext};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct ScanReport<'a> {
    account_id: &'a str,
    regions: &'a [RegionObservation],
    summary: InventorySummary,
    inventory: &'a Inventory,
}

/// Probe, collect and report
pub async fn run(options: &GlobalOptions) -> Result<()> {
    let ctx = RunContext::open(options)?;
    let audit = AuditLogger::new(ctx.session.account_id.clone(), ctx.kind, true);
    let (probe, inventory) = ctx.inventory(&audit).await?;

    match ctx.format {
        OutputFormat::Json => {
            let report = ScanReport {
                account_id: &ctx.session.account_id,
                regions: &probe.observations,
                summary: InventorySummary::of(&inventory),
                inventory: &inventory,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            let engine = SelectionEngine::new(ctx.kind, &inventory.records);
            print_inventory(&inventory, &engine);
        }
    }

    Ok(())
}
