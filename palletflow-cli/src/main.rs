//! PalletFlow CLI - Command-line interface
//!
//! This binary provides a command-line interface to the PalletFlow library:
//! a standalone pallet calculator over a JSON carton list, and a demo mode
//! that runs the full pipeline against an in-memory store.

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use palletflow::calculator::plan_pallets;
use palletflow::config::PipelineConfig;
use palletflow::logging::{default_log_dir, default_log_file, init_logging};
use palletflow::model::{ItemCapacities, ItemId, PackingUnit, RequestKind, ShipmentId, ShipmentRecord};
use palletflow::service::PalletPipeline;
use palletflow::store::InMemoryStore;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "palletflow")]
#[command(version = palletflow::VERSION)]
#[command(about = "Plan outbound shipments onto pallets", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pallet calculator over a JSON carton list and print the
    /// resulting pallet breakdown
    Plan {
        /// Input JSON file: {"cartons": [...], "units_per_pallet": {...}}
        #[arg(long)]
        input: String,
    },
    /// Seed an in-memory warehouse and run full pipeline cycles against it
    Demo {
        /// Number of eligible shipments to seed
        #[arg(long, default_value = "12")]
        shipments: usize,

        /// Shipments per planning chunk
        #[arg(long, default_value = "5")]
        chunk_size: usize,
    },
}

/// Input document for the `plan` subcommand.
#[derive(Deserialize)]
struct PlanInput {
    /// Cartons to pack.
    cartons: Vec<PackingUnit>,
    /// Units-per-pallet capacity per item; items absent here default to
    /// one carton per pallet.
    #[serde(default)]
    units_per_pallet: HashMap<ItemId, u32>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _guard = match init_logging(default_log_dir(), default_log_file()) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    match args.command {
        Command::Plan { input } => run_plan(&input),
        Command::Demo {
            shipments,
            chunk_size,
        } => run_demo(shipments, chunk_size).await,
    }
}

fn run_plan(input: &str) {
    let raw = match fs::read_to_string(input) {
        Ok(raw) => raw,
        Err(error) => CliError::FileRead {
            path: input.to_string(),
            error,
        }
        .exit(),
    };
    let parsed: PlanInput = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(error) => CliError::InputParse {
            path: input.to_string(),
            error,
        }
        .exit(),
    };

    let capacities: ItemCapacities = parsed.units_per_pallet.into_iter().collect();
    let assignments = plan_pallets(&parsed.cartons, &capacities);

    println!(
        "{} cartons -> {} pallet(s)",
        parsed.cartons.len(),
        assignments.len()
    );
    for (number, assignment) in assignments.iter().enumerate() {
        println!();
        println!(
            "Pallet {} ({:.1}% full, {} cartons):",
            number + 1,
            assignment.usage_percent,
            assignment.total_cartons()
        );
        let mut items: Vec<_> = assignment.item_counts.iter().collect();
        items.sort_by(|a, b| a.0.cmp(b.0));
        for (item_id, cartons) in items {
            println!(
                "  {}: {} carton(s), {} unit(s)",
                item_id,
                cartons,
                assignment.item_quantity(item_id)
            );
        }
    }
}

async fn run_demo(shipments: usize, chunk_size: usize) {
    let config = PipelineConfig::default().with_chunk_size(chunk_size);
    if let Err(msg) = config.validate() {
        CliError::Config(msg).exit();
    }

    let store = Arc::new(InMemoryStore::new());
    store.add_tenant("demo-tenant", true);
    store.set_units_per_pallet("SKU-1", 20);
    store.set_vpn("SKU-1", "VPN-1");

    for i in 0..shipments {
        let id = format!("IF-{:04}", i);
        let mut shipment = ShipmentRecord::new(
            id.clone(),
            format!("Demo order {}", i),
            "demo-tenant",
            RequestKind::PalletRouting,
        );
        shipment.packages_created = true;
        store.add_shipment(shipment);
        let sid = ShipmentId::new(id.clone());
        for c in 0..15 {
            store.add_packing_unit(
                &sid,
                PackingUnit::new("SKU-1", 2, format!("{}-PKG-{}", id, c), format!("{}-PC-{}", id, c)),
            );
        }
    }

    let pipeline = Arc::new(PalletPipeline::new(Arc::clone(&store), config));

    info!(shipments, chunk_size, "Starting demo pipeline");
    println!("Seeded {} shipment(s), running pipeline...", shipments);
    let mut cycle = 0;
    loop {
        cycle += 1;
        let report = match pipeline.run_cycle().await {
            Ok(report) => report,
            Err(e) => CliError::Cycle(e.to_string()).exit(),
        };
        println!(
            "Cycle {}: discovered={} chunks={} busy={} dispatched={}",
            cycle,
            report.discovered,
            report.chunks_submitted,
            report.chunks_busy,
            report.shipments_dispatched
        );
        pipeline.quiesce().await;
        if report.discovered == 0 {
            break;
        }
    }

    let mut complete = 0;
    let mut pallets = 0;
    for shipment in store.all_shipments() {
        if shipment.population_complete {
            complete += 1;
        }
        pallets += store.pallets_for(&shipment.id).len();
    }
    println!();
    println!(
        "Done: {}/{} shipment(s) complete, {} pallet(s) populated",
        complete, shipments, pallets
    );
}
