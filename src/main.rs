//! cer-engine entry point: CLI wiring over an in-memory back office.

mod cli;

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use cer_engine::allocation::split::split_plant;
use cer_engine::allocation::types::Allocation;
use cer_engine::config::EngineConfig;
use cer_engine::dataset::Dataset;
use cer_engine::engine::{Engine, InMemoryBackend};
use cer_engine::io::export::{export_members_csv, export_shares_csv};
use cer_engine::logging::{self, LogFormat};
use cer_engine::workflow::phase::PhaseRegistry;
use cer_engine::workflow::types::{EntityType, WorkflowKey, WorkflowPatch};

use cli::{Cli, Command};

/// Prints `message` to stderr and exits with status 1.
fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

fn load_registry(cli: &Cli) -> PhaseRegistry {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path).unwrap_or_else(|e| fail(e)),
        None => EngineConfig::builtin(),
    };
    PhaseRegistry::from_config(&config).unwrap_or_else(|errors| {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    })
}

fn load_dataset(cli: &Cli, registry: &PhaseRegistry) -> Dataset {
    let dataset = match (&cli.source.dataset, &cli.source.preset) {
        (Some(path), _) => Dataset::from_toml_file(path),
        (None, Some(name)) => Dataset::from_preset(name),
        (None, None) => Dataset::from_preset("demo"),
    }
    .unwrap_or_else(|e| fail(e));

    let errors = dataset.validate(registry);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    dataset
}

fn print_phases(registry: &PhaseRegistry, entity_type: EntityType) {
    println!("--- {entity_type} phases ---");
    for phase in registry.catalog(entity_type).iter() {
        let prereq = phase
            .prerequisite
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        println!("{:<4} {:<40} requires {}", phase.id, phase.name, prereq);
    }
}

async fn execute(cli: Cli, dataset: Dataset, engine: Engine) {
    match cli.command {
        Command::Phases { entity } => {
            let types = match entity {
                Some(e) => vec![e.into()],
                None => vec![EntityType::Community, EntityType::Plant],
            };
            for t in types {
                print_phases(engine.registry(), t);
            }
            if let Some(rule) = engine.registry().cross_entity() {
                println!(
                    "\ncommunity phase {} waits on plant phase {} of every owned plant",
                    rule.community_phase, rule.plant_phase
                );
            }
        }
        Command::Split { plant, period } => {
            let Some(p) = dataset.plant(&plant) else {
                fail(format!("unknown plant \"{plant}\""));
            };
            let allocation = dataset
                .allocations
                .iter()
                .find(|a| a.plant_id == plant && a.period == period)
                .cloned()
                .unwrap_or_else(|| Allocation::empty(plant.clone(), period.clone()));
            let result = split_plant(p, &allocation).unwrap_or_else(|e| fail(e));
            for (role, share) in result.shares() {
                println!("{role:<9} {:<16} {:>12.3} kWh", share.member, share.kwh);
            }
            println!(
                "E={:.3}  cer={:.3}  contra={:.3}",
                result.totals.e, result.totals.cer, result.totals.contra
            );
        }
        Command::Run {
            community,
            period,
            confirm,
            members_out,
            shares_out,
        } => {
            let report = engine
                .run(&community, &period, confirm)
                .await
                .unwrap_or_else(|e| fail(e));
            println!("{report}");

            if let Some(path) = members_out {
                if let Err(e) = export_members_csv(&report.members, &path) {
                    fail(format!("failed to write CSV: {e}"));
                }
                eprintln!("Member totals written to {}", path.display());
            }
            if let Some(path) = shares_out {
                if let Err(e) = export_shares_csv(&report.plants, &path) {
                    fail(format!("failed to write CSV: {e}"));
                }
                eprintln!("Plant shares written to {}", path.display());
            }
        }
        Command::Advance {
            entity,
            phase,
            to,
            owner,
            due_date,
            notes,
        } => {
            let key = WorkflowKey::new(entity, phase);
            let patch = WorkflowPatch {
                status: None,
                owner,
                due_date,
                notes,
            };
            match engine.advance(&key, to, patch).await {
                Ok(entry) => println!("{key}: {} (updated {})", entry.status, entry.updated_at),
                Err(e) => {
                    error!(kind = %e.kind(), "advance failed");
                    fail(e);
                }
            }
        }
        Command::Overview { entity } => {
            let rows = engine.overview(&entity).await.unwrap_or_else(|e| fail(e));
            println!("--- {entity} ---");
            for row in rows {
                let owner = row
                    .entry
                    .as_ref()
                    .and_then(|e| e.owner.clone())
                    .unwrap_or_default();
                println!("{:<4} {:<40} {:<10} {owner}", row.phase, row.name, row.status);
            }
        }
        #[cfg(feature = "api")]
        Command::Serve { port } => {
            use std::net::SocketAddr;

            let state = Arc::new(cer_engine::api::AppState { engine });
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            if let Err(e) = cer_engine::api::serve(state, addr).await {
                fail(format!("server error: {e}"));
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    if let Err(e) = logging::init(format) {
        eprintln!("warning: logging disabled: {e}");
    }

    let registry = Arc::new(load_registry(&cli));
    let dataset = load_dataset(&cli, &registry);

    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        fail(format!("failed to create tokio runtime: {e}"));
    });
    rt.block_on(async {
        let backend = InMemoryBackend::new();
        if let Err(e) = backend.seed(&dataset).await {
            fail(e);
        }
        let engine = backend.engine(registry);
        execute(cli, dataset, engine).await;
    });
}
