use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use cer_engine::ids::{CommunityId, Period, PhaseId, PlantId};
use cer_engine::workflow::types::{EntityRef, EntityType, Status};

/// Energy allocation and phased workflow for renewable energy communities.
#[derive(Debug, Parser)]
#[command(name = "cer-engine", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub source: Source,

    /// Engine configuration (phase catalogs); built-in catalogs if omitted
    #[arg(long, global = true, env = "CER_ENGINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the plants, allocations, documents and workflow entries come from.
#[derive(Debug, Args)]
pub struct Source {
    /// Dataset TOML file
    #[arg(long, global = true, conflicts_with = "preset")]
    pub dataset: Option<PathBuf>,

    /// Built-in dataset (demo, empty); `demo` if no dataset is given
    #[arg(long, global = true)]
    pub preset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityArg {
    Community,
    Plant,
}

impl From<EntityArg> for EntityType {
    fn from(arg: EntityArg) -> Self {
        match arg {
            EntityArg::Community => EntityType::Community,
            EntityArg::Plant => EntityType::Plant,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the phase catalogs
    Phases {
        /// Only this entity type's catalog
        #[arg(long, value_enum)]
        entity: Option<EntityArg>,
    },
    /// Split one plant's shared energy for a period
    Split {
        #[arg(long)]
        plant: PlantId,
        #[arg(long)]
        period: Period,
    },
    /// Split and aggregate every plant of a community
    Run {
        #[arg(long)]
        community: CommunityId,
        #[arg(long)]
        period: Period,
        /// Write results back onto the allocation records
        #[arg(long)]
        confirm: bool,
        /// Export member totals to CSV
        #[arg(long)]
        members_out: Option<PathBuf>,
        /// Export per-plant shares to CSV
        #[arg(long)]
        shares_out: Option<PathBuf>,
    },
    /// Request a workflow transition
    Advance {
        /// `community:<id>` or `plant:<id>`
        #[arg(long)]
        entity: EntityRef,
        #[arg(long)]
        phase: PhaseId,
        /// todo, in-review or done
        #[arg(long)]
        to: Status,
        #[arg(long)]
        owner: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        due_date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show every phase of an entity with its status
    Overview {
        /// `community:<id>` or `plant:<id>`
        #[arg(long)]
        entity: EntityRef,
    },
    /// Serve the REST API over the loaded dataset
    #[cfg(feature = "api")]
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}
