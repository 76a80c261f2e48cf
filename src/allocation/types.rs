//! Core allocation types: plants, per-period allocations, and split results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{CommunityId, MemberId, Period, PlantId};

/// Role a member plays in a plant's energy split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Consumer,
    Producer,
    Prosumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Consumer => "consumer",
            Self::Producer => "producer",
            Self::Prosumer => "prosumer",
        };
        f.pad(s)
    }
}

/// Which group receives the non-consumer share of a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Typology {
    /// Benefits split among producers.
    A,
    /// Benefits split among prosumers.
    B,
}

impl Typology {
    /// Parses the registry tag (`"A"` or `"B"`, case-insensitive).
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim() {
            "A" | "a" => Some(Self::A),
            "B" | "b" => Some(Self::B),
            _ => None,
        }
    }

    /// The role that receives `pct_other` under this typology.
    pub fn benefit_role(self) -> Role {
        match self {
            Self::A => Role::Producer,
            Self::B => Role::Prosumer,
        }
    }
}

/// Generation plant as read from the registry.
///
/// `typology` is kept as the raw registry tag; it is parsed when a split is
/// computed so an unrecognized tag surfaces as a typed error there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,
    /// Community owning the plant.
    pub community_id: CommunityId,
    /// Raw typology tag (`A` or `B`).
    pub typology: String,
    /// Percentage of shared energy assigned to consumers.
    pub pct_shared: f64,
    /// Percentage assigned to producers (typology A) or prosumers (typology B).
    pub pct_other: f64,
}

/// One member's weight basis within a role group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub member: MemberId,
    /// Basis for the member's proportional share (kWh).
    pub basis_kwh: f64,
}

impl WeightEntry {
    pub fn new(member: impl Into<MemberId>, basis_kwh: f64) -> Self {
        Self {
            member: member.into(),
            basis_kwh,
        }
    }
}

/// Weight lists for the three role groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub consumers: Vec<WeightEntry>,
    pub producers: Vec<WeightEntry>,
    pub prosumers: Vec<WeightEntry>,
}

impl Weights {
    /// Returns the weight list for `role`.
    pub fn group(&self, role: Role) -> &[WeightEntry] {
        match role {
            Role::Consumer => &self.consumers,
            Role::Producer => &self.producers,
            Role::Prosumer => &self.prosumers,
        }
    }
}

/// Shared energy and member weights of one plant for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub plant_id: PlantId,
    pub period: Period,
    #[serde(default)]
    pub energy_shared_kwh: f64,
    #[serde(default)]
    pub weights: Weights,
    /// Result written back by a confirmed calculation run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<AllocationResult>,
}

impl Allocation {
    /// Record created on first reference to a (plant, period) pair.
    pub fn empty(plant_id: PlantId, period: Period) -> Self {
        Self {
            plant_id,
            period,
            energy_shared_kwh: 0.0,
            weights: Weights::default(),
            confirmed: None,
        }
    }
}

/// A member's computed share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberShare {
    pub member: MemberId,
    pub kwh: f64,
}

/// Energy totals of one split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Energy shared by the plant in the period (kWh).
    #[serde(rename = "E")]
    pub e: f64,
    /// Portion distributed to consumers (kWh).
    pub cer: f64,
    /// Portion distributed to producers or prosumers (kWh).
    pub contra: f64,
}

/// Output of splitting one plant's shared energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub plant_id: PlantId,
    /// Shares of `cer`, proportional to consumer basis.
    pub consumers: Vec<MemberShare>,
    /// Shares of `contra` under typology A; empty otherwise.
    pub producers: Vec<MemberShare>,
    /// Shares of `contra` under typology B; empty otherwise.
    pub prosumers: Vec<MemberShare>,
    pub totals: Totals,
}

impl AllocationResult {
    /// Iterates over every share with its role.
    pub fn shares(&self) -> impl Iterator<Item = (Role, &MemberShare)> {
        let consumers = self.consumers.iter().map(|s| (Role::Consumer, s));
        let producers = self.producers.iter().map(|s| (Role::Producer, s));
        let prosumers = self.prosumers.iter().map(|s| (Role::Prosumer, s));
        consumers.chain(producers).chain(prosumers)
    }

    /// Sum of all member shares (kWh).
    pub fn distributed_kwh(&self) -> f64 {
        self.shares().map(|(_, s)| s.kwh).sum()
    }
}

/// Per-member totals summed across a batch of allocation results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedResult {
    totals: BTreeMap<MemberId, f64>,
}

impl AggregatedResult {
    pub(crate) fn add(&mut self, member: &MemberId, kwh: f64) {
        *self.totals.entry(member.clone()).or_insert(0.0) += kwh;
    }

    /// Total kWh for `member`, if the member appeared in any result.
    pub fn get(&self, member: &MemberId) -> Option<f64> {
        self.totals.get(member).copied()
    }

    /// Members and totals in member-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&MemberId, f64)> {
        self.totals.iter().map(|(m, kwh)| (m, *kwh))
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Sum over all members (kWh).
    pub fn total_kwh(&self) -> f64 {
        self.totals.values().sum()
    }
}

impl fmt::Display for AggregatedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Member totals ---")?;
        for (member, kwh) in self.iter() {
            writeln!(f, "{member:<16} {kwh:>12.3} kWh")?;
        }
        write!(f, "{:<16} {:>12.3} kWh", "TOTAL", self.total_kwh())
    }
}
