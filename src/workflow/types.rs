//! Workflow entities, statuses, and the per-(entity, phase) entry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommunityId, PhaseId, PlantId};

/// Kind of phased entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Community,
    Plant,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Community => "community",
            Self::Plant => "plant",
        })
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "community" => Ok(Self::Community),
            "plant" => Ok(Self::Plant),
            other => Err(format!(
                "unknown entity type \"{other}\", expected \"community\" or \"plant\""
            )),
        }
    }
}

/// A phased entity: a community or one of its plants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityRef {
    Community(CommunityId),
    Plant(PlantId),
}

impl EntityRef {
    /// Builds a reference from a type tag and a raw id.
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        match entity_type {
            EntityType::Community => Self::Community(CommunityId::new(id)),
            EntityType::Plant => Self::Plant(PlantId::new(id)),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Community(_) => EntityType::Community,
            Self::Plant(_) => EntityType::Plant,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Community(id) => id.as_str(),
            Self::Plant(id) => id.as_str(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type(), self.id())
    }
}

/// Parses `"community:<id>"` or `"plant:<id>"`.
impl FromStr for EntityRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <entity_type>:<id>, got \"{s}\""))?;
        if id.is_empty() {
            return Err(format!("missing entity id in \"{s}\""));
        }
        Ok(Self::new(kind.parse()?, id))
    }
}

/// Status of one phase of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Todo,
    InReview,
    Done,
}

impl Status {
    /// Whether `self -> to` is a legal edge.
    ///
    /// Legal edges are `todo -> in-review`, `in-review -> done`,
    /// `done -> in-review`, plus self-transitions.
    pub fn can_transition_to(self, to: Status) -> bool {
        self == to
            || matches!(
                (self, to),
                (Self::Todo, Self::InReview) | (Self::InReview, Self::Done) | (Self::Done, Self::InReview)
            )
    }

    /// Statuses that require the phase's gate to be open.
    pub fn is_gated(self) -> bool {
        matches!(self, Self::InReview | Self::Done)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Todo => "todo",
            Self::InReview => "in-review",
            Self::Done => "done",
        })
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in-review" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            other => Err(format!(
                "unknown status \"{other}\", expected todo, in-review or done"
            )),
        }
    }
}

/// Composite key of a workflow entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkflowKey {
    pub entity: EntityRef,
    pub phase: PhaseId,
}

impl WorkflowKey {
    pub fn new(entity: EntityRef, phase: impl Into<PhaseId>) -> Self {
        Self {
            entity,
            phase: phase.into(),
        }
    }
}

impl fmt::Display for WorkflowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity, self.phase)
    }
}

/// Latest state of one (entity, phase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEntry {
    /// Current status.
    pub status: Status,
    /// Person or team responsible for the phase.
    pub owner: Option<String>,
    /// Target completion date.
    pub due_date: Option<NaiveDate>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Time of the last write, from the store's clock.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowEntry {
    /// Default entry (`todo`, no owner) stamped at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            status: Status::Todo,
            owner: None,
            due_date: None,
            notes: None,
            updated_at: now,
        }
    }

    /// Merges the fields present in `patch` and refreshes `updated_at`.
    pub fn apply(&mut self, patch: &WorkflowPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(owner) = &patch.owner {
            self.owner = Some(owner.clone());
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        self.updated_at = now;
    }
}

/// Fields to merge into a workflow entry; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowPatch {
    /// New status; `advance` replaces it with the requested target.
    pub status: Option<Status>,
    pub owner: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl WorkflowPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
