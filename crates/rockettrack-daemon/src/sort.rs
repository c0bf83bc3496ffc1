//! Sorting for the rocket list endpoint.
//!
//! The engine returns summaries in a stable default order; this module is
//! the external sorter that imposes the order a client asked for. String
//! fields compare case-insensitively; sorting exploded status ascending
//! puts intact rockets first, with channel id as the tiebreak.

use std::cmp::Ordering;
use std::str::FromStr;

use thiserror::Error;

use rockettrack_core::RocketSummary;

/// The sort field was not one of the supported values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid sort field '{0}' (valid: id, type, speed, mission, exploded, updatedAt)")]
pub struct InvalidSortField(pub String);

/// The sort order was not one of the supported values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid sort order '{0}' (valid: asc, desc)")]
pub struct InvalidSortOrder(pub String);

/// Fields the list endpoint can sort on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    /// Channel id (the default).
    #[default]
    Id,
    /// Rocket type.
    Type,
    /// Current speed.
    Speed,
    /// Current mission.
    Mission,
    /// Exploded status.
    Exploded,
    /// Time of last state change.
    UpdatedAt,
}

impl FromStr for SortField {
    type Err = InvalidSortField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "type" => Ok(Self::Type),
            "speed" => Ok(Self::Speed),
            "mission" => Ok(Self::Mission),
            "exploded" => Ok(Self::Exploded),
            "updatedAt" => Ok(Self::UpdatedAt),
            other => Err(InvalidSortField(other.to_string())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending (the default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl FromStr for SortOrder {
    type Err = InvalidSortOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(InvalidSortOrder(other.to_string())),
        }
    }
}

/// Sorts rocket summaries by `field` in `order`.
#[must_use]
pub fn sort_summaries(
    mut rockets: Vec<RocketSummary>,
    field: SortField,
    order: SortOrder,
) -> Vec<RocketSummary> {
    rockets.sort_by(|a, b| {
        let ascending = match field {
            SortField::Id => ci_cmp(&a.id, &b.id),
            SortField::Type => ci_cmp(&a.rocket_type, &b.rocket_type),
            SortField::Speed => a.speed.cmp(&b.speed),
            SortField::Mission => ci_cmp(&a.mission, &b.mission),
            // Intact rockets sort before exploded ones, id as tiebreak.
            SortField::Exploded => a
                .exploded
                .cmp(&b.exploded)
                .then_with(|| ci_cmp(&a.id, &b.id)),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        match order {
            SortOrder::Asc => ascending,
            SortOrder::Desc => ascending.reverse(),
        }
    });
    rockets
}

fn ci_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
