use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Class of remote operation, each with its own daily quota.
///
/// Parses from and prints as `api`, `dm` and `join_leave`; `join` is accepted
/// as an alias for `join_leave`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuotaCategory {
    /// General API calls (entity resolution, member pages, ...).
    Api,
    /// Direct messages.
    Dm,
    /// Joining or leaving a group.
    #[strum(to_string = "join_leave", serialize = "join")]
    JoinLeave,
}
