//! Pipeline configuration.
//!
//! Loaded from JSON; every field is optional and falls back to its default.
//!
//! ```
//! # use edwait_core::config::{AnalysisConfig, OccupancyPolicy, OpenDeparturePolicy};
//! let config: AnalysisConfig =
//!     serde_json::from_str(r#"{ "occupancy": "include-self" }"#).unwrap();
//! assert_eq!(config.occupancy, OccupancyPolicy::IncludeSelf);
//! assert_eq!(config.open_departure, OpenDeparturePolicy::StaysPresent);
//! assert_eq!(config.allowance_minutes.num_priorities(), 5);
//! ```

use serde::{Deserialize, Serialize};

use crate::allowance::AllowanceTable;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub allowance_minutes: AllowanceTable,
    pub occupancy: OccupancyPolicy,
    pub open_departure: OpenDeparturePolicy,
}

/// Whether a visit counts itself in its own occupancy-at-arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OccupancyPolicy {
    #[default]
    ExcludeSelf,
    IncludeSelf,
}

/// How a visit without a recorded departure takes part in later snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenDeparturePolicy {
    /// Never leaves: present at every later arrival.
    #[default]
    StaysPresent,
    /// Present only in its own arrival's snapshot.
    Excluded,
}
