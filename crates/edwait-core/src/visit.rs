//! Visit log model.
//!
//! A [`VisitRecord`] is one raw row of the source log. [`VisitLog::new`]
//! validates the rows into [`Visit`]s, enforcing the `(mrn, visit_number)`
//! identity key and setting aside rows that cannot take part in ranking.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    allowance::{AllowanceTable, TriagePriority},
    timestamp,
};

/// Identity of one ED presentation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisitKey {
    pub mrn: String,
    pub visit_number: u32,
}

impl fmt::Display for VisitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.mrn, self.visit_number)
    }
}

/// One raw row of the visit log.
///
/// Column names also accept the spreadsheet headers used by hospital exports
/// (`MRN`, `Presentation Visit Number`, `Arrival Date`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    #[serde(alias = "MRN")]
    pub mrn: String,
    #[serde(alias = "Presentation Visit Number")]
    pub visit_number: u32,
    #[serde(alias = "Arrival Date", default, with = "timestamp::optional")]
    pub arrival: Option<NaiveDateTime>,
    #[serde(alias = "Triage Priority", default)]
    pub triage_priority: Option<i64>,
    #[serde(alias = "Dr Seen Date", default, with = "timestamp::optional")]
    pub seen: Option<NaiveDateTime>,
    #[serde(alias = "Depart Actual Date", default, with = "timestamp::optional")]
    pub departure: Option<NaiveDateTime>,
}

impl VisitRecord {
    /// Required columns, each with the header aliases accepted for it.
    pub const COLUMNS: [(&str, &str); 6] = [
        ("mrn", "MRN"),
        ("visit_number", "Presentation Visit Number"),
        ("arrival", "Arrival Date"),
        ("triage_priority", "Triage Priority"),
        ("seen", "Dr Seen Date"),
        ("departure", "Depart Actual Date"),
    ];

    #[must_use]
    pub fn key(&self) -> VisitKey {
        VisitKey {
            mrn: self.mrn.clone(),
            visit_number: self.visit_number,
        }
    }
}

/// Why a row was set aside from ranking and lateness computation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionReason {
    #[display("missing arrival time")]
    MissingArrival,
    #[display("missing triage priority")]
    MissingPriority,
    #[display("triage priority outside the allowance table")]
    PriorityOutOfRange,
    #[display("seen before arrival")]
    SeenBeforeArrival,
    #[display("departed before arrival")]
    DepartedBeforeArrival,
    #[display("seen after departure")]
    SeenAfterDeparture,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    /// 1-based data row number in the source log.
    pub row: usize,
    #[serde(serialize_with = "serialize_key")]
    pub key: VisitKey,
    pub reason: ExclusionReason,
}

fn serialize_key<S>(key: &VisitKey, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(key)
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display(
    "visit key (mrn, visit_number) must be unique: {key} appears in rows {first_row} and {duplicate_row}"
)]
pub struct DuplicateVisitKey {
    pub key: VisitKey,
    pub first_row: usize,
    pub duplicate_row: usize,
}

/// A validated visit that takes part in the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    /// Position in the source log (0-based); the stable tie-break order.
    pub index: usize,
    pub key: VisitKey,
    pub arrival: NaiveDateTime,
    pub priority: TriagePriority,
    pub expected_seen: NaiveDateTime,
    pub seen: Option<NaiveDateTime>,
    pub departure: Option<NaiveDateTime>,
}

impl Visit {
    /// Whether the visit is present at instant `t` under the `[arrival, departure)` rule.
    ///
    /// A missing departure means the visit never leaves.
    #[must_use]
    pub fn is_present_at(&self, t: NaiveDateTime) -> bool {
        self.arrival <= t && self.departure.is_none_or(|departure| t < departure)
    }
}

/// The validated visit log.
#[derive(Debug, Clone)]
pub struct VisitLog {
    records: Vec<VisitRecord>,
    visits: Vec<Visit>,
    exclusions: Vec<Exclusion>,
}

impl VisitLog {
    /// Validates raw rows.
    ///
    /// A duplicate `(mrn, visit_number)` aborts validation. Rows with a
    /// missing arrival, missing or out-of-domain priority, or timestamps out
    /// of order are kept as records but excluded from the timeline.
    pub fn new(
        records: Vec<VisitRecord>,
        allowance: &AllowanceTable,
    ) -> Result<Self, DuplicateVisitKey> {
        let mut first_rows = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if let Some(first) = first_rows.insert(record.key(), index) {
                return Err(DuplicateVisitKey {
                    key: record.key(),
                    first_row: first + 1,
                    duplicate_row: index + 1,
                });
            }
        }

        let mut visits = Vec::with_capacity(records.len());
        let mut exclusions = vec![];
        for (index, record) in records.iter().enumerate() {
            match validate(index, record, allowance) {
                Ok(visit) => visits.push(visit),
                Err(reason) => exclusions.push(Exclusion {
                    row: index + 1,
                    key: record.key(),
                    reason,
                }),
            }
        }

        let log = Self {
            records,
            visits,
            exclusions,
        };
        log.log_exclusions();
        Ok(log)
    }

    #[must_use]
    pub fn records(&self) -> &[VisitRecord] {
        &self.records
    }

    #[must_use]
    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    #[must_use]
    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    /// Number of excluded rows per reason.
    #[must_use]
    pub fn exclusion_counts(&self) -> BTreeMap<ExclusionReason, usize> {
        self.exclusions
            .iter()
            .fold(BTreeMap::new(), |mut counts, exclusion| {
                *counts.entry(exclusion.reason).or_default() += 1;
                counts
            })
    }

    fn log_exclusions(&self) {
        const MAX_SHOWN: usize = 5;
        for (reason, count) in self.exclusion_counts() {
            let examples = self
                .exclusions
                .iter()
                .filter(|e| e.reason == reason)
                .take(MAX_SHOWN)
                .map(|e| format!("{} (row {})", e.key, e.row))
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(%reason, count, "excluding visits: {examples}");
        }
    }
}

fn validate(
    index: usize,
    record: &VisitRecord,
    allowance: &AllowanceTable,
) -> Result<Visit, ExclusionReason> {
    let arrival = record.arrival.ok_or(ExclusionReason::MissingArrival)?;
    let raw_priority = record
        .triage_priority
        .ok_or(ExclusionReason::MissingPriority)?;
    let priority = allowance
        .priority(raw_priority)
        .map_err(|_| ExclusionReason::PriorityOutOfRange)?;

    if record.seen.is_some_and(|seen| seen < arrival) {
        return Err(ExclusionReason::SeenBeforeArrival);
    }
    if record.departure.is_some_and(|departure| departure < arrival) {
        return Err(ExclusionReason::DepartedBeforeArrival);
    }
    if let (Some(seen), Some(departure)) = (record.seen, record.departure)
        && seen > departure
    {
        return Err(ExclusionReason::SeenAfterDeparture);
    }

    Ok(Visit {
        index,
        key: record.key(),
        arrival,
        priority,
        expected_seen: allowance.deadline(priority, arrival),
        seen: record.seen,
        departure: record.departure,
    })
}
