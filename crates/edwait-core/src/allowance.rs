use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Validated triage priority, 1 = most urgent.
///
/// Only obtainable through [`AllowanceTable::priority`], so every value is
/// guaranteed to lie inside the table it was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("{_0}")]
pub struct TriagePriority(u8);

impl TriagePriority {
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-priority columns.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("triage priority {value} is outside the allowance table domain 1..={max}")]
pub struct PriorityOutOfRange {
    pub value: i64,
    pub max: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum AllowanceTableError {
    #[display("allowance table must have at least one priority")]
    Empty,
    #[display("allowance table has {len} priorities, at most {} are supported", u8::MAX)]
    TooManyPriorities { len: usize },
}

/// Maximum acceptable minutes-to-clinician per triage priority.
///
/// Entry `i` is the allowance for priority `i + 1`. The default is the
/// five-level table 2 / 10 / 30 / 60 / 120 minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct AllowanceTable {
    minutes: Vec<u32>,
}

impl Default for AllowanceTable {
    fn default() -> Self {
        Self {
            minutes: vec![2, 10, 30, 60, 120],
        }
    }
}

impl TryFrom<Vec<u32>> for AllowanceTable {
    type Error = AllowanceTableError;

    fn try_from(minutes: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(minutes)
    }
}

impl From<AllowanceTable> for Vec<u32> {
    fn from(table: AllowanceTable) -> Self {
        table.minutes
    }
}

impl AllowanceTable {
    pub fn new(minutes: Vec<u32>) -> Result<Self, AllowanceTableError> {
        if minutes.is_empty() {
            return Err(AllowanceTableError::Empty);
        }
        if minutes.len() > usize::from(u8::MAX) {
            return Err(AllowanceTableError::TooManyPriorities { len: minutes.len() });
        }
        Ok(Self { minutes })
    }

    #[must_use]
    pub fn num_priorities(&self) -> usize {
        self.minutes.len()
    }

    /// All priorities in the table's domain, most urgent first.
    #[expect(clippy::cast_possible_truncation)]
    pub fn priorities(&self) -> impl Iterator<Item = TriagePriority> + use<> {
        (1..=self.minutes.len() as u8).map(TriagePriority)
    }

    /// Checks a raw priority value against the table's domain.
    #[expect(clippy::cast_possible_truncation)]
    pub fn priority(&self, raw: i64) -> Result<TriagePriority, PriorityOutOfRange> {
        let max = self.minutes.len() as u8;
        u8::try_from(raw)
            .ok()
            .filter(|p| (1..=max).contains(p))
            .map(TriagePriority)
            .ok_or(PriorityOutOfRange { value: raw, max })
    }

    #[must_use]
    pub fn allowance_minutes(&self, priority: TriagePriority) -> u32 {
        self.minutes[priority.index()]
    }

    /// Expected-seen deadline: `arrival + allowance[priority]`.
    #[must_use]
    pub fn deadline(&self, priority: TriagePriority, arrival: NaiveDateTime) -> NaiveDateTime {
        arrival + TimeDelta::minutes(i64::from(self.allowance_minutes(priority)))
    }

    /// Validates `raw` and computes the deadline in one step.
    pub fn expected_seen(
        &self,
        raw: i64,
        arrival: NaiveDateTime,
    ) -> Result<NaiveDateTime, PriorityOutOfRange> {
        Ok(self.deadline(self.priority(raw)?, arrival))
    }
}
