//! Tabular input and output.
//!
//! The visit log is read from CSV or JSON. The presentation timeline and the
//! annotated visit table are written to CSV here; JSON output goes through
//! their `Serialize` impls.

use std::io::{Read, Write};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::AnnotatedVisit,
    ranking::OrderingAnalysis,
    timeline::Timeline,
    timestamp,
    visit::{Visit, VisitRecord},
};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LoadVisitsError {
    #[display("required column '{column}' is missing from the visit log")]
    MissingColumn { column: &'static str },
    #[display("invalid visit log row {row}")]
    InvalidRow { row: usize, source: csv::Error },
    #[display("failed to read visit log")]
    Csv { source: csv::Error },
    #[display("failed to parse visit log JSON")]
    Json { source: serde_json::Error },
}

/// Reads a CSV visit log with a header row.
///
/// Cells are trimmed; empty cells are read as missing values.
pub fn read_visits_csv<R>(reader: R) -> Result<Vec<VisitRecord>, LoadVisitsError>
where
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|source| LoadVisitsError::Csv { source })?
        .clone();
    for (column, alias) in VisitRecord::COLUMNS {
        if !headers.iter().any(|h| h == column || h == alias) {
            return Err(LoadVisitsError::MissingColumn { column });
        }
    }

    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.map_err(|source| LoadVisitsError::InvalidRow { row: i + 1, source }))
        .collect()
}

/// Reads a JSON array of visit records.
pub fn read_visits_json<R>(reader: R) -> Result<Vec<VisitRecord>, LoadVisitsError>
where
    R: Read,
{
    serde_json::from_reader(reader).map_err(|source| LoadVisitsError::Json { source })
}

pub fn write_visits_csv<W>(records: &[VisitRecord], writer: W) -> Result<(), csv::Error>
where
    W: Write,
{
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// One (arrival event, present visit) row of the presentation timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineRow {
    #[serde(with = "timestamp")]
    pub event_time: NaiveDateTime,
    pub mrn: String,
    pub visit_number: u32,
    #[serde(with = "timestamp")]
    pub arrival: NaiveDateTime,
    pub triage_priority: u8,
    #[serde(with = "timestamp")]
    pub expected_seen: NaiveDateTime,
    #[serde(with = "timestamp::optional")]
    pub actual_seen: Option<NaiveDateTime>,
    pub actual_rank: Option<usize>,
    pub expected_rank: Option<usize>,
    pub violation: Option<bool>,
}

/// Flattens the timeline into rows, group by group in event order.
#[must_use]
pub fn timeline_rows(
    visits: &[Visit],
    timeline: &Timeline,
    ordering: &OrderingAnalysis,
) -> Vec<TimelineRow> {
    timeline
        .groups()
        .iter()
        .zip(&ordering.rankings)
        .flat_map(|(group, rankings)| {
            rankings.iter().map(move |ranking| {
                let visit = &visits[ranking.visit];
                TimelineRow {
                    event_time: group.event_time,
                    mrn: visit.key.mrn.clone(),
                    visit_number: visit.key.visit_number,
                    arrival: visit.arrival,
                    triage_priority: visit.priority.get(),
                    expected_seen: visit.expected_seen,
                    actual_seen: visit.seen,
                    actual_rank: ranking.actual_rank,
                    expected_rank: ranking.expected_rank,
                    violation: ranking.is_violation(),
                }
            })
        })
        .collect()
}

pub fn write_timeline_csv<W>(rows: &[TimelineRow], writer: W) -> Result<(), csv::Error>
where
    W: Write,
{
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the annotated visit table as CSV.
///
/// The per-priority vectors are spread over `occupancy_priority_N` and
/// `bumped_by_priority_N` columns, one per priority in the allowance table.
pub fn write_annotated_csv<W>(
    visits: &[AnnotatedVisit],
    num_priorities: usize,
    writer: W,
) -> Result<(), csv::Error>
where
    W: Write,
{
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = [
        "mrn",
        "visit_number",
        "arrival",
        "triage_priority",
        "seen",
        "departure",
        "arrival_hour",
        "arrival_weekday",
        "arrival_month",
        "excluded",
        "expected_seen",
        "occupancy_at_arrival",
        "wait_minutes",
        "lateness_minutes",
        "treatment_minutes",
        "length_of_stay_minutes",
        "treated_later_than_ordering",
        "bumped_by_more_urgent",
        "bumped_by_less_urgent",
    ]
    .map(str::to_owned)
    .to_vec();
    header.extend((1..=num_priorities).map(|p| format!("occupancy_priority_{p}")));
    header.extend((1..=num_priorities).map(|p| format!("bumped_by_priority_{p}")));
    writer.write_record(&header)?;

    for visit in visits {
        let mut record = vec![
            visit.mrn.clone(),
            visit.visit_number.to_string(),
            cell_time(visit.arrival),
            cell(visit.triage_priority),
            cell_time(visit.seen),
            cell_time(visit.departure),
            cell(visit.arrival_hour),
            cell(visit.arrival_weekday),
            cell(visit.arrival_month),
            cell(visit.excluded.and_then(|reason| {
                serde_json::to_value(reason)
                    .ok()
                    .and_then(|value| value.as_str().map(str::to_owned))
            })),
            cell_time(visit.expected_seen),
            cell(visit.occupancy_at_arrival),
            cell(visit.wait_minutes),
            cell(visit.lateness_minutes),
            cell(visit.treatment_minutes),
            cell(visit.length_of_stay_minutes),
            cell(visit.treated_later_than_ordering.map(u8::from)),
            cell(visit.bumped_by_more_urgent),
            cell(visit.bumped_by_less_urgent),
        ];
        for counts in [&visit.occupancy_by_priority, &visit.bumped_by_priority] {
            record.extend((0..num_priorities).map(|i| cell(counts.get(i))));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn cell<T>(value: Option<T>) -> String
where
    T: ToString,
{
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cell_time(value: Option<NaiveDateTime>) -> String {
    cell(value.map(|t| t.format(timestamp::OUTPUT_FORMAT)))
}
