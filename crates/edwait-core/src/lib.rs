//! Emergency department visit log transformation.
//!
//! This crate turns a raw ED visit log into two derived tables:
//!
//! - the **presentation timeline**: for every arrival instant, the visits
//!   present in the department at that instant, each ranked by when it was
//!   actually seen and by its triage deadline;
//! - the **annotated visit table**: one row per input visit with occupancy at
//!   arrival, waits, lateness against the triage allowance and the
//!   treated-out-of-order flag.
//!
//! # Pipeline
//!
//! 1. **Validate** ([`visit::VisitLog`]): enforce unique `(mrn, visit_number)`
//!    keys and set aside rows that cannot be ranked
//! 2. **Build the timeline** ([`timeline::Timeline`]): interval sweep over
//!    `[arrival, departure)`
//! 3. **Rank** ([`ranking::OrderingAnalysis`]): actual vs expected order per
//!    snapshot group, OR-ed into a per-visit flag
//! 4. **Aggregate** ([`aggregate::annotate`]): per-visit metrics
//!
//! [`pipeline::transform`] runs all of them.
//!
//! # Example
//!
//! ```
//! use edwait_core::{config::AnalysisConfig, pipeline, table};
//!
//! let log = "\
//! mrn,visit_number,arrival,triage_priority,seen,departure
//! A,1,2009-03-14 09:00,1,2009-03-14 09:05,2009-03-14 10:00
//! B,1,2009-03-14 08:55,5,2009-03-14 09:01,2009-03-14 09:30
//! ";
//! let records = table::read_visits_csv(log.as_bytes()).unwrap();
//! let output = pipeline::transform(records, &AnalysisConfig::default()).unwrap();
//!
//! assert_eq!(output.visits.len(), 2);
//! assert_eq!(output.timeline.len(), 3);
//! assert_eq!(output.visits[0].treated_later_than_ordering, Some(true));
//! assert_eq!(output.visits[0].occupancy_at_arrival, Some(1));
//! ```

pub mod aggregate;
pub mod allowance;
pub mod config;
pub mod pipeline;
pub mod ranking;
pub mod table;
pub mod timeline;
pub mod timestamp;
pub mod visit;
