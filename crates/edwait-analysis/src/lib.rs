//! Statistical reporting over the annotated visit table.
//!
//! This crate answers two questions about a transformed ED visit log:
//! whether being treated out of the deadline order goes together with longer
//! waits, and whether arrival time or department occupancy affects waits.
//!
//! # Workflow
//!
//! 1. **Extract samples** ([`sample::RankedSample`], [`sample::WaitObservation`])
//!    from the rows that took part in the timeline
//! 2. **Compare populations** ([`population`]): normality check, then Welch's
//!    t-test or Mann–Whitney U on lateness, overall and per priority
//! 3. **Model lateness** ([`lateness`]): outlier window, OLS on the flag,
//!    `flag × priority` ANOVA and pairwise cell comparisons
//! 4. **Break down** ([`prevalence`], [`arrival`], [`waiting`]): out-of-order
//!    rates and bumping priorities, arrival-time and occupancy effects, and
//!    Kaplan–Meier waits with unseen departures censored
//!
//! [`report::AnalysisReport::build`] runs all of them.
//!
//! # Example
//!
//! ```
//! use edwait_analysis::report::{AnalysisReport, ReportConfig, ReportError};
//!
//! let err = AnalysisReport::build(&[], &ReportConfig::default()).unwrap_err();
//! assert_eq!(err, ReportError::NoRankedVisits);
//! ```

pub mod arrival;
pub mod lateness;
pub mod population;
pub mod prevalence;
pub mod report;
pub mod sample;
pub mod waiting;
