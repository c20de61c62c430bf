//! Statistical routines used by the edwait reporting stage.
//!
//! This crate is the statistics library the analysis stage calls into. The core
//! transformation crate never depends on it; it only consumes finished tables.
//!
//! - **Descriptive statistics**: count, mean, median, sample variance and friends
//! - **Percentiles**: nearest-rank percentile lookup
//! - **Normality**: Jarque–Bera goodness-of-fit test
//! - **Two-sample location tests**: Welch's t-test and the Mann–Whitney U test
//! - **Regression**: ordinary least squares over a named design matrix
//! - **ANOVA**: one-way and two-factor (sequential sums of squares) analysis of variance
//! - **Post-hoc**: pairwise comparisons with Bonferroni adjustment
//! - **Survival analysis**: Kaplan–Meier estimator for censored waiting times
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use edwait_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.median, 3.0);
//! ```
//!
//! ## Comparing two samples
//!
//! ```
//! use edwait_stats::location::MannWhitneyU;
//!
//! let on_time = [3.0, 5.0, 8.0, 9.0];
//! let bumped = [12.0, 15.0, 20.0, 31.0];
//! let test = MannWhitneyU::new(&on_time, &bumped).unwrap();
//! assert!(test.mean_rank_a < test.mean_rank_b);
//! ```
//!
//! ## Fitting a linear model
//!
//! ```
//! use edwait_stats::regression::{DesignMatrix, OlsFit};
//!
//! let x = [1.0, 2.0, 3.0, 4.0];
//! let y = [3.0, 5.0, 7.0, 9.0];
//! let mut design = DesignMatrix::with_intercept(x.len());
//! design.push_column("x", x.to_vec()).unwrap();
//! let fit = OlsFit::fit(&design, &y).unwrap();
//! assert!((fit.coefficient("x").unwrap().estimate.unwrap() - 2.0).abs() < 1e-9);
//! ```

pub mod anova;
pub mod descriptive;
pub mod distribution;
pub mod location;
pub mod normality;
pub mod percentiles;
pub mod posthoc;
pub mod regression;
pub mod survival;
