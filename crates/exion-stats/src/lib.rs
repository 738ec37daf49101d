//! Statistical analysis utilities for the Exion project.
//!
//! This crate provides the statistical tools consumed by the feature
//! discovery engine and the training loop:
//!
//! - **Descriptive statistics**: mean, variance, standard deviation, etc.
//! - **Correlation**: point-biserial correlation between a binary indicator
//!   and a continuous variable, the phi coefficient between two binary
//!   indicators, and Fisher r-to-z confidence intervals
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`correlation`]: Correlation measures over aggregate counts and sums
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use exion_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Correlation from aggregates
//!
//! ```
//! use exion_stats::correlation;
//!
//! // Indicator active in 2 of 4 cases, errors [1, 2, 3, 4], active on the
//! // two largest errors.
//! let r = correlation::point_biserial(7.0, 2, 10.0, 30.0, 4);
//! assert!(r > 0.8);
//! ```

pub mod correlation;
pub mod descriptive;
