//! Data preparation and aggregation pipeline for a bank branch case study.
//!
//! Two tabular datasets, a transaction log and an SME loan log, are loaded
//! once into immutable [`table::Table`] values. Every view is then a pure
//! function of one of them: rolling trends, frequency tables, histograms,
//! cross tabulations, descriptive statistics, a Welch t-test and a
//! user-driven explorer. Problems such as a missing source or an absent
//! optional column surface as [`error::Condition`] values, never as panics.
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod explore;
pub mod hypothesis;
pub mod loader;
pub mod output;
pub mod schema;
pub mod summary;
pub mod table;
pub mod types;
pub mod util;
pub mod views;
