//! ao3stats - preprocessing and statistics for AO3 works and tags dumps.
//!
//! The [`pipeline`] turns the raw works and tags tables into per-fandom
//! tables, [`storage`] persists them as Parquet, and [`analysis`] computes
//! chart data from the stored tables.

#![allow(clippy::should_implement_trait)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod utils;
