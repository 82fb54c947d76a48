//! Command-line interface for sieve.

pub mod config;
pub mod error;
pub mod output;
pub mod run;
pub mod stage;
