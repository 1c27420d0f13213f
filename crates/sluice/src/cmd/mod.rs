//! Command implementations for the Sluice CLI

pub mod serve;
