//! Command implementations for the downlink CLI

pub mod serve;
