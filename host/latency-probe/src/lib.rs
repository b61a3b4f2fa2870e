// Licensed under the Apache-2.0 license

//! Normal-world side of the latency measurement.
//!
//! [`measure_performance`] connects to the latency trusted application,
//! brackets each crossing with reads of the shared system counter, and
//! turns the samples the trusted application returns into one-way and
//! round-trip intervals.

pub mod client;
pub mod config;
pub mod error;
pub mod probe;
pub mod report;
pub mod scenario;
pub mod transports;

pub use client::{Connection, LoginMethod, TeeClient};
pub use config::{OutputFormat, ProbeConfig, LATENCY_TA_UUID};
pub use error::{ConfigError, ErrorKind, ProbeError};
pub use probe::measure_performance;
pub use report::Report;
pub use scenario::{ClockCheck, ClockSync, CounterDomain, Sample, Scenario, ScenarioResult};
