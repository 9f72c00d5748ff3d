//! Multicore topology builder and functional-unit latency sweep harness.

pub mod config;
pub mod core;
pub mod driver;
pub mod error;
pub mod fu_pool;
pub mod memory;
pub mod metrics;
pub mod partition;
pub mod simulator;
pub mod sweep;
pub mod topology;
pub mod workload;

pub use error::{Error, Result};
