//! Utility modules for biblio-merge

pub mod pool_monitor;

pub use pool_monitor::{begin_monitored, MonitoredTransaction};
