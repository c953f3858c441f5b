//! Application layer - use cases and services

pub mod commands;
pub mod price_monitor;
pub mod services;

pub use commands::{Cli, CommandExecutor, Commands};
pub use price_monitor::{MonitorStats, PassReport, PriceMonitor, PriceMonitorConfig};
pub use services::AlertService;
