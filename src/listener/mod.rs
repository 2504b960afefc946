pub mod token_monitor;

pub use token_monitor::{MonitorError, TokenMonitor};
