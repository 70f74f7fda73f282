//! Host modules available to every hook script
//!
//! - `log`: messages routed to a pluggable [`LogSink`]
//! - `host`: version, clock and sleep helpers

pub mod host;
pub mod log;

pub use host::HostApiModule;
pub use log::{LogModule, LogSink, TracingSink};
