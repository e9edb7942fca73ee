//! onionscout CLI building blocks
//!
//! Configuration, the scan run, output rendering, progress display and Tor
//! Browser integration used by the `onionscout` binary.

pub mod browser;
pub mod config;
pub mod output;
pub mod progress;
pub mod scan;
