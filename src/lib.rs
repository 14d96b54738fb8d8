//! Canopy Library
//!
//! Headless driver for the Canopy hierarchy browser engine: reads browser
//! commands from stdin and writes browser events to stdout as NDJSON.

pub mod headless;

pub use headless::runner::{run_headless, HeadlessOptions};
