//! Common utilities shared across chainwatch crates.

pub mod logging;
