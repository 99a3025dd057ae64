//! Test-support utilities for ydoc.

pub mod fuzzer;

pub use fuzzer::Fuzzer;
