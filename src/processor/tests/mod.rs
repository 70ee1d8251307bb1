//! Integration tests for the processor module
//!
//! Runs the complete pipeline against generated exports in a temporary tool
//! root.

pub mod end_to_end;
pub mod error_handling;
