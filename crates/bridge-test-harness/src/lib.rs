//! # Bridge Test Harness
//!
//! A mock core API server for exercising the bridge's HTTP client and
//! full dispatcher flow without a real core process.

pub mod mock_core;

pub use mock_core::{MockCore, MockCoreState, MockResponse, RecordedRequest};
