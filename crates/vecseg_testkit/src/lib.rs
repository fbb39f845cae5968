//! # vecseg Testkit
//!
//! Test utilities for vecseg.
//!
//! This crate provides:
//! - Collection schemas, row batches and segment builders
//! - A scriptable [`MockChunkManager`] for binlog fill failure paths
//! - Property-based test generators using proptest
//! - Fuzz harnesses for the decoders
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use vecseg_core::SegmentType;
//! use vecseg_testkit::prelude::*;
//!
//! let segment = TestSegment::new(SegmentType::Growing);
//! let batch = RowBatch::sequential(0, 4);
//! segment.insert_batch(&batch, 10);
//! assert_eq!(segment.row_count(), 4);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod mock;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::mock::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use mock::*;
pub use stress::*;
