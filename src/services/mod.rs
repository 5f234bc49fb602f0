//! Service layer for Clausewise business logic.
//!
//! This module contains domain logic separated from UI concerns.
//! Services are driven by the CLI and by the integration tests.

pub mod batch;
pub mod documents;
pub mod versions;

pub use batch::{BatchCoordinator, BatchEvent, BatchFile, FileSource};
pub use documents::{DocumentProcessor, DocumentStats};
pub use versions::{CategoryComparison, ClauseComparison, ClauseDelta, VersionManager};
