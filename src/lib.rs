//! Clausewise - legal document analysis with batch processing and version
//! tracking.
//!
//! Documents are run through a keyword [`analysis`] pipeline and stored as
//! JSON records. The [`services`] layer adds concurrent batch processing
//! with persisted progress and per-document version lineages with
//! comparison.

#![allow(clippy::should_implement_trait)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{ClausewiseError, Result};
