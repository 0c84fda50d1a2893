//! Illuminate Domain Layer
//!
//! This crate contains the core data model for Illuminate's consensus
//! extraction pipeline. It defines the fundamental concepts and value objects
//! that all other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **DescriptionCandidate**: one engine's proposed excerpt with type,
//!   confidence and character span
//! - **MergedDescription**: a candidate cluster after weighted consensus,
//!   carrying its contributing engines and priority score
//! - **Span**: half-open character offsets into the original chapter text
//! - **Strategy**: the execution policy controlling which engines run
//!
//! ## Architecture
//!
//! This crate stays close to zero dependencies: pure value objects only.
//! Engines, configuration and coordination live in other crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod description;
pub mod span;
pub mod strategy;

// Re-exports for convenience
pub use description::{DescriptionCandidate, DescriptionType, MergedDescription};
pub use span::Span;
pub use strategy::Strategy;
