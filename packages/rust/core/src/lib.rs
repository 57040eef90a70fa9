//! Core rendering and build orchestration for rstindex.
//!
//! This crate ties together index validation, page rendering, the root
//! table of contents, and output assembly into end-to-end builds
//! (e.g., `build_from_index`).

pub mod assembler;
pub mod index;
pub mod pipeline;
pub mod toc;
