//! Core engine: the fetch → enrich → filter scan pipeline.

pub mod scoring;
pub mod enricher;
pub mod scanner;
