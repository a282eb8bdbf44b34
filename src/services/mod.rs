pub mod format;
pub mod heuristic;
pub mod research;
pub mod scoring;

pub use format::{OutputFormat, render};
pub use research::{Diagnostic, Provenance, ResearchError, ResearchReport, Researcher};
