//! Import orchestration: normalize, write, then recompile every touched date.

pub mod orchestrator;

pub use orchestrator::{
    content_hash, CsvImportSummary, DayView, ImportOrchestrator, OrchestrationError,
    PasteImportSummary,
};
