pub mod api;
pub mod compile;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod orchestration;

pub use compile::{CompileReport, Compiler};
pub use config::Config;
pub use db::{init_db, EmptyDayPolicy, JournalStore, MemoryStore, Repository};
pub use domain::{
    ContractKey, DailySummary, Decimal, Execution, OptionType, ParsedExecution, RoundTrip,
    TransactionType,
};
pub use error::AppError;
pub use orchestration::{CsvImportSummary, ImportOrchestrator, PasteImportSummary};
