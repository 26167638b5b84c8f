pub mod assign;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod priority;
pub mod publish;
pub mod quality;
pub mod source;
pub mod stats;

pub use assign::{DispositionEngine, DispositionRun, FixedOrder, RouteOrder, ShuffledOrder};
pub use config::EngineConfig;
pub use error::{DispositionError, Result};
pub use source::{HistoricalSource, ReportData};
