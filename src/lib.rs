pub mod catalog;
pub mod commands;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

pub use models::{Document, Settings, StatementTotals};
pub use services::reducer::Command;
pub use services::state::AppState;
pub use services::summary::StatementSummary;
pub use utils::init_tracing;
