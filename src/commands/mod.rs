pub mod exchange_rate;
pub mod settings;
pub mod statement;
