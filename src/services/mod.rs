pub mod exchange_rate;
pub mod persistence;
pub mod reducer;
pub mod state;
pub mod summary;
pub mod totals;
