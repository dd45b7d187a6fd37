pub mod backfill;
pub mod history;
pub mod prices;
pub mod rates;
pub mod serve;
pub mod setup;
pub mod summary;
pub mod ui;
