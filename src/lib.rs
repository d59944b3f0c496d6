pub mod api;
pub mod config;
pub mod logging;
pub mod models;
pub mod staging;
pub mod state;
pub mod store;
