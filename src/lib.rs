pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod storage;
pub mod store;
pub mod utils;

pub use database::Database;
