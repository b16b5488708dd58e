pub mod clean;
pub mod config;
pub mod errors;
pub mod evaluate;
pub mod ingest;
pub mod models;
pub mod report;
pub mod split;
pub mod strategies;
