pub mod aggregator;
pub mod config;
pub mod degree_days;
pub mod error;
pub mod fungal;
pub mod models;
pub mod normalizer;
pub mod output;
pub mod pest;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod scheduler;
