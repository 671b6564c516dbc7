pub mod aws;
pub mod config;
pub mod error;
pub mod handler;
pub mod job;
pub mod models;
pub mod parser;
pub mod sink;
pub mod store;
pub mod transform;
