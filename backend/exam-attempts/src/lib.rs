#![allow(dead_code)]

pub mod config;
pub mod error;
pub mod models;
pub mod scoring;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{AttemptError, ErrorKind};
pub use services::attempt_service::AttemptService;
