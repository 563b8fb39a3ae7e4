// src/config/mod.rs
pub mod app;
pub mod secrets;

pub use app::AppSettings;
pub use secrets::{start_hot_reload_thread, SecretsHandle};
