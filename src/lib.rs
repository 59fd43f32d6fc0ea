pub mod actions;
pub mod app;
pub mod assets;
pub mod auth;
pub mod chart;
pub mod config;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod offline;
pub mod search;
pub mod state;
pub mod storage;
pub mod theme;
pub mod tickets;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{load_data, persist_data};
