pub mod commands;
pub mod config;
pub mod environment;
pub mod main_lib;

pub use main_lib::{build_state, init_tracing, AppState};
