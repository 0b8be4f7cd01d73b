pub mod handler;
pub mod models;

pub use handler::{health_check, AppState};
