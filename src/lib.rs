pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod doctors;
pub mod error;
pub mod extract;
pub mod meals;
pub mod media;
pub mod memory;
pub mod nutrition;
pub mod response;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod users;

pub use app::build_app;
pub use state::AppState;
