pub mod api;
pub mod config;
pub mod distance;
pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod models;
pub mod observability;
pub mod state;
pub mod store;
