pub mod clean;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loader;
pub mod model;
