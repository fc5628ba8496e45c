pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod market;

pub mod error;
