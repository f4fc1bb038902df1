//! Bill Service - shared receipts, per-item claims and settlement.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod settlement;
pub mod startup;
pub mod utils;

pub use startup::{build_router, AppState};
