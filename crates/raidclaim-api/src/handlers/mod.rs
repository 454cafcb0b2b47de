//! API Handlers

pub mod extract;
pub mod health;
pub mod providers;
