//! Shared wire and domain types for the Echo client.

pub mod address;
pub mod catalog;
pub mod config;
pub mod platform;
pub mod protocol;
pub mod socketio;
