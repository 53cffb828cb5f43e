//! Echo client: session/connectivity core plus the terminal front end.

pub mod action;
pub mod api;
pub mod app;
pub mod app_state;
pub mod component;
pub mod components;
pub mod core;
pub mod realtime;
pub mod router;
pub mod scanner;
pub mod theme;
pub mod widgets;
