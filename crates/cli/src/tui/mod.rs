//! Full-screen terminal chat surface.

pub mod action;
pub mod app;
pub mod chat;
pub mod event;
pub mod status;
pub mod theme;

pub use event::run_tui;
