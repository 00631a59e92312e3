//! Recipe box sync core
//!
//! Keeps a local list of an owner's saved recipes consistent with a remote
//! per-owner document collection. Rendering, navigation, and sign-in live
//! with the caller; this crate exposes the services they drive.

pub mod app;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod services;
pub mod session;
