//! Services module
//!
//! Business logic that coordinates between callers, the gateway, and the
//! local collection cache.

pub mod deletion;
pub mod profile;
pub mod recipes;

pub use deletion::{ConfirmResponse, DeletePrompt, DeletionGate, GateDecision};
pub use profile::ProfileService;
pub use recipes::{CacheEvent, RecipesService};
