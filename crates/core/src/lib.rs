//! Core types for leadflow
//!
//! Domain records shared by storage, extraction, service and HTTP crates,
//! plus the pure pieces of the pipeline: phone normalization, the lead
//! field-merge policy and the workflow state machine.

mod constants;
mod conversation;
mod env_config;
mod error;
mod event;
mod extraction;
mod json_utils;
mod lead;
mod phone;
mod workflow;

pub use constants::*;
pub use conversation::*;
pub use env_config::*;
pub use error::*;
pub use event::*;
pub use extraction::*;
pub use json_utils::*;
pub use lead::*;
pub use phone::*;
pub use workflow::*;
