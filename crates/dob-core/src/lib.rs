//! Core of the Dark Ops Bot command gateway.
//!
//! Framework-agnostic: the registry, router, executor and presenter know
//! nothing about Telegram. The transport lives behind `MessagingPort` in an
//! adapter crate and feeds decoded events to [`gateway::Gateway`].

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod executor;
pub mod formatting;
pub mod gateway;
pub mod logging;
pub mod messaging;
pub mod operation;
pub mod placeholders;
pub mod presenter;
pub mod registry;
pub mod router;

pub use errors::{Error, Result};
