//! Core of the chat command bot: the message-to-command dispatch pipeline.
//!
//! This crate is transport-agnostic. The chat client lives behind the
//! `MessagingPort` trait, implemented in an adapter crate.

pub mod command;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod i18n;
pub mod logging;
pub mod messaging;
pub mod registry;
pub mod security;
pub mod store;

pub use errors::{Error, Result};
