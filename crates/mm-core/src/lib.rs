//! Core of the channel media monitor.
//!
//! This crate is framework-agnostic: the validator is a pure function over
//! [`messaging::types::IncomingMessage`] and [`policy::Policy`], and the chat
//! backend lives behind the ports in [`messaging::port`], implemented in
//! adapter crates.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod monitor;
pub mod policy;
pub mod validator;

pub use errors::{Error, Result};
