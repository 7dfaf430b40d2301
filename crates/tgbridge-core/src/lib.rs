//! Core of the Telegram bridge: turns inbound platform updates into host
//! runtime events and host send commands into platform calls.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! ports in [`messaging::port`], implemented in `tgbridge-telegram`.

pub mod callbacks;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod events;
pub mod logging;
pub mod messaging;
pub mod outbound;
pub mod update;

pub use errors::{Error, Result};
