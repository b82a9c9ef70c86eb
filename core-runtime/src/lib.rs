//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback engine:
//! - Logging and tracing infrastructure
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other engine crates depend
//! on. It establishes the logging conventions and the event broadcasting
//! mechanism through which playback, output, buffering, and user-notice
//! events reach the UI layer.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
