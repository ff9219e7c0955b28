//! # Siftline Core
//!
//! Core types for the Siftline record pipeline.
//!
//! A Siftline pipeline is a linear chain of commands that consume a generic
//! [`Record`], optionally synthesize derived records, and forward them to
//! the next stage, short-circuiting on failure or on a cooperative soft
//! stop. This crate provides the building blocks shared by every command:
//! - The mutable, ordered, multi-valued [`Record`] and its [`Value`] model
//! - The [`Command`] chain abstraction and lifecycle [`Notification`]s
//! - The [`SessionDriver`] embedding entry point with pluggable failure sink
//! - The [`CommandBuilder`] registry on the shared [`Context`]
//! - The [`Settings`] configuration accessor and the shared error taxonomy

pub mod command;
pub mod context;
pub mod error;
pub mod fields;
pub mod record;
pub mod session;
pub mod settings;

pub use command::{Collector, Command, DropRecord, Notification};
pub use context::{CommandBuilder, Context};
pub use error::{ConfigError, DecodeError, Error, Result};
pub use record::{ByteStream, Record, Value};
pub use session::{FailureSink, LogFailureSink, SessionDriver, SinkFn};
pub use settings::Settings;
