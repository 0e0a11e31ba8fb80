//! Belfry core library: domain types, filesystem layout, and the JSON
//! stores the daemon and CLI share.
//!
//! - [`types`]: [`Config`], [`RunState`], [`Command`] and their parts
//! - [`paths`]: [`Layout`], the single source of file locations
//! - [`config`]: self-healing Configuration Store
//! - [`state`]: State Store
//! - [`error`]: [`StoreError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod state;
pub mod types;

mod atomic;

pub use error::StoreError;
pub use paths::Layout;
pub use types::{ActiveHours, Command, Config, RunState, Volume, HOURS_PER_DAY};
