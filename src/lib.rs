//! MongoDB replica-set control-loop operator for Docker Swarm.
//!
//! Brings a MongoDB replica set into, and keeps it in, a configuration consistent with
//! the current membership of a containerized service under Docker Swarm: bootstrapping a
//! fresh set, reconfiguring on IP change or scale, seeding the root and application
//! accounts, and reconciling continuously.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod ports;
pub mod retry;
pub mod services;

pub use config::{Config, ConfigError, ConfigLoader};
pub use services::{CycleReport, Supervisor};
