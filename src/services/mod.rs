//! The reconciliation pipeline (§2): each module is a stage, wired together by the
//! Supervisor. Stages before the Actuator are pure functions; the Actuator, Account
//! Bootstrapper, and Supervisor are the only stateful/effectful pieces.

pub mod account_bootstrapper;
pub mod actuator;
pub mod cluster_prober;
pub mod plan_generator;
pub mod state_classifier;
pub mod supervisor;

pub use account_bootstrapper::AccountBootstrapper;
pub use actuator::{Actuator, ActuatorResult};
pub use cluster_prober::ClusterProber;
pub use supervisor::{CycleReport, Supervisor};
