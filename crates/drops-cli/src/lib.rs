//! Operator tooling for drops
//!
//! Library half of `dropsctl`: the JSON scenario runner and the offline digest
//! helpers, kept here so they can be tested without spawning the binary.

#![forbid(unsafe_code)]

pub mod scenario;
pub mod verify;

pub use scenario::{Outcome, Scenario, ScenarioRunner, Step, StepReport};
