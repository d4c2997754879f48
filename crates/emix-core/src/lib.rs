//! Core data model for the emix energy-system planning tool.
//!
//! This crate defines the asset inventory of a case ([`EnergySystem`]) and
//! the error type for loading and validating one. Model construction lives
//! in `emix-model`; solver discovery and selection in `emix-solver`.

pub mod error;
pub mod system;

pub use error::{EmixError, EmixResult};
pub use system::{Demand, EnergySystem, Generator, Horizon, Line, Retail, Storage};
