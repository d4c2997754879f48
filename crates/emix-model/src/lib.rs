//! MILP model construction and in-process relaxed solving for emix.
//!
//! Declarative glue over `good_lp`: the energy-system formulation (assets,
//! balances, investment decisions) is built here, and the always-available
//! pure-Rust Clarabel backend solves its LP relaxation. Exact MILP solving
//! is delegated to the external engine selected by `emix-solver`.

pub mod dispatch;

pub use dispatch::{
    solve_relaxed, DispatchSolution, GeneratorDispatch, LineBuild, ModelConfig, ModelError,
    StorageProfile,
};
