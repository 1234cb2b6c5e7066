//! Solver abstraction layer.
//!
//! Components and buses speak in [`LinearExpr`] over opaque [`VarId`]s;
//! backends translate that algebra into a concrete solver. The built-in
//! backend is pure Rust (`minilp`); a CBC-based backend is available
//! behind the `cbc` feature.

pub mod backend;
#[cfg(feature = "cbc")]
pub mod cbc;
pub mod conformance;
pub mod expr;
pub mod minilp;

pub use backend::{BackendFactory, Method, ObjectiveDirection, SolveOptions, SolverBackend};
pub use expr::{LinearExpr, VarId};
pub use minilp::MiniLpBackend;
