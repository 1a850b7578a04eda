//! Routing, product-mix and scheduling problems formulated as mixed-integer
//! linear programs and solved with CBC.

pub mod batch;
pub mod config;
pub mod error;
pub mod generate;
pub mod graph;
pub mod ilp;
pub mod logging;
pub mod matrix;
pub mod models;
pub mod report;
pub mod utils;

pub use config::SolverConfig;
pub use error::ModelError;
pub use models::{Instance, Problem, ProblemKind, Rendered};
pub use report::{OutputFormat, Report, SolveStatus};
