//! The simulation engine: the ordered block schedule, the per-run
//! executor with its static dependency pre-flight, and the sweep x
//! Monte-Carlo experiment runner.

pub mod blocks;
pub mod pipeline;
pub mod runner;
