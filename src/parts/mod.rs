//! Model logic grouped by concern. Each module exposes pure policy
//! functions over the previous state plus the update functions that apply
//! their outputs; the scheduler in `engine::blocks` wires them together.

pub mod decentralization;
pub mod events;
pub mod hub;
pub mod staking;
pub mod supernets;
pub mod system_metrics;
