//! Use cases for the application layer

pub mod follow_up;
pub mod run_debate;
pub mod shared;
pub mod solve_single;
