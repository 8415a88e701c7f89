//! Debate state machine and consensus policy

pub mod consensus;
pub mod state;
