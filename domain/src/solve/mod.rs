//! Solve results, outbound stream events, and completeness predicates

pub mod event;
pub mod predicates;
pub mod result;
