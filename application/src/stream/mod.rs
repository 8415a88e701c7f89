//! Stream protocol consumption

pub mod consumer;
