//! Model configuration types

pub mod config;
