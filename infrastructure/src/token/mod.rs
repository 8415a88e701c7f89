//! Token estimation

pub mod estimator;
