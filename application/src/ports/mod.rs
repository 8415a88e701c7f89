//! Ports (interfaces) for the application layer

pub mod model_invoker;
pub mod progress;
pub mod token_estimator;
