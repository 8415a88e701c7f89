//! Provider adapters implementing the `ModelInvoker` port

pub mod openai;
