//! Messages API client.
//!
//! Keep the public surface small: a builder, a client, two calls.
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;

pub use builder::MessagesClientBuilder;
pub use core::{MessagesClient, MESSAGES_PATH};
