//! Connection dispatcher: the accept loop and server lifecycle.

pub mod listener;

pub use listener::{start, Server, ServerHandle, ServerState};
