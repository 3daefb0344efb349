//! Static file lookup confined to a document root.
//!
//! [`DocumentRoot`] is opened once at startup and shared read-only with every
//! connection. Resolution turns a decoded request path into the canonical path
//! of a regular file, or explains why it cannot be served.

pub mod resolver;

pub use resolver::{DocumentRoot, ResolveError, RootError, DEFAULT_INDEX};
