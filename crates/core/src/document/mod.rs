//! Document-level glue between an object graph and the security handler.

pub mod security;

pub use security::DocumentSecurity;
