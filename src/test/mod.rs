//! Shared fixtures and end-to-end scenarios for unit tests.

pub(crate) mod shapes;
