//! Shared test support and behavioural suites for the engine.

pub(crate) mod support;
