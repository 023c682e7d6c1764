//! Test suites for the conduit server.

pub(crate) mod support;
