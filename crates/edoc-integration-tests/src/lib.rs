//! Hosts the cross-crate integration tests under `tests/`. No library code.
