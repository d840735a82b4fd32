//! Shared mocks for the capability traits, used across the crate's tests.

pub mod mocks;
