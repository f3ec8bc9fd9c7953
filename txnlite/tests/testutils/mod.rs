//! Test utilities for txnlite integration tests
//!
//! `TestFixture` owns its own `Database` and works on a randomly named
//! table, so tests never interfere with each other.

pub mod test_fixture;
