//! API E2E test suite.
//!
//! Drives the HTTP API against a real PostgreSQL database. Every test returns
//! early when `TABLERO_TEST_DATABASE_URL` is unset.
//!
//! Run with: TABLERO_TEST_DATABASE_URL=postgres://... cargo test --test api_e2e

mod test_helpers;

mod test_activity_prune;
mod test_activity_scope;
mod test_assignment;
mod test_auth;
mod test_permissions;
