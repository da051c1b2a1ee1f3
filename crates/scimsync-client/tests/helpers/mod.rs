//! Shared fixtures for SCIM client integration tests.

pub mod mock_scim_server;
