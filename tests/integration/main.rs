//! Integration tests for the scanner
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! fetch engine, the resolver, the full pipeline and the HTTP API.

mod api_tests;
mod common;
mod fetch_tests;
mod resolver_tests;
mod scan_tests;
