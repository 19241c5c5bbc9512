//! Integration tests for the redirect resolver
//!
//! These tests use wiremock to stand up mock HTTP servers and exercise
//! chain resolution and batch scheduling end-to-end.

mod resolver_tests;
mod scheduler_tests;
