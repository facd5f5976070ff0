//! Integration tests for Note-Harvest
//!
//! These tests use wiremock to stand in for the upstream search and comment
//! endpoints and drive full keyword crawls end-to-end.

mod crawl_tests;
mod fetcher_tests;
mod scheduler_tests;
mod support;
