//! Unit test modules for the scanner service

pub mod cache_tests;
pub mod query_tests;
pub mod stats_tests;
