// Test fixtures for integration testing
#![allow(dead_code)]

pub mod fake_telegram;

pub use fake_telegram::*;
