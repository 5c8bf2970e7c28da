//! Unit tests for the markings format.
//!
//! These tests cover parsing, identifier rewriting and file round-trips.
