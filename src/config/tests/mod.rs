//! Unit tests for configuration loading and precedence.
//!
//! Tests are organised into modules by functional area:
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `field_resolution`: Token, locator, id, and output path resolution tests
//! - `validation`: Configuration completeness and range validation tests

mod helpers;
