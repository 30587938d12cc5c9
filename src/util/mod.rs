//! Utility functions for common operations.
//!
//! - **URL handling**: base URL validation for configured endpoints, asset URL normalization
//! - **Text processing**: HTML-to-text reduction, XML-safe text, platform timestamps

mod text;
mod url_validator;

pub use text::{html_to_text, strip_control_chars, timestamp_from_millis};
pub use url_validator::{absolute_url, validate_base_url, UrlValidationError};
