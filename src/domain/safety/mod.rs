//! Output safety pipeline for generated patient replies.
//!
//! Two independent, composable checks run on every assistant-generated
//! string before it is stored or returned:
//!
//! - [`OutputSanitizer`] rewrites unsafe content (blocked-phrase excision,
//!   length capping) and never fails.
//! - [`ResponseValidator`] flags quality problems (character breaks,
//!   diagnosis disclosure, degenerate output) without altering the text.

mod sanitizer;
mod validator;

pub use sanitizer::{OutputSanitizer, SafetyPolicy, SafetyVerdict};
pub use validator::{ResponseValidator, ValidatorConfig};
