//! Image analysis and upload validation.

pub mod analyzer;
pub mod file_check;

pub use analyzer::{Analyzer, RandomAnalyzer};
pub use file_check::{sniff, validate, ImageFormat};
