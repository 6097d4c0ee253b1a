//! Console presentation: colour themes and output formatting.

pub mod output_format;
pub mod theme;
