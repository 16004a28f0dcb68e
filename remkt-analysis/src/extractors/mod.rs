// Extractors - Raw Field Capture Ahead of Normalization

pub mod page_text;

pub use page_text::{extract_fields, extract_market_type};
