pub mod error;
pub mod format;
pub mod parse;
pub mod sanitize;
pub mod traits;
pub mod types;

pub use error::*;
pub use format::{format_market_data, format_value};
pub use parse::{parse_decision, parse_signal, truncate_chars};
pub use sanitize::{sanitize_context, sanitize_context_with_limit};
pub use traits::*;
pub use types::*;
