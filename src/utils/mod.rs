//! Utility functions shared throughout ngramdex.
//!
//! ## Modules
//!
//! - [`app_data`] - Config file and cache locations (XDG-compliant)
//! - [`ngram`] - Tagged unigram/bigram/trigram extraction
//! - [`progress`] - Optional progress bar
//!
//! ## Key Functions
//!
//! ```
//! use ngramdex::utils::{collect_query_ngrams, encode};
//!
//! let filter = encode("hello world");
//! let query = collect_query_ngrams("world");
//! assert!(filter.contains_all(&query));
//! ```

pub mod app_data;
pub mod ngram;
pub mod progress;

pub use app_data::*;
pub use ngram::*;
pub use progress::file_progress;
