pub mod search_index;

pub use search_index::{HttpSearchIndex, MockSearchIndex, SearchIndex};
