//! Compute module - Pattern search, covering and encoding.

mod covering;
mod encoder;
mod fitness;
mod scheduler;

pub mod search;

pub use covering::*;
pub use encoder::*;
pub use fitness::*;
pub use scheduler::*;
pub use search::{GeneRng, PatternSearch, SearchContext};
