//! Supporting data structures and traversals

pub mod multimap;
pub mod subset;
pub mod visitor;

pub use multimap::MultiMap;
pub use subset::Subset;
