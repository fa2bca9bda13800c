//! Whole-body transformations

pub mod inline;

pub use inline::inline_call;
