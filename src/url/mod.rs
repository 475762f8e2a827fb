//! URL handling module for Tidepool
//!
//! Every URL is normalized exactly once, at the point it is considered for the
//! frontier or looked up in the result store.

mod normalize;

pub use normalize::normalize_url;
