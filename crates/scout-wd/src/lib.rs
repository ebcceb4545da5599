//! WebDriver backend.
//!
//! Implements the engine's [`Browser`] trait over a fantoccini session
//! against a chromedriver endpoint. This is the only crate that talks
//! to a real browser; everything above it is backend-agnostic.

mod backend;

pub use backend::WdBrowser;
