//! Renderman Source Resolution
//!
//! Turns bundle source locators into bytes:
//!
//! - **Placeholder substitution**: `{key}` templates filled from bundle `data`
//! - **Local files**: paths relative to the config directory
//! - **HTTP**: GET with a 2xx status required
//!
//! Resolution is uncached and strictly per call, so callers control the order
//! sources are fetched in.

pub mod error;
pub mod locator;
pub mod resolver;

pub use error::{FetchError, Result, SourceError};
pub use locator::Locator;
pub use resolver::{SourceFetcher, SourceResolver, DEFAULT_FETCH_TIMEOUT};
