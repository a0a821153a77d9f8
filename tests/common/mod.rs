//! Common test infrastructure
//!
//! Fixture writers for training tables and a stub recommendation service.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{StubBehavior, StubSpotify};
//!
//! #[tokio::test]
//! async fn test_query() {
//!     let stub = StubSpotify::spawn(StubBehavior::EmptyUntil(2)).await;
//!     let settings = stub.settings();
//!     // ...
//! }
//! ```

mod constants;
mod fixtures;
mod server;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{reference_row, write_full_table, write_single_row_table};
#[allow(unused_imports)]
pub use server::{StubBehavior, StubSpotify};
