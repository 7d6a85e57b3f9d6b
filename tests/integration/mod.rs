//! Integration tests for the RFC2307 capability builder.
//!
//! Each module exercises one capability end to end through
//! [`Rfc2307Builder`](group_sync_builders::Rfc2307Builder) over the fixture
//! directory.

pub mod configuration;
pub mod construction;
pub mod detection;
pub mod escaping;
pub mod listing;
pub mod naming;
