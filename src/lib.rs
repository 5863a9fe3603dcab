//! Link resolver library.
//!
//! Resolves URL text found in curated content into a final destination:
//! follows HTTP redirects, applies ignore rules, strips tracking query
//! parameters, classifies the destination, follows HTML meta-refresh
//! redirects and optionally downloads non-HTML content for inspection.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod attachment;
pub mod clean;
pub mod config;
pub mod constants;
pub mod content;
pub mod error;
pub mod hostname;
pub mod keys;
pub mod link;
pub mod policy;
pub mod resolver;
pub mod store;

pub use attachment::{Attachment, DetectedType};
pub use config::{Config, ConfigError};
pub use content::Content;
pub use error::{AttachmentError, ContentError, FinalUrlError, LinkIssue, RedirectError};
pub use link::ResolvedLink;
pub use policy::{AttachmentTarget, CleanPolicy, DestinationPolicy, IgnorePolicy};
pub use resolver::{LinkResolver, Policies};
pub use store::{FileStore, LinkStore, Lookup, NullStore, StoreError};
