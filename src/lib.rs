//! Crate entry point for **gitpost**.
//!
//! A minimal wiki/blog whose posts are Markdown files in a GitHub repository.
//! [`Store`] is the only surface the presentation layer needs: it lists, reads,
//! and writes posts through the REST contents API, or writes through a
//! throwaway clone that commits and pushes.
//!
//! Each submodule owns one concern (slugs, the stored format, the gateways,
//! git plumbing, configuration). The `pub use` re-exports make the public API
//! available from the crate root.

mod commands;
mod config;
mod document;
mod error;
mod gateway;
mod git;
mod paths;
mod slug;
mod store;
mod workspace;

pub use commands::{cmd_list, cmd_read, cmd_write};
pub use config::{FileConfig, Identity, Settings, WriteVia, cmd_config};
pub use document::{Draft, Parsed, encode, parse};
pub use error::{ErrorKind, ErrorReport, StoreError, StoreResult};
pub use gateway::{
    ContentsGateway, DocumentSink, DocumentSource, MemoryGateway, PostSummary, PostsLayout,
    RemoteTarget, WorkingCopy, WorkingCopyGateway, WriteReceipt,
};
pub use paths::gitpost_home;
pub use slug::{check_slug, to_display_name, to_heading, to_slug};
pub use store::Store;
