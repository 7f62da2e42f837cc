//! The one entry point the presentation layer talks to.

use chrono::Utc;
use tracing::{info, warn};

use crate::config::{Settings, WriteVia};
use crate::document::Draft;
use crate::error::{StoreError, StoreResult};
use crate::gateway::{
    ContentsGateway, DocumentSink, DocumentSource, PostSummary, WorkingCopyGateway, WriteReceipt,
};
use crate::slug::check_slug;

/// List, read, and write posts in the remote repository.
///
/// Input is validated here, before any gateway is touched. Failures are
/// returned as classified [`StoreError`]s and never retried.
pub struct Store {
    source: Box<dyn DocumentSource>,
    sink: Box<dyn DocumentSink>,
}

impl Store {
    pub fn new(source: impl DocumentSource + 'static, sink: impl DocumentSink + 'static) -> Self {
        Store {
            source: Box::new(source),
            sink: Box::new(sink),
        }
    }

    /// Build a store from `config.toml` and the environment.
    ///
    /// # Errors
    /// [`StoreError::ConfigurationMissing`] when owner, repository, or token is absent.
    pub fn open() -> StoreResult<Store> {
        Store::from_settings(&Settings::load()?)
    }

    /// Reads always use the contents API; writes use the gateway `settings.write_via` names.
    pub fn from_settings(settings: &Settings) -> StoreResult<Store> {
        let contents = ContentsGateway::new(settings)?;
        let store = match settings.write_via {
            WriteVia::Api => Store::new(contents.clone(), contents),
            WriteVia::Clone => Store::new(contents, WorkingCopyGateway::new(settings)?),
        };
        Ok(store)
    }

    pub fn list(&self) -> StoreResult<Vec<PostSummary>> {
        observe("list", self.source.list())
    }

    pub fn read(&self, slug: &str) -> StoreResult<String> {
        check_slug(slug)?;
        observe("read", self.source.read(slug))
    }

    pub fn write(&self, title: &str, body: &str) -> StoreResult<WriteReceipt> {
        if title.trim().is_empty() || body.trim().is_empty() {
            return Err(StoreError::validation("Title and content are required."));
        }
        let draft = Draft::new(title, body, Utc::now());
        let receipt = observe("write", self.sink.write(&draft))?;
        info!(slug = %receipt.slug, file = %receipt.file_name, "post saved");
        Ok(receipt)
    }
}

fn observe<T>(op: &'static str, result: StoreResult<T>) -> StoreResult<T> {
    if let Err(e) = &result {
        warn!(op, kind = ?e.kind(), error = %e, "store operation failed");
    }
    result
}
