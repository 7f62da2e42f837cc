use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{DocumentSink, DocumentSource, PostSummary, PostsLayout, WriteReceipt};
use crate::document::Draft;
use crate::error::{StoreError, StoreResult};
use crate::slug::to_slug;

/// In-process stand-in for the remote repository.
///
/// Clones share the same files, so one value can back both sides of a
/// [`crate::Store`]. Listing order is by file name.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    layout: PostsLayout,
    files: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryGateway {
    pub fn new(layout: PostsLayout) -> Self {
        MemoryGateway {
            layout,
            files: Arc::default(),
        }
    }

    /// Number of stored posts.
    pub fn len(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentSource for MemoryGateway {
    fn list(&self) -> StoreResult<Vec<PostSummary>> {
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(files
            .keys()
            .filter_map(|name| self.layout.summary(name))
            .collect())
    }

    fn read(&self, slug: &str) -> StoreResult<String> {
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files
            .get(&self.layout.file_name(slug))
            .cloned()
            .ok_or_else(|| StoreError::not_found(slug))
    }
}

impl DocumentSink for MemoryGateway {
    fn write(&self, draft: &Draft) -> StoreResult<WriteReceipt> {
        let slug = to_slug(&draft.title);
        let file_name = self.layout.file_name(&slug);
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_name.clone(), draft.encode());
        Ok(WriteReceipt { slug, file_name })
    }
}
