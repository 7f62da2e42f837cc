//! Backends that persist posts in the remote repository.
//!
//! Reads and listings always come from a [`DocumentSource`]; writes go to a
//! [`DocumentSink`]. The content API gateway implements both, the working-copy
//! gateway only writes. [`crate::Store`] wires one of each.

mod github;
mod memory;
mod working_copy;

use serde::Serialize;

use crate::document::Draft;
use crate::error::StoreResult;
use crate::slug::to_display_name;

pub use github::ContentsGateway;
pub use memory::MemoryGateway;
pub use working_copy::{RemoteTarget, WorkingCopy, WorkingCopyGateway};

/// One entry of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub slug: String,
    pub file_name: String,
}

pub trait DocumentSource: Send + Sync {
    /// Posts in the order the backend reports them. A missing posts directory is an empty listing.
    fn list(&self) -> StoreResult<Vec<PostSummary>>;

    /// Stored text (header and body) of one post.
    fn read(&self, slug: &str) -> StoreResult<String>;
}

pub trait DocumentSink: Send + Sync {
    /// Create or fully replace the post whose slug derives from `draft.title`.
    fn write(&self, draft: &Draft) -> StoreResult<WriteReceipt>;
}

/// Where posts live inside the repository: `{dir}/{slug}.{extension}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsLayout {
    pub dir: String,
    pub extension: String,
}

impl PostsLayout {
    pub fn new(dir: impl Into<String>, extension: impl Into<String>) -> Self {
        PostsLayout {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn file_name(&self, slug: &str) -> String {
        format!("{}.{}", slug, self.extension)
    }

    /// Repository-relative path, always `/`-separated.
    pub fn path(&self, slug: &str) -> String {
        if self.dir.is_empty() {
            self.file_name(slug)
        } else {
            format!("{}/{}", self.dir, self.file_name(slug))
        }
    }

    /// Listing entry for a file in the posts directory, `None` for non-post files.
    pub fn summary(&self, file_name: &str) -> Option<PostSummary> {
        let suffix = format!(".{}", self.extension);
        let slug = file_name.strip_suffix(&suffix)?;
        if slug.is_empty() {
            return None;
        }
        Some(PostSummary {
            slug: slug.to_string(),
            title: to_display_name(file_name, &self.extension),
        })
    }
}

impl Default for PostsLayout {
    fn default() -> Self {
        PostsLayout::new("_posts", "md")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_builds_paths() {
        let l = PostsLayout::default();
        assert_eq!(l.file_name("hello"), "hello.md");
        assert_eq!(l.path("hello"), "_posts/hello.md");
        assert_eq!(PostsLayout::new("", "md").path("hello"), "hello.md");
        assert_eq!(
            PostsLayout::new("content/posts", "markdown").path("a"),
            "content/posts/a.markdown"
        );
    }

    #[test]
    fn summary_only_for_matching_extension() {
        let l = PostsLayout::default();
        assert_eq!(
            l.summary("my-first-post.md"),
            Some(PostSummary {
                slug: "my-first-post".into(),
                title: "my first post".into()
            })
        );
        assert_eq!(l.summary("cover.png"), None);
        assert_eq!(l.summary(".md"), None);
        assert_eq!(l.summary("notes.md.bak"), None);
    }

    #[test]
    fn receipt_serializes_file_name_in_camel_case() {
        let r = WriteReceipt {
            slug: "draft".into(),
            file_name: "draft.md".into(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["fileName"], "draft.md");
        assert_eq!(v["slug"], "draft");
    }
}
