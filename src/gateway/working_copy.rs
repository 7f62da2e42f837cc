use anyhow::Context;
use git2::Repository;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use super::{DocumentSink, PostsLayout, WriteReceipt};
use crate::config::{Identity, Settings};
use crate::document::Draft;
use crate::error::{StoreError, StoreResult};
use crate::git::{
    attach_branch, check_branch_name, clone_repo, commit_path, push_branch, redact, set_identity,
    set_transport_timeout,
};
use crate::slug::to_slug;
use crate::workspace::{ScratchDir, reset_dir};

/// Everything needed to clone, commit to, and push the remote.
#[derive(Debug, Clone)]
pub struct RemoteTarget {
    pub url: String,
    pub token: String,
    pub branch: Option<String>,
    pub author: Identity,
    /// Connect and read timeout for git transports.
    pub timeout: Duration,
}

impl RemoteTarget {
    pub fn from_settings(settings: &Settings) -> Self {
        RemoteTarget {
            url: settings.remote_url.clone(),
            token: settings.token.clone(),
            branch: settings.branch.clone(),
            author: settings.author.clone(),
            timeout: settings.timeout,
        }
    }
}

/// A fresh clone of the remote with a local commit identity.
pub struct WorkingCopy {
    repo: Repository,
    root: PathBuf,
    branch: String,
    token: String,
}

impl WorkingCopy {
    /// Remove whatever is at `dir`, clone the remote into it, and set the
    /// commit identity for this clone only.
    ///
    /// Calling this again on the same `dir` always starts over from a clean
    /// clone, whatever state a previous attempt left behind.
    pub fn prepare(dir: &Path, remote: &RemoteTarget) -> StoreResult<Self> {
        let prepared = (|| -> anyhow::Result<Self> {
            reset_dir(dir)?;
            set_transport_timeout(remote.timeout)?;
            let repo = clone_repo(&remote.url, dir, &remote.token)?;
            set_identity(&repo, &remote.author)?;
            let branch = attach_branch(&repo, remote.branch.as_deref())?;
            Ok(WorkingCopy {
                repo,
                root: dir.to_path_buf(),
                branch,
                token: remote.token.clone(),
            })
        })();
        prepared.map_err(|e| {
            error!(remote = %redact(&remote.url), error = %format!("{:#}", e), "preparing working copy failed");
            StoreError::from_chain(e)
        })
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the post, commit exactly its path, and push.
    ///
    /// On failure the clone is left as is; the next [`WorkingCopy::prepare`]
    /// discards it.
    pub fn write(&self, layout: &PostsLayout, draft: &Draft) -> StoreResult<WriteReceipt> {
        let slug = to_slug(&draft.title);
        let rel = PathBuf::from(layout.path(&slug));

        let pushed = (|| -> anyhow::Result<()> {
            let abs = self.root.join(&rel);
            if let Some(parent) = abs.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::write(&abs, draft.encode()).with_context(|| format!("write {}", rel.display()))?;

            let message = format!("docs: add new post \"{}\"", draft.title);
            let oid = commit_path(&self.repo, &rel, &message)?;
            push_branch(&self.repo, &self.branch, &self.token)?;
            info!(%slug, commit = %oid, branch = %self.branch, "post pushed from working copy");
            Ok(())
        })();

        pushed.map_err(|e| {
            error!(%slug, error = %format!("{:#}", e), "working copy write failed");
            StoreError::from_chain(e)
        })?;

        Ok(WriteReceipt {
            file_name: layout.file_name(&slug),
            slug,
        })
    }
}

/// Writes through a throwaway clone: prepare, write, commit, push, discard.
///
/// Every call gets its own scratch directory, so concurrent writes in one
/// process never share a work tree. Pushes that lose a race against another
/// writer fail as non-fast-forward and are reported, not retried.
#[derive(Debug, Clone)]
pub struct WorkingCopyGateway {
    remote: RemoteTarget,
    layout: PostsLayout,
    scratch_root: PathBuf,
}

impl WorkingCopyGateway {
    pub fn new(settings: &Settings) -> StoreResult<Self> {
        if let Some(b) = &settings.branch {
            check_branch_name(b)
                .map_err(|e| StoreError::ConfigurationMissing(vec![e.to_string()]))?;
        }
        Ok(WorkingCopyGateway::with_parts(
            RemoteTarget::from_settings(settings),
            PostsLayout::new(&settings.posts_dir, &settings.extension),
            settings.scratch_dir.clone(),
        ))
    }

    pub fn with_parts(remote: RemoteTarget, layout: PostsLayout, scratch_root: PathBuf) -> Self {
        WorkingCopyGateway {
            remote,
            layout,
            scratch_root,
        }
    }
}

impl DocumentSink for WorkingCopyGateway {
    fn write(&self, draft: &Draft) -> StoreResult<WriteReceipt> {
        let scratch = ScratchDir::acquire(&self.scratch_root).map_err(StoreError::from_chain)?;
        let wc = WorkingCopy::prepare(&scratch.path().join("repo"), &self.remote)?;
        wc.write(&self.layout, draft)
    }
}
