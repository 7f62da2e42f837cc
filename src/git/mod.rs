//! Git integration layer.
//!
//! Thin wrappers over `git2` for the clone/commit/push cycle of the
//! working-copy gateway. Everything else in the crate goes through these
//! functions rather than depending on `git2` directly.

mod git2_backend;

pub use git2_backend::{
    attach_branch, check_branch_name, clone_repo, commit_path, push_branch, redact, set_identity,
    set_transport_timeout,
};
