//! Title <-> slug conversions.
//!
//! A slug is the file stem of a post inside the posts directory, so it must be
//! safe both in a URL segment and as a file name.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use crate::error::{StoreError, StoreResult};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-]+").unwrap());

/// Derive the slug for a title.
///
/// Lower-cases, turns whitespace runs into a single `-`, drops everything that
/// is not an ASCII word character or `-`, then trims `-` from both ends.
///
/// Titles that normalize to nothing (pure punctuation, non-Latin scripts) get
/// `post-<12 hex chars of sha256(title)>` so the same title always maps to the
/// same file.
///
/// ```
/// assert_eq!(gitpost::to_slug("My First Post"), "my-first-post");
/// assert_eq!(gitpost::to_slug("Hello, World!"), "hello-world");
/// ```
pub fn to_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let hyphenated = WHITESPACE.replace_all(&lowered, "-");
    let stripped = NON_WORD.replace_all(&hyphenated, "");
    let trimmed = stripped.trim_matches('-');
    if trimmed.is_empty() {
        fallback_slug(title)
    } else {
        trimmed.to_string()
    }
}

fn fallback_slug(title: &str) -> String {
    let digest = Sha256::digest(title.as_bytes());
    format!("post-{}", &hex::encode(digest)[..12])
}

/// Listing label for a stored file name: drop `.{extension}`, hyphens become spaces.
///
/// Case and punctuation lost by [`to_slug`] are not recovered.
pub fn to_display_name(file_name: &str, extension: &str) -> String {
    let suffix = format!(".{}", extension);
    file_name
        .strip_suffix(&suffix)
        .unwrap_or(file_name)
        .replace('-', " ")
}

/// Page heading for a slug: each hyphen-separated word capitalized.
pub fn to_heading(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reject slugs that cannot name a single file inside the posts directory.
///
/// Slugs are not required to be in [`to_slug`] normal form: files created by
/// other tools are still readable by the name the listing reports.
pub fn check_slug(slug: &str) -> StoreResult<()> {
    if slug.trim().is_empty() {
        return Err(StoreError::validation("Post slug is required."));
    }
    let bad = slug == "."
        || slug == ".."
        || slug
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control() || c.is_whitespace());
    if bad {
        return Err(StoreError::validation(format!("invalid post slug: {:?}", slug)));
    }
    Ok(())
}
