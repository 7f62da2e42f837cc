use anyhow::{Context, Result, anyhow, bail};
use git2::{
    BranchType, ConfigLevel, Cred, CredentialType, ErrorCode, FetchOptions, Oid, PushOptions,
    Reference, RemoteCallbacks, Repository,
    build::{CheckoutBuilder, RepoBuilder},
};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::Identity;

/// Branch used when the remote has no commits and none is configured.
const EMPTY_REMOTE_BRANCH: &str = "main";

static TRANSPORT_TIMEOUT: OnceLock<Duration> = OnceLock::new();

/// Bound libgit2's connect and read waits so a hung forge fails the clone or
/// push instead of blocking it.
///
/// libgit2 keeps these as process-wide options, so only the first call sets
/// them; the timeout actually in effect is returned.
pub fn set_transport_timeout(timeout: Duration) -> Result<Duration> {
    let mut applied = Ok(());
    let effective = *TRANSPORT_TIMEOUT.get_or_init(|| {
        let ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        // SAFETY: runs once per process, guarded by the OnceLock.
        applied = unsafe {
            git2::opts::set_server_connect_timeout_in_milliseconds(ms)
                .and_then(|()| git2::opts::set_server_timeout_in_milliseconds(ms))
        };
        timeout
    });
    applied.context("set git transport timeout")?;
    Ok(effective)
}

/// Build `RemoteCallbacks` that answer credential requests with the access token.
///
/// HTTPS remotes get `x-access-token:<token>`; SSH remotes fall back to the
/// agent. libgit2 retries the callback on rejected credentials, so give up
/// after a few attempts instead of looping.
fn callbacks_with_token(token: &str) -> RemoteCallbacks<'static> {
    let token = token.to_string();
    let mut attempts = 0u8;
    let mut cb = RemoteCallbacks::new();
    cb.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        if attempts > 3 {
            return Err(git2::Error::from_str("authentication failed"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            Cred::userpass_plaintext("x-access-token", &token)
        } else if allowed.contains(CredentialType::SSH_KEY) {
            Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
        } else {
            Cred::default()
        }
    });
    cb
}

/// Strip userinfo from a URL before it reaches logs or error messages.
pub fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let host_end = rest.find('/').unwrap_or(rest.len());
    match rest[..host_end].rfind('@') {
        Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
        None => url.to_string(),
    }
}

/// Clone `url` into `dest`, which must be absent or empty.
///
/// # Errors
/// Returns an error if the transport, authentication, or checkout fails.
pub fn clone_repo(url: &str, dest: &Path, token: &str) -> Result<Repository> {
    let mut fo = FetchOptions::new();
    fo.remote_callbacks(callbacks_with_token(token));

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fo);
    builder
        .clone(url, dest)
        .with_context(|| format!("git clone {}", redact(url)))
}

/// Set `user.name` / `user.email` in the repository's own config only.
pub fn set_identity(repo: &Repository, who: &Identity) -> Result<()> {
    let mut cfg = repo
        .config()?
        .open_level(ConfigLevel::Local)
        .context("open local git config")?;
    cfg.set_str("user.name", &who.name)?;
    cfg.set_str("user.email", &who.email)?;
    Ok(())
}

/// Name of the branch HEAD points at, even if it has no commits yet.
fn head_branch(repo: &Repository) -> Result<String> {
    let head = repo.find_reference("HEAD")?;
    let target = head
        .symbolic_target()
        .ok_or_else(|| anyhow!("HEAD is detached"))?;
    Ok(target
        .strip_prefix("refs/heads/")
        .unwrap_or(target)
        .to_string())
}

fn is_unborn(repo: &Repository) -> bool {
    matches!(repo.head(), Err(e) if e.code() == ErrorCode::UnbornBranch)
}

/// Attach HEAD to the given branch reference and update the working tree.
fn checkout_attach_to_reference(repo: &Repository, reference: &Reference) -> Result<()> {
    let name = reference
        .name()
        .ok_or_else(|| anyhow!("invalid reference name"))?;
    repo.set_head(name)?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    Ok(())
}

/// Put HEAD on the branch commits will be pushed to and return its name.
///
/// - `wanted == None`: stay on the branch the clone checked out (the remote's
///   default branch). An empty remote gets `main`.
/// - `wanted == Some(b)`: attach a local branch tracking `origin/<b>`. On an
///   empty remote, HEAD is simply pointed at `refs/heads/<b>`.
///
/// # Errors
/// Returns an error if `b` does not exist on a non-empty remote.
pub fn attach_branch(repo: &Repository, wanted: Option<&str>) -> Result<String> {
    if is_unborn(repo) {
        let branch = wanted.unwrap_or(EMPTY_REMOTE_BRANCH);
        repo.set_head(&format!("refs/heads/{}", branch))?;
        return Ok(branch.to_string());
    }

    let current = head_branch(repo)?;
    let Some(want) = wanted else {
        return Ok(current);
    };
    if want == current {
        return Ok(current);
    }

    let remote_ref = repo
        .find_reference(&format!("refs/remotes/origin/{}", want))
        .with_context(|| format!("branch '{}' not found on remote", want))?;
    let target_commit = remote_ref.peel_to_commit()?;

    let reference = match repo.find_branch(want, BranchType::Local) {
        Ok(b) => b.into_reference(),
        Err(_) => {
            let mut b = repo.branch(want, &target_commit, true)?;
            b.set_upstream(Some(&format!("origin/{}", want)))?;
            b.into_reference()
        }
    };
    checkout_attach_to_reference(repo, &reference)?;
    Ok(want.to_string())
}

/// Stage exactly `rel` (relative to the work tree) and commit it on HEAD.
///
/// Author and committer come from the repository config (see [`set_identity`]).
pub fn commit_path(repo: &Repository, rel: &Path, message: &str) -> Result<Oid> {
    let mut index = repo.index()?;
    index
        .add_path(rel)
        .with_context(|| format!("git add {}", rel.display()))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let sig = repo.signature().context("commit identity")?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
        Err(e) => return Err(e.into()),
    };
    let parents: Vec<_> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .context("git commit")
}

/// Push `refs/heads/<branch>` to `origin` without force.
///
/// # Errors
/// Returns an error if the remote advanced since the clone (non-fast-forward),
/// if the server rejects the ref update, or on transport failure.
pub fn push_branch(repo: &Repository, branch: &str, token: &str) -> Result<()> {
    let mut cb = callbacks_with_token(token);
    cb.push_update_reference(|refname, status| match status {
        Some(msg) => Err(git2::Error::from_str(&format!(
            "remote rejected {}: {}",
            refname, msg
        ))),
        None => Ok(()),
    });
    let mut po = PushOptions::new();
    po.remote_callbacks(cb);

    let spec = format!("refs/heads/{b}:refs/heads/{b}", b = branch);
    let mut remote = repo.find_remote("origin")?;
    remote
        .push(&[spec.as_str()], Some(&mut po))
        .with_context(|| format!("git push origin {}", branch))?;
    Ok(())
}

/// Fail early when `branch` is not a usable ref name.
pub fn check_branch_name(branch: &str) -> Result<()> {
    if !git2::Reference::is_valid_name(&format!("refs/heads/{}", branch)) {
        bail!("invalid branch name: {}", branch);
    }
    Ok(())
}
