//! Repository bootstrap: open, clone, or init.
//!
//! Startup order: try to open an existing repository at the store root;
//! otherwise, when a remote is configured, attempt a shallow single-branch
//! clone; otherwise fall back to a fresh init whose `HEAD` points at the
//! configured branch so the first commit lands there. Remote access uses
//! HTTP basic auth with the literal username `token`.

use std::path::Path;

use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, RemoteCallbacks, Repository};
use syncbox_core::Config;
use tracing::{info, warn};

/// Open, clone, or initialize the repository at `cfg.dir`.
///
/// Returns `None` when bootstrap fails entirely; the [`Syncer`] then runs
/// every operation as a logged no-op.
///
/// [`Syncer`]: crate::Syncer
#[must_use]
pub fn init_repo(cfg: &Config) -> Option<Repository> {
    if let Err(e) = std::fs::create_dir_all(&cfg.dir) {
        warn!(dir = %cfg.dir, error = %e, "cannot create store directory, sync disabled");
        return None;
    }
    match open_or_init(cfg) {
        Ok(repo) => Some(repo),
        Err(e) => {
            warn!(error = %e, "repository bootstrap failed, sync disabled");
            None
        }
    }
}

fn open_or_init(cfg: &Config) -> Result<Repository, git2::Error> {
    if let Ok(repo) = Repository::open(&cfg.dir) {
        info!(dir = %cfg.dir, "opened existing repository");
        return Ok(repo);
    }

    if cfg.remote_enabled() {
        info!(url = %cfg.repo, branch = %cfg.branch, "cloning remote repository");
        match clone(cfg) {
            Ok(repo) => {
                info!("cloned successfully");
                return Ok(repo);
            }
            Err(e) => warn!(error = %e, "clone failed, initializing fresh repository"),
        }
    }

    let repo = Repository::init(&cfg.dir)?;

    // A fresh init points HEAD at the libgit2 default branch; repoint it so
    // the first commit lands on the configured branch.
    repo.set_head(&format!("refs/heads/{}", cfg.branch))?;

    if cfg.remote_enabled() {
        if let Err(e) = repo.remote("origin", &cfg.repo) {
            warn!(error = %e, "failed to register origin remote");
        }
    }

    info!(dir = %cfg.dir, branch = %cfg.branch, "initialized new repository");
    Ok(repo)
}

fn clone(cfg: &Config) -> Result<Repository, git2::Error> {
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks(&cfg.token));
    fetch.depth(1);
    RepoBuilder::new()
        .branch(&cfg.branch)
        .fetch_options(fetch)
        .clone(&cfg.repo, Path::new(&cfg.dir))
}

/// Remote callbacks carrying basic-auth credentials when a token is set.
/// The remote sees the literal username `token` and the configured token as
/// the password.
pub(crate) fn callbacks(token: &str) -> RemoteCallbacks<'static> {
    let mut cbs = RemoteCallbacks::new();
    if !token.is_empty() {
        let token = token.to_owned();
        cbs.credentials(move |_url, _username, _allowed| {
            Cred::userpass_plaintext("token", &token)
        });
    }
    cbs
}
