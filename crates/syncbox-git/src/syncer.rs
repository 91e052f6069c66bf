//! The debounced sync worker.
//!
//! [`Syncer`] owns the repository handle behind a mutex; commits, pushes,
//! and pulls all serialize on it. `trigger()` never blocks the caller: it
//! bumps a generation counter and spawns a task that sleeps the debounce
//! window, then runs the sync only if no later trigger superseded it — a
//! burst of N triggers produces exactly one commit of the post-burst state,
//! no earlier than one debounce after the last trigger.
//!
//! Git work runs on the blocking pool. A trigger landing while a sync holds
//! the mutex simply schedules another debounced sync that waits its turn.
//! All failures are logged, never retried, never surfaced to HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use git2::{FetchOptions, IndexAddOption, PushOptions, Repository, Signature};
use syncbox_core::{Config, SyncTrigger};
use tracing::{debug, info, warn};

use crate::repo::callbacks;

/// Debounced commit/push worker with a periodic pull loop.
///
/// Cheap to clone; all clones share one repository handle and one debounce
/// generation. Construct with the handle from
/// [`init_repo`](crate::init_repo), or `None` for no-op mode.
#[derive(Clone)]
pub struct Syncer {
    inner: Arc<Inner>,
}

struct Inner {
    repo: Mutex<Option<Repository>>,
    remote: String,
    branch: String,
    user: String,
    email: String,
    token: String,
    debounce: Duration,
    generation: AtomicU64,
}

impl Syncer {
    /// Create a worker from configuration and an optional repository
    /// handle. A `None` handle makes every operation a logged no-op.
    #[must_use]
    pub fn new(cfg: &Config, repo: Option<Repository>) -> Self {
        Self {
            inner: Arc::new(Inner {
                repo: Mutex::new(repo),
                remote: cfg.repo.clone(),
                branch: cfg.branch.clone(),
                user: cfg.user.clone(),
                email: cfg.email.clone(),
                token: cfg.token.clone(),
                debounce: cfg.debounce(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Launch the periodic pull loop: sleep `interval`, pull, repeat.
    /// Does nothing without a repository, without a remote, or with a zero
    /// interval. No jitter, no backoff; pull errors are logged and the loop
    /// continues.
    pub fn start_puller(&self, interval: Duration) {
        if self.inner.lock_repo().is_none() {
            return;
        }
        if self.inner.remote.is_empty() || interval.is_zero() {
            return;
        }
        info!(interval_secs = interval.as_secs(), "starting periodic pull");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let worker = Arc::clone(&inner);
                if let Err(e) = tokio::task::spawn_blocking(move || worker.do_pull()).await {
                    warn!(error = %e, "periodic pull task failed");
                }
            }
        });
    }
}

impl SyncTrigger for Syncer {
    fn trigger(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if inner.generation.load(Ordering::SeqCst) != generation {
                // A later trigger re-armed the debounce window.
                return;
            }
            let worker = Arc::clone(&inner);
            if let Err(e) = tokio::task::spawn_blocking(move || worker.do_sync()).await {
                warn!(error = %e, "sync task failed");
            }
        });
    }
}

impl Inner {
    fn lock_repo(&self) -> std::sync::MutexGuard<'_, Option<Repository>> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Commit the working tree and, when a remote is configured, pull then
    /// push. Runs on the blocking pool holding the repo mutex.
    fn do_sync(&self) {
        let guard = self.lock_repo();
        debug!("sync starting");
        let Some(repo) = guard.as_ref() else {
            debug!("no repository configured, skipping sync");
            return;
        };
        if let Err(e) = self.commit_and_push(repo) {
            warn!(error = %e, "sync failed");
        }
    }

    fn do_pull(&self) {
        let guard = self.lock_repo();
        let Some(repo) = guard.as_ref() else {
            debug!("no repository configured, skipping pull");
            return;
        };
        if let Err(e) = self.pull_locked(repo) {
            warn!(error = %e, "pull failed");
        }
    }

    fn commit_and_push(&self, repo: &Repository) -> Result<(), git2::Error> {
        // Stage everything: new and modified files via add_all, deletions of
        // tracked files via update_all. The .git directory is excluded by
        // libgit2 itself.
        let mut index = repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;

        let statuses = repo.statuses(None)?;
        if statuses.is_empty() {
            debug!("no changes to commit");
            return Ok(());
        }

        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let message = format!("sync: {}", Utc::now().format("%Y-%m-%d %H:%M"));
        let signature = Signature::now(&self.user, &self.email)?;
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None, // unborn branch: first commit has no parent
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, &message, &tree, &parents)?;
        info!(%message, "committed working tree");

        if !self.remote.is_empty() {
            // Pull failures (unreachable remote, empty remote) are logged
            // and do not stop the push.
            if let Err(e) = self.pull_locked(repo) {
                warn!(error = %e, "pull before push failed");
            }
            self.push(repo)?;
            info!("pushed to remote");
        }
        Ok(())
    }

    /// Fetch the tracked branch and fast-forward the local one. The caller
    /// must hold the repo mutex.
    fn pull_locked(&self, repo: &Repository) -> Result<(), git2::Error> {
        let mut remote = repo.find_remote("origin")?;
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks(&self.token));
        remote.fetch(&[self.branch.as_str()], Some(&mut fetch), None)?;

        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            debug!("already up to date");
        } else if analysis.is_fast_forward() || analysis.is_unborn() {
            let refname = format!("refs/heads/{}", self.branch);
            match repo.find_reference(&refname) {
                Ok(mut reference) => {
                    reference.set_target(fetch_commit.id(), "pull: fast-forward")?;
                }
                Err(_) => {
                    repo.reference(&refname, fetch_commit.id(), true, "pull: initial")?;
                }
            }
            repo.set_head(&refname)?;
            repo.checkout_head(Some(git2::build::CheckoutBuilder::default().force()))?;
            info!("pulled new changes");
        } else {
            // Local and remote diverged. Merging is out of scope for a
            // single-writer store; leave the local tree alone.
            warn!("pull is not a fast-forward, skipping");
        }
        Ok(())
    }

    fn push(&self, repo: &Repository) -> Result<(), git2::Error> {
        let mut remote = repo.find_remote("origin")?;
        let mut opts = PushOptions::new();
        opts.remote_callbacks(callbacks(&self.token));
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}", branch = self.branch);
        remote.push(&[refspec.as_str()], Some(&mut opts))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use syncbox_core::Config;
    use tempfile::TempDir;

    use super::*;
    use crate::repo::init_repo;

    fn config_for(dir: &Path) -> Config {
        Config::builder()
            .dir(dir.display().to_string())
            .debounce_secs(1)
            .build()
    }

    fn commit_count(dir: &Path) -> usize {
        let repo = Repository::open(dir).expect("open repo");
        let mut walk = repo.revwalk().expect("revwalk");
        if walk.push_head().is_err() {
            return 0; // unborn HEAD
        }
        walk.count()
    }

    // -----------------------------------------------------------------------
    // No-op mode
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_should_accept_trigger_and_sync_without_repository() {
        let dir = TempDir::new().expect("tempdir");
        let syncer = Syncer::new(&config_for(dir.path()), None);
        syncer.trigger();
        syncer.inner.do_sync();
        syncer.inner.do_pull();
    }

    #[tokio::test]
    async fn test_should_not_start_puller_without_repository() {
        let dir = TempDir::new().expect("tempdir");
        let syncer = Syncer::new(&config_for(dir.path()), None);
        syncer.start_puller(Duration::from_secs(1));
    }

    // -----------------------------------------------------------------------
    // Committing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_should_commit_working_tree_changes() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = config_for(dir.path());
        let repo = init_repo(&cfg).expect("init repo");
        std::fs::write(dir.path().join("note.md"), "hello").expect("write file");

        let syncer = Syncer::new(&cfg, Some(repo));
        syncer.inner.do_sync();

        assert_eq!(commit_count(dir.path()), 1);

        let repo = Repository::open(dir.path()).expect("open repo");
        let head = repo.head().expect("head").peel_to_commit().expect("commit");
        assert!(head.message().unwrap_or_default().starts_with("sync: "));
        assert_eq!(head.author().name(), Some("syncbox"));
    }

    #[tokio::test]
    async fn test_should_not_commit_when_tree_is_clean() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = config_for(dir.path());
        let repo = init_repo(&cfg).expect("init repo");
        std::fs::write(dir.path().join("note.md"), "hello").expect("write file");

        let syncer = Syncer::new(&cfg, Some(repo));
        syncer.inner.do_sync();
        let first = commit_count(dir.path());
        syncer.inner.do_sync();

        assert_eq!(commit_count(dir.path()), first);
    }

    #[tokio::test]
    async fn test_should_commit_deletions() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = config_for(dir.path());
        let repo = init_repo(&cfg).expect("init repo");
        std::fs::write(dir.path().join("note.md"), "hello").expect("write file");

        let syncer = Syncer::new(&cfg, Some(repo));
        syncer.inner.do_sync();
        std::fs::remove_file(dir.path().join("note.md")).expect("remove file");
        syncer.inner.do_sync();

        assert_eq!(commit_count(dir.path()), 2);
        let repo = Repository::open(dir.path()).expect("open repo");
        let tree = repo
            .head()
            .expect("head")
            .peel_to_commit()
            .expect("commit")
            .tree()
            .expect("tree");
        assert!(tree.get_name("note.md").is_none());
    }

    // -----------------------------------------------------------------------
    // Debounce
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_should_coalesce_trigger_burst_into_one_commit() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = config_for(dir.path());
        let repo = init_repo(&cfg).expect("init repo");
        std::fs::write(dir.path().join("note.md"), "hello").expect("write file");

        let syncer = Syncer::new(&cfg, Some(repo));
        for _ in 0..5 {
            syncer.trigger();
        }
        tokio::time::sleep(Duration::from_millis(1800)).await;

        assert_eq!(commit_count(dir.path()), 1);
    }

    // -----------------------------------------------------------------------
    // Remote round trips (local filesystem remotes)
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_should_push_commits_to_remote() {
        let remote_dir = TempDir::new().expect("remote tempdir");
        Repository::init_bare(remote_dir.path()).expect("init bare");

        let work_dir = TempDir::new().expect("work tempdir");
        let cfg = Config::builder()
            .dir(work_dir.path().display().to_string())
            .repo(remote_dir.path().display().to_string())
            .debounce_secs(1)
            .build();
        let repo = init_repo(&cfg).expect("init repo");
        std::fs::write(work_dir.path().join("note.md"), "hello").expect("write file");

        let syncer = Syncer::new(&cfg, Some(repo));
        syncer.inner.do_sync();

        let bare = Repository::open_bare(remote_dir.path()).expect("open bare");
        let branch = bare
            .find_reference("refs/heads/main")
            .expect("pushed branch should exist");
        let commit = branch.peel_to_commit().expect("commit");
        assert!(commit.message().unwrap_or_default().starts_with("sync: "));
    }

    #[tokio::test]
    async fn test_should_pull_changes_from_remote() {
        let remote_dir = TempDir::new().expect("remote tempdir");
        Repository::init_bare(remote_dir.path()).expect("init bare");

        // Writer A commits and pushes.
        let a_dir = TempDir::new().expect("a tempdir");
        let a_cfg = Config::builder()
            .dir(a_dir.path().display().to_string())
            .repo(remote_dir.path().display().to_string())
            .debounce_secs(1)
            .build();
        let a_repo = init_repo(&a_cfg).expect("init a");
        std::fs::write(a_dir.path().join("shared.md"), "from a").expect("write file");
        let a_syncer = Syncer::new(&a_cfg, Some(a_repo));
        a_syncer.inner.do_sync();

        // Reader B hydrates via pull.
        let b_dir = TempDir::new().expect("b tempdir");
        let b_cfg = Config::builder()
            .dir(b_dir.path().display().to_string())
            .repo(remote_dir.path().display().to_string())
            .debounce_secs(1)
            .build();
        let b_repo = init_repo(&b_cfg).expect("init b");
        let b_syncer = Syncer::new(&b_cfg, Some(b_repo));
        b_syncer.inner.do_pull();

        let pulled = std::fs::read_to_string(b_dir.path().join("shared.md"))
            .expect("pulled file should exist");
        assert_eq!(pulled, "from a");
    }
}
