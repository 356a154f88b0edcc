//! Repository Acquirer
//!
//! Produces a fresh working copy of a remote repository at a target path,
//! deleting whatever was there before. The clone itself sits behind
//! `CloneBackend` so the removal rules can be exercised without a network.

use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::{AcquireError, AcquireResult};
use super::events::{ProgressEvent, ProgressSink};
use crate::core::cancel::CancelToken;

/// Something that can clone `url` into `dest`.
///
/// Implementations run on the blocking pool and must return promptly once
/// `interrupt` becomes true.
pub trait CloneBackend: Send + Sync {
    fn clone_into(&self, url: &str, dest: &Path, interrupt: &AtomicBool) -> AcquireResult<()>;
}

/// Clone with gix over its blocking network client
#[derive(Debug, Clone, Default)]
pub struct GixCloneBackend {
    /// Shallow clone depth, full history when `None`
    depth: Option<NonZeroU32>,
}

impl GixCloneBackend {
    pub fn new(depth: Option<NonZeroU32>) -> Self {
        Self { depth }
    }
}

impl CloneBackend for GixCloneBackend {
    fn clone_into(&self, url: &str, dest: &Path, interrupt: &AtomicBool) -> AcquireResult<()> {
        validate_url(url)?;

        let clone_error = |e: &dyn std::fmt::Display| AcquireError::Clone {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let mut prepare = gix::prepare_clone(url, dest).map_err(|e| clone_error(&e))?;
        if let Some(depth) = self.depth {
            prepare = prepare.with_shallow(gix::remote::fetch::Shallow::DepthAtRemote(depth));
        }

        log::debug!("Fetching {} into {}", url, dest.display());
        let (mut checkout, _) = prepare
            .fetch_then_checkout(gix::progress::Discard, interrupt)
            .map_err(|e| clone_error(&e))?;

        log::debug!("Checking out main worktree at {}", dest.display());
        let (repo, _) = checkout
            .main_worktree(gix::progress::Discard, interrupt)
            .map_err(|e| clone_error(&e))?;

        log::debug!(
            "Cloned {} (HEAD {})",
            url,
            repo.head_id()
                .map(|id| id.to_hex_with_len(8).to_string())
                .unwrap_or_else(|_| "unborn".to_string())
        );
        Ok(())
    }
}

/// Reject URLs gix cannot parse before touching the network
pub fn validate_url(url: &str) -> AcquireResult<()> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AcquireError::InvalidUrl {
            url: url.to_string(),
            reason: "Repository URL must not be empty.".to_string(),
        });
    }

    gix_url::parse(trimmed.as_bytes().into())
        .map(|_| ())
        .map_err(|e| AcquireError::InvalidUrl {
            url: url.to_string(),
            reason: format!("'{}' is not a valid repository URL: {}", url, e),
        })
}

pub type RemoveDirFn = fn(&Path) -> io::Result<()>;

/// Removes any previous working copy, then clones a fresh one
#[derive(Clone)]
pub struct RepositoryAcquirer {
    backend: Arc<dyn CloneBackend>,
    remove_dir: RemoveDirFn,
    timeout: Option<Duration>,
}

impl RepositoryAcquirer {
    pub fn new(backend: Arc<dyn CloneBackend>) -> Self {
        Self {
            backend,
            remove_dir: |p| std::fs::remove_dir_all(p),
            timeout: None,
        }
    }

    /// Abort clones that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the directory removal routine
    pub fn with_remover(mut self, remove_dir: RemoveDirFn) -> Self {
        self.remove_dir = remove_dir;
        self
    }

    /// Remove `target` if it exists. A permission failure is reported as
    /// `AcquireError::PermissionDenied` and nothing else is attempted.
    pub fn remove_existing(&self, target: &Path, progress: &dyn ProgressSink) -> AcquireResult<()> {
        if !target.exists() {
            return Ok(());
        }

        match (self.remove_dir)(target) {
            Ok(()) => {
                log::warn!("Deleted existing repository directory: {}", target.display());
                progress.notify(&ProgressEvent::RemovedExisting {
                    path: target.to_path_buf(),
                });
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                log::error!("Permission denied deleting {}: {}", target.display(), e);
                Err(AcquireError::permission_denied(target.to_path_buf(), e))
            }
            Err(e) => Err(AcquireError::RemoveFailed {
                path: target.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Produce a fresh clone of `url` at `target`
    pub async fn acquire(
        &self,
        url: &str,
        target: &Path,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> AcquireResult<()> {
        self.remove_existing(target, progress)?;

        if cancel.is_cancelled() {
            return Err(AcquireError::Cancelled {
                url: url.to_string(),
            });
        }

        log::info!("Cloning the repository from {}", url);
        progress.notify(&ProgressEvent::CloneStarted {
            url: url.to_string(),
        });

        self.clone_with_limits(url, target, cancel).await?;

        log::info!("Repository cloned to {}", target.display());
        progress.notify(&ProgressEvent::Cloned {
            path: target.to_path_buf(),
        });
        Ok(())
    }

    async fn clone_with_limits(
        &self,
        url: &str,
        target: &Path,
        cancel: &CancelToken,
    ) -> AcquireResult<()> {
        let interrupt = InterruptOnDrop::default();
        let backend = self.backend.clone();
        let task_url = url.to_string();
        let task_target: PathBuf = target.to_path_buf();
        let task_interrupt = interrupt.0.clone();

        let mut handle = tokio::task::spawn_blocking(move || {
            CloneBackend::clone_into(&*backend, &task_url, &task_target, &task_interrupt)
        });

        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            joined = &mut handle => {
                joined.map_err(|e| AcquireError::Task(e.to_string()))?
            }
            _ = deadline => {
                log::warn!("Clone of {} timed out; interrupting", url);
                interrupt.trigger();
                let _ = handle.await;
                Err(AcquireError::TimedOut {
                    url: url.to_string(),
                    timeout: self.timeout.unwrap_or_default(),
                })
            }
            _ = cancel.cancelled() => {
                log::warn!("Clone of {} cancelled; interrupting", url);
                interrupt.trigger();
                let _ = handle.await;
                Err(AcquireError::Cancelled { url: url.to_string() })
            }
        }
    }
}

/// Interrupts the blocking clone when the awaiting future goes away
#[derive(Default)]
struct InterruptOnDrop(Arc<AtomicBool>);

impl InterruptOnDrop {
    fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        self.trigger();
    }
}

impl std::fmt::Debug for RepositoryAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryAcquirer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
