//! Cancellation shared between the signal handlers and in-flight work
//!
//! A `CancelToken` is a cloneable handle over one flag. Blocking code (the
//! gix clone) polls the flag directly, async code awaits `cancelled()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct CancelToken {
    requested: Arc<AtomicBool>,
    notify: broadcast::Sender<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(8);
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            notify,
        }
    }

    /// Request cancellation of everything holding this token
    pub fn cancel(&self) {
        self.requested.store(true, Ordering::Release);
        let _ = self.notify.send(());
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Completes once `cancel()` has been called
    pub async fn cancelled(&self) {
        // Subscribe before checking the flag so a concurrent cancel is not missed
        let mut rx = self.notify.subscribe();
        if self.is_cancelled() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancel `token` on SIGINT/SIGTERM/SIGHUP/SIGQUIT (Ctrl-C elsewhere).
///
/// A second signal exits the process immediately with status 130.
pub fn install_signal_handlers(token: CancelToken) {
    #[cfg(unix)]
    {
        use std::sync::atomic::AtomicUsize;
        use tokio::signal::unix::{signal, SignalKind};

        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        let signal_count = Arc::new(AtomicUsize::new(0));
        let signals = [
            SignalKind::interrupt(),
            SignalKind::terminate(),
            SignalKind::hangup(),
            SignalKind::quit(),
        ];

        for kind in signals {
            let token = token.clone();
            let sig_ctr = signal_count.clone();

            tokio::spawn(async move {
                if let Ok(mut sig) = signal(kind) {
                    while sig.recv().await.is_some() {
                        let prev = sig_ctr.fetch_add(1, Ordering::AcqRel);
                        if prev >= 1 {
                            log::warn!("Second signal received; exiting");
                            std::process::exit(130);
                        }
                        log::warn!("Signal received; cancelling running scan");
                        token.cancel();
                    }
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Ctrl-C received; cancelling running scan");
                token.cancel();
            }
        });
    }
}
