//! Cooperative shutdown for the processor loop.
//!
//! SIGINT and SIGTERM only set a flag. The loop checks it between cycles and
//! between events, so the in-flight event always completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static SIGNALLED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    SIGNALLED.store(true, Ordering::SeqCst);
}

/// Shared shutdown request.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    watch_signals: bool,
}

impl Shutdown {
    /// A flag only set through [`Shutdown::request`].
    pub fn new() -> Self {
        Shutdown::default()
    }

    /// Install SIGINT/SIGTERM handlers and watch for them.
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            for signum in [libc::SIGINT, libc::SIGTERM] {
                // SAFETY: the handler only stores to an atomic.
                let previous = unsafe { libc::signal(signum, handler) };
                if previous == libc::SIG_ERR {
                    return Err(std::io::Error::last_os_error());
                }
            }
        }
        Ok(Shutdown {
            flag: Arc::new(AtomicBool::new(false)),
            watch_signals: true,
        })
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || (self.watch_signals && SIGNALLED.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_shared_between_clones() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        assert!(!other.is_requested());
        shutdown.request();
        assert!(other.is_requested());
    }
}
