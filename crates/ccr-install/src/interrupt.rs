//! Cooperative cancellation on SIGINT / SIGTERM.
//!
//! The signal handler only raises a flag. Child processes in the foreground
//! group get the terminal's signal directly. A signal sent to this process
//! alone does not reach them, so the curl backend polls the flag and kills its
//! child. The engine then observes the flag, returns
//! [`InstallError::Interrupted`](crate::InstallError::Interrupted), and the
//! temporary directories are removed as their guards drop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static PROCESS_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// A flag no signal handler is attached to.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    if let Some(flag) = PROCESS_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Install SIGINT/SIGTERM handlers that raise the returned flag.
///
/// Calling it again returns the same flag.
#[cfg(unix)]
pub fn install_handler() -> std::io::Result<Interrupt> {
    let flag = PROCESS_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false)));
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    for signum in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only performs an atomic store.
        let previous = unsafe { libc::signal(signum, handler) };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(Interrupt(Arc::clone(flag)))
}

#[cfg(not(unix))]
pub fn install_handler() -> std::io::Result<Interrupt> {
    Ok(Interrupt(Arc::clone(
        PROCESS_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false))),
    )))
}
