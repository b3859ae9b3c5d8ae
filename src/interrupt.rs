use std::sync::atomic::{AtomicBool, Ordering};

static PENDING: AtomicBool = AtomicBool::new(false);

/// Routes Ctrl-C to the pending flag instead of terminating the shell.
///
/// Child processes share the terminal's process group, so a running compile
/// or module still receives the signal itself.
pub fn install_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| PENDING.store(true, Ordering::SeqCst))
}

pub fn pending() -> bool {
    PENDING.load(Ordering::SeqCst)
}

pub fn clear() {
    PENDING.store(false, Ordering::SeqCst);
}
