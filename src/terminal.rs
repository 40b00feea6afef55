//! Raw terminal mode for the lifetime of the shell.
//!
//! [`RawMode::enter`] switches the terminal to byte-at-a-time input without
//! echo and returns a guard; dropping the guard puts the saved attributes
//! back. Termination signals restore the attributes too, before the process
//! dies with the default disposition.

use anyhow::{Result, bail};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use std::io::IsTerminal;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::sync::OnceLock;

const RESTORE_SIGNALS: [Signal; 4] = [
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGHUP,
    Signal::SIGQUIT,
];

/// Descriptor and attributes the signal handler restores.
static SAVED: OnceLock<(RawFd, libc::termios)> = OnceLock::new();

/// Guard that keeps the terminal in raw mode until dropped.
pub struct RawMode<'fd> {
    fd: BorrowedFd<'fd>,
    saved: Termios,
}

impl<'fd> RawMode<'fd> {
    /// Put the terminal behind `fd` into unbuffered, unechoed input mode.
    ///
    /// Fails when `fd` is not an interactive terminal.
    pub fn enter<F>(fd: &'fd F) -> Result<Self>
    where
        F: AsFd + IsTerminal,
    {
        if !fd.is_terminal() {
            bail!("Not a terminal.");
        }
        let fd = fd.as_fd();
        let saved = termios::tcgetattr(fd)?;

        let mut raw = saved.clone();
        raw.local_flags &= !(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        let _ = SAVED.set((fd.as_raw_fd(), saved.clone().into()));
        install_restore_handlers();

        termios::tcsetattr(fd, SetArg::TCSAFLUSH, &raw)?;
        tracing::debug!(fd = fd.as_raw_fd(), "terminal switched to raw mode");
        Ok(RawMode { fd, saved })
    }
}

impl Drop for RawMode<'_> {
    fn drop(&mut self) {
        match termios::tcsetattr(self.fd, SetArg::TCSANOW, &self.saved) {
            Ok(()) => tracing::debug!("terminal mode restored"),
            Err(e) => tracing::warn!(error = %e, "failed to restore terminal mode"),
        }
    }
}

extern "C" fn restore_and_reraise(signal: libc::c_int) {
    // SAFETY: tcsetattr, signal and raise are async-signal-safe, and the
    // saved attributes are never mutated after being set.
    unsafe {
        if let Some((fd, attrs)) = SAVED.get() {
            libc::tcsetattr(*fd, libc::TCSANOW, attrs);
        }
        libc::signal(signal, libc::SIG_DFL);
        libc::raise(signal);
    }
}

fn install_restore_handlers() {
    let action = SigAction::new(
        SigHandler::Handler(restore_and_reraise),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in RESTORE_SIGNALS {
        // SAFETY: the handler only calls async-signal-safe functions.
        if let Err(e) = unsafe { sigaction(signal, &action) } {
            tracing::warn!(%signal, error = %e, "failed to install restore handler");
        }
    }
}

/// Put the default disposition back for the signals [`RawMode`] intercepts.
///
/// Forked children call this so that they never touch the shell's terminal
/// settings on their way out.
pub fn reset_signal_handlers() {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in RESTORE_SIGNALS {
        // SAFETY: restoring SIG_DFL has no handler requirements.
        let _ = unsafe { sigaction(signal, &action) };
    }
}
