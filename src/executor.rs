//! Turns a planned pipeline into connected child processes.
//!
//! For `n` stages the parent creates `n - 1` pipes and forks `n` children.
//! Every child wires its redirections and pipe ends onto fd 0/1, closes all
//! other pipe descriptors, and then either runs a builtin or replaces its
//! image with the external program. The parent keeps no pipe write end
//! open, so end-of-file reaches each reader once its writer exits.

use crate::builtin::Builtins;
use crate::command::ExitCode;
use crate::pipeline::{Pipeline, StagePlan};
use crate::session::Session;
use crate::terminal;
use anyhow::Result;
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execvp, fork, pipe};
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::mem::ManuallyDrop;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

const STDIN: RawFd = libc::STDIN_FILENO;
const STDOUT: RawFd = libc::STDOUT_FILENO;

/// Runs pipelines, dispatching each stage to a builtin or an external program.
#[derive(Default)]
pub struct Executor {
    builtins: Builtins,
}

/// Pipe descriptors a child must put in place of its stdin/stdout.
struct StageIo {
    /// Read end of the pipe from the previous stage.
    stdin: Option<OwnedFd>,
    /// Both ends of the pipe to the next stage.
    stdout: Option<(OwnedFd, OwnedFd)>,
}

impl Executor {
    /// Run `pipeline` to completion.
    ///
    /// Diagnostics for the user (syntax errors, failed stages) go to `out`.
    /// A `cd` or `exit` as the first command runs in the shell itself and
    /// discards every later stage.
    pub fn execute(
        &self,
        pipeline: &Pipeline,
        session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<()> {
        let plans = match pipeline.plan() {
            Ok(plans) => plans,
            Err(e) => {
                writeln!(out, "{}", e)?;
                return Ok(());
            }
        };
        let Some(first) = plans.first() else {
            return Ok(());
        };
        tracing::debug!(?plans, "planned pipeline");

        match first.name() {
            "cd" => {
                if let Some(cd) = self.builtins.find(first.name(), first.args()) {
                    cd.execute(out, session)?;
                }
                return Ok(());
            }
            "exit" => {
                session.should_exit = true;
                return Ok(());
            }
            _ => {}
        }

        // Nothing buffered may be duplicated into the children.
        out.flush()?;
        io::stdout().flush()?;

        let spawned = self.spawn_all(&plans, session, out)?;
        for (pid, plan) in spawned {
            if wait_for(pid)? != 0 {
                writeln!(out, "Failed to execute {}", plan.name())?;
            }
        }
        Ok(())
    }

    /// Fork one child per stage, connecting neighbours with pipes.
    ///
    /// All stages are started before any of them is waited for, so a stage
    /// that fills its pipe always has a reader.
    fn spawn_all<'p>(
        &self,
        plans: &'p [StagePlan],
        session: &mut Session,
        out: &mut dyn Write,
    ) -> Result<Vec<(Pid, &'p StagePlan)>> {
        let mut spawned = Vec::with_capacity(plans.len());
        let mut prev_read: Option<OwnedFd> = None;

        for (i, plan) in plans.iter().enumerate() {
            let next = if i + 1 < plans.len() {
                match pipe() {
                    Ok(ends) => Some(ends),
                    Err(e) => {
                        tracing::warn!(stage = i, error = %e, "pipe failed");
                        writeln!(out, "Failed to execute {}", plan.name())?;
                        break;
                    }
                }
            } else {
                None
            };

            // SAFETY: the child only rewires descriptors and then execs or
            // runs a builtin before exiting; it never returns to the caller.
            match unsafe { fork() } {
                Ok(ForkResult::Child) => {
                    let pipes = StageIo {
                        stdin: prev_read.take(),
                        stdout: next,
                    };
                    let code = self.run_child(plan, pipes, session);
                    // SAFETY: _exit skips atexit handlers and destructors,
                    // none of which may run in a forked copy of the shell.
                    unsafe { libc::_exit(code) }
                }
                Ok(ForkResult::Parent { child }) => {
                    tracing::info!(stage = i, command = plan.name(), pid = %child, "spawned");
                    spawned.push((child, plan));
                    // The old read end now belongs to the child alone; the
                    // parent keeps only the new read end for the next stage.
                    prev_read = next.map(|(read, _write)| read);
                }
                Err(e) => {
                    tracing::warn!(stage = i, error = %e, "fork failed");
                    writeln!(out, "Failed to execute {}", plan.name())?;
                    break;
                }
            }
        }
        Ok(spawned)
    }

    /// Body of a forked child. Only returns when the stage is finished or
    /// could not start; the caller `_exit`s with the returned code, so no
    /// destructor of the parent's state (the raw-mode guard included) runs
    /// in the child.
    fn run_child(&self, plan: &StagePlan, pipes: StageIo, session: &mut Session) -> ExitCode {
        terminal::reset_signal_handlers();

        if let Some(path) = &plan.input {
            match File::open(path) {
                Ok(file) => {
                    if redirect(&file, STDIN).is_err() {
                        return 1;
                    }
                }
                Err(_) => {
                    let _ = writeln!(child_stdout(), "File \"{}\" does not exist!", path.display());
                    return 1;
                }
            }
        }

        if let Some(path) = &plan.output {
            let opened = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o644)
                .open(path);
            match opened {
                Ok(file) => {
                    if redirect(&file, STDOUT).is_err() {
                        return 1;
                    }
                }
                Err(e) => {
                    let _ = writeln!(child_stdout(), "{}: {}", path.display(), e);
                    return 1;
                }
            }
        }

        if let Some(read) = pipes.stdin {
            if redirect(&read, STDIN).is_err() {
                return 1;
            }
        }
        if let Some((_read, write)) = pipes.stdout {
            if redirect(&write, STDOUT).is_err() {
                return 1;
            }
        }

        match self.builtins.find(plan.name(), plan.args()) {
            Some(cmd) => {
                // A builtin reports its own failures; the stage still succeeds.
                if let Err(e) = cmd.execute(&mut *child_stdout(), session) {
                    tracing::debug!(command = plan.name(), error = %e, "builtin failed");
                }
                0
            }
            None => exec(plan),
        }
    }
}

/// Replace the process image with `plan`'s program, searched in `PATH`.
///
/// Returns only when the program could not be started.
fn exec(plan: &StagePlan) -> ExitCode {
    let argv: Vec<CString> = match plan
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect()
    {
        Ok(argv) => argv,
        Err(_) => return 1,
    };
    let Err(e) = execvp(&argv[0], &argv);
    tracing::debug!(command = plan.name(), error = %e, "exec failed");
    1
}

/// Descriptor 1 of a forked child.
///
/// Children never use `std::io::stdout()`: its lock may have been held by
/// another thread of the parent at fork time, and it would never be released.
fn child_stdout() -> ManuallyDrop<File> {
    // SAFETY: fd 1 stays open until the child exits and is never closed
    // through this handle.
    ManuallyDrop::new(unsafe { File::from_raw_fd(STDOUT) })
}

/// Make `target` refer to the same open file as `fd`.
fn redirect(fd: &impl AsRawFd, target: RawFd) -> nix::Result<()> {
    // SAFETY: both descriptors are open for the duration of the call and
    // dup2 does not take ownership of either.
    Errno::result(unsafe { libc::dup2(fd.as_raw_fd(), target) }).map(drop)
}

/// Block until `pid` terminates and return its exit code.
///
/// A child killed by a signal counts as success here; only an explicit
/// non-zero exit is reported as a failure.
fn wait_for(pid: Pid) -> Result<ExitCode> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                tracing::debug!(%pid, code, "child exited");
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                tracing::info!(%pid, %signal, "child killed by signal");
                return Ok(0);
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
