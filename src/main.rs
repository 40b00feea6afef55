use rawsh::editor::LineEditor;
use rawsh::terminal::RawMode;
use rawsh::{Config, Shell, logging};
use std::fs::File;
use std::io;
use std::os::fd::AsFd;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config: Config = argh::from_env();

    if let Some(path) = &config.log_file {
        if let Err(e) = logging::init_global(path) {
            eprintln!("rawsh: {:#}", e);
            return ExitCode::FAILURE;
        }
    }

    let stdin = io::stdin();
    let _raw = match RawMode::enter(&stdin) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Unbuffered reads, so nothing typed ahead is kept from child processes.
    let tty = match stdin.as_fd().try_clone_to_owned() {
        Ok(fd) => File::from(fd),
        Err(e) => {
            eprintln!("rawsh: can't read from the terminal: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut shell = Shell::new(&config);
    let mut editor = LineEditor::new(tty, io::stdout());
    match shell.repl(&mut editor) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "shell loop failed");
            eprintln!("rawsh: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
