use crate::config::Config;
use crate::editor::{LineEditor, ReadOutcome};
use crate::executor::Executor;
use crate::lexer::split_into_tokens;
use crate::pipeline::Pipeline;
use crate::prompt::format_prompt;
use crate::session::Session;
use anyhow::Result;
use std::env;
use std::io::{Read, Write};

/// The interactive shell: reads a line, remembers it, runs it, repeats.
///
/// Example
/// ```no_run
/// use rawsh::{Config, Shell};
/// let mut sh = Shell::new(&Config::default());
/// sh.execute_line("echo hello | wc -c", &mut std::io::stdout()).unwrap();
/// ```
pub struct Shell {
    session: Session,
    executor: Executor,
    show_prompt: bool,
}

impl Shell {
    pub fn new(config: &Config) -> Self {
        Self {
            session: Session::new(config),
            executor: Executor::default(),
            show_prompt: !config.no_prompt,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Parse and run one command line. Shell diagnostics are written to `out`.
    pub fn execute_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let tokens = split_into_tokens(line);
        if tokens.is_empty() {
            return Ok(());
        }
        tracing::debug!(?tokens, "tokenized line");
        let pipeline = Pipeline::split(tokens);
        self.executor.execute(&pipeline, &mut self.session, out)
    }

    /// Read-eval loop. Returns on end of input or after `exit`.
    pub fn repl<R: Read, W: Write>(&mut self, editor: &mut LineEditor<R, W>) -> Result<()> {
        while !self.session.should_exit {
            if self.show_prompt {
                let prompt = match env::current_dir() {
                    Ok(dir) => format_prompt(&dir),
                    Err(_) => "> ".to_string(),
                };
                editor.output().write_all(prompt.as_bytes())?;
                editor.output().flush()?;
            }

            let line = match editor.read_line(&self.session.history)? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::EndOfInput => {
                    tracing::info!("end of input");
                    break;
                }
            };
            self.session.remember(&line);
            self.execute_line(&line, editor.output())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn quiet_shell() -> Shell {
        Shell::new(&Config {
            no_prompt: true,
            ..Config::default()
        })
    }

    fn run_repl(shell: &mut Shell, input: &[u8]) -> String {
        let mut editor = LineEditor::new(Cursor::new(input.to_vec()), Vec::new());
        shell.repl(&mut editor).unwrap();
        String::from_utf8(editor.output().clone()).unwrap()
    }

    #[test]
    fn test_exit_stops_loop_and_is_recorded() {
        let mut shell = quiet_shell();
        let out = run_repl(&mut shell, b"exit\nexit\n");

        assert!(shell.session().should_exit);
        assert_eq!(out, "exit\n");
        assert_eq!(shell.session().history.len(), 1);
    }

    #[test]
    fn test_end_of_input_stops_loop() {
        let mut shell = quiet_shell();
        let out = run_repl(&mut shell, b"\x04");
        assert!(!shell.session().should_exit);
        assert_eq!(out, "");
    }

    #[test]
    fn test_syntax_errors_are_reported_and_loop_continues() {
        let mut shell = quiet_shell();
        let out = run_repl(&mut shell, b"ls |\n  \ncat <\nexit\n");

        assert_eq!(
            out,
            "ls |\nsyntax error: empty command in pipeline\n  \n\
             cat <\nsyntax error: missing file name after '<'\nexit\n"
        );
        let listed: Vec<String> = shell.session().history.list().collect();
        assert_eq!(listed, vec!["0 exit", "1 cat <", "2 ls |"]);
    }

    #[test]
    fn test_previous_line_can_be_recalled() {
        let mut shell = quiet_shell();
        run_repl(&mut shell, b"exit 1\n");
        shell.session_mut().should_exit = false;

        let out = run_repl(&mut shell, b"\x1b[A\n");
        assert_eq!(out, "exit 1\n");
        assert!(shell.session().should_exit);
        assert_eq!(shell.session().history.get(0), Some("exit 1"));
        assert_eq!(shell.session().history.get(1), Some("exit 1"));
    }

    #[test]
    fn test_prompt_is_printed_before_each_line() {
        let _lock = crate::builtin::tests::lock_current_dir();
        let mut shell = Shell::new(&Config::default());
        let dir = env::current_dir().unwrap();
        let out = run_repl(&mut shell, b"\x04");
        assert_eq!(out, format_prompt(&dir));
    }
}
