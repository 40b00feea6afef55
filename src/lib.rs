//! An interactive shell that drives the terminal in raw mode.
//!
//! The crate provides the pieces of a small Unix shell: a byte-at-a-time
//! [`editor::LineEditor`] with history recall, a tokenizer for words and the
//! `|`, `<`, `>` operators, and an [`executor::Executor`] that turns a line
//! into forked processes connected by pipes, with built-ins (`cd`, `pwd`,
//! `ls`, `history`, `exit`) running inside the shell's own processes.
//!
//! The main entry point is [`Shell`], which owns the session state and runs
//! the read-eval loop.

mod builtin;
pub mod command;
pub mod config;
pub mod editor;
pub mod executor;
pub mod history;
pub mod lexer;
pub mod logging;
pub mod pipeline;
mod prompt;
pub mod session;
mod shell;
pub mod terminal;

pub use builtin::Builtins;
pub use config::Config;
pub use shell::Shell;
