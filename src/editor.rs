//! Byte-at-a-time line editing with history recall.
//!
//! The editor expects its input to be a terminal in raw mode: every byte
//! arrives as soon as it is typed and nothing is echoed by the terminal
//! itself, so everything the user sees is written here.

use crate::history::History;
use std::io::{self, Read, Write};

const ENTER: u8 = 0x0A;
const END_OF_INPUT: u8 = 0x04;
const ESCAPE: u8 = 0x1B;
const DELETE: u8 = 0x7F;

const ERASE: &[u8] = b"\x08 \x08";
const BELL: &[u8] = b"\x07";

/// How a call to [`LineEditor::read_line`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Enter was pressed; the line may be empty.
    Line(String),
    /// The user asked to leave the shell (Ctrl-D), or input was closed.
    EndOfInput,
}

/// Line being composed during one `read_line` call.
struct Draft {
    buffer: String,
    /// Index of the recalled history entry, `None` while not navigating.
    cursor: Option<usize>,
}

pub struct LineEditor<R, W> {
    input: R,
    output: W,
}

impl<R: Read, W: Write> LineEditor<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// The writer edits are echoed to.
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Read keystrokes until Enter or end of input.
    ///
    /// After every keystroke the screen shows exactly the current buffer.
    pub fn read_line(&mut self, history: &History) -> io::Result<ReadOutcome> {
        let mut draft = Draft {
            buffer: String::new(),
            cursor: None,
        };

        loop {
            let Some(mut byte) = self.next_byte()? else {
                return Ok(ReadOutcome::EndOfInput);
            };

            if byte == ESCAPE {
                let Some(next) = self.next_byte()? else {
                    return Ok(ReadOutcome::EndOfInput);
                };
                if next == b'[' {
                    let Some(code) = self.next_byte()? else {
                        return Ok(ReadOutcome::EndOfInput);
                    };
                    match code {
                        b'A' => self.recall_older(&mut draft, history)?,
                        b'B' => self.recall_newer(&mut draft, history)?,
                        // cursor movement and friends are not supported
                        _ => {}
                    }
                    self.output.flush()?;
                    continue;
                }
                byte = next;
            }

            match byte {
                ENTER => {
                    self.output.write_all(b"\n")?;
                    self.output.flush()?;
                    return Ok(ReadOutcome::Line(draft.buffer));
                }
                END_OF_INPUT => return Ok(ReadOutcome::EndOfInput),
                DELETE => {
                    if draft.buffer.pop().is_some() {
                        self.output.write_all(ERASE)?;
                    } else {
                        self.output.write_all(BELL)?;
                    }
                }
                b if is_printable(b) => {
                    draft.buffer.push(char::from(b));
                    self.output.write_all(&[b])?;
                }
                _ => {}
            }
            self.output.flush()?;
        }
    }

    fn recall_older(&mut self, draft: &mut Draft, history: &History) -> io::Result<()> {
        let index = draft.cursor.map_or(0, |c| c + 1);
        match history.get(index) {
            Some(entry) => {
                self.replace(draft, entry)?;
                draft.cursor = Some(index);
            }
            None => self.output.write_all(BELL)?,
        }
        Ok(())
    }

    fn recall_newer(&mut self, draft: &mut Draft, history: &History) -> io::Result<()> {
        match draft.cursor {
            None => self.output.write_all(BELL)?,
            Some(0) => {
                self.replace(draft, "")?;
                draft.cursor = None;
            }
            Some(c) => {
                let entry = history.get(c - 1).unwrap_or_default();
                self.replace(draft, entry)?;
                draft.cursor = Some(c - 1);
            }
        }
        Ok(())
    }

    /// Erase the buffer on screen one character at a time, then show `entry`.
    fn replace(&mut self, draft: &mut Draft, entry: &str) -> io::Result<()> {
        for _ in 0..draft.buffer.chars().count() {
            self.output.write_all(ERASE)?;
        }
        draft.buffer.clear();
        draft.buffer.push_str(entry);
        self.output.write_all(entry.as_bytes())
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_printable(byte: u8) -> bool {
    (0x20..0x7F).contains(&byte)
}
