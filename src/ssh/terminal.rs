// SSH Honeypot - Terminal Line Discipline
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Raw keystrokes to complete lines
//!
//! SSH clients in interactive mode send one keystroke at a time and expect
//! the server to echo. This editor does the echoing, handles backspace,
//! Ctrl+C/Ctrl+D/Ctrl+L/Ctrl+U and up/down history recall, and hands back
//! complete lines as raw bytes. Any other byte, control characters
//! included, stays in the line as typed. Echo is only wanted on a PTY.

/// Longest line kept; further bytes on the same line are dropped
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Commands remembered for up/down recall
const MAX_HISTORY: usize = 100;

/// ANSI escape sequence parsing state
#[derive(Debug, Clone, Copy, PartialEq)]
enum EscapeState {
    Normal,
    Escape,
    Csi,
}

/// Result of feeding keystrokes into the editor
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalEvent {
    /// Bytes to write back to the client
    Output(Vec<u8>),
    /// A complete line, without its terminator
    Line(Vec<u8>),
    /// Ctrl+D on an empty line
    EndOfInput,
}

#[derive(Debug)]
pub struct LineEditor {
    prompt: String,
    line: Vec<u8>,
    history: Vec<Vec<u8>>,
    history_index: Option<usize>,
    escape_state: EscapeState,
    escape_buffer: Vec<u8>,
    last_was_cr: bool,
    echo: bool,
}

impl LineEditor {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            line: Vec::new(),
            history: Vec::new(),
            history_index: None,
            escape_state: EscapeState::Normal,
            escape_buffer: Vec::new(),
            last_was_cr: false,
            echo: true,
        }
    }

    /// Turn keystroke echo on or off
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Feed a chunk of client input
    pub fn feed(&mut self, data: &[u8]) -> Vec<TerminalEvent> {
        let mut events = Vec::new();
        for &byte in data {
            self.handle_byte(byte, &mut events);
        }
        events
    }

    pub fn history(&self) -> &[Vec<u8>] {
        &self.history
    }

    fn handle_byte(&mut self, byte: u8, events: &mut Vec<TerminalEvent>) {
        let after_cr = std::mem::replace(&mut self.last_was_cr, byte == b'\r');

        match self.escape_state {
            EscapeState::Normal => {}
            EscapeState::Escape => {
                self.escape_buffer.push(byte);
                if byte == b'[' {
                    self.escape_state = EscapeState::Csi;
                } else {
                    self.reset_escape();
                }
                return;
            }
            EscapeState::Csi => {
                self.escape_buffer.push(byte);
                match byte {
                    b'A'..=b'Z' | b'a'..=b'z' | b'~' => {
                        let final_byte = byte;
                        self.reset_escape();
                        self.handle_csi(final_byte, events);
                    }
                    b'0'..=b'9' | b';' | b'?' => {}
                    _ => self.reset_escape(),
                }
                return;
            }
        }

        match byte {
            b'\n' if after_cr => {}
            b'\r' | b'\n' => {
                let line = std::mem::take(&mut self.line);
                if !line.is_empty() {
                    self.history.push(line.clone());
                    if self.history.len() > MAX_HISTORY {
                        self.history.remove(0);
                    }
                }
                self.history_index = None;
                self.echo_bytes(events, b"\r\n");
                events.push(TerminalEvent::Line(line));
            }

            // Backspace / DEL
            b'\x08' | b'\x7f' => {
                if pop_char(&mut self.line) {
                    self.echo_bytes(events, b"\x08\x1B[K");
                }
            }

            b'\x1b' => {
                self.escape_state = EscapeState::Escape;
                self.escape_buffer.clear();
                self.escape_buffer.push(byte);
            }

            // Ctrl+C
            b'\x03' => {
                self.line.clear();
                self.history_index = None;
                let mut out = b"^C\r\n".to_vec();
                out.extend_from_slice(self.prompt.as_bytes());
                push_output(events, &out);
            }

            // Ctrl+D
            b'\x04' => {
                if self.line.is_empty() {
                    events.push(TerminalEvent::EndOfInput);
                }
            }

            // Ctrl+L
            b'\x0c' => {
                let mut out = b"\x1B[2J\x1B[H".to_vec();
                out.extend_from_slice(self.prompt.as_bytes());
                out.extend_from_slice(&self.line);
                push_output(events, &out);
            }

            // Ctrl+U
            b'\x15' => {
                self.line.clear();
                self.redraw(events);
            }

            // Tab and printable bytes echo as themselves
            b'\t' | 0x20..=0x7e | 0x80..=0xff => {
                if self.push_byte(byte) {
                    self.echo_bytes(events, &[byte]);
                }
            }

            // Remaining control bytes are kept and echoed in caret notation
            _ => {
                if self.push_byte(byte) {
                    self.echo_bytes(events, &[b'^', byte ^ 0x40]);
                }
            }
        }
    }

    fn push_byte(&mut self, byte: u8) -> bool {
        if self.line.len() < MAX_LINE_BYTES {
            self.line.push(byte);
            true
        } else {
            false
        }
    }

    fn echo_bytes(&self, events: &mut Vec<TerminalEvent>, bytes: &[u8]) {
        if self.echo {
            push_output(events, bytes);
        }
    }

    fn handle_csi(&mut self, final_byte: u8, events: &mut Vec<TerminalEvent>) {
        match final_byte {
            // Up arrow
            b'A' => {
                if self.history.is_empty() {
                    return;
                }
                let index = match self.history_index {
                    None => self.history.len() - 1,
                    Some(idx) => idx.saturating_sub(1),
                };
                self.line = self.history[index].clone();
                self.history_index = Some(index);
                self.redraw(events);
            }

            // Down arrow
            b'B' => {
                let Some(idx) = self.history_index else {
                    return;
                };
                if idx + 1 < self.history.len() {
                    self.line = self.history[idx + 1].clone();
                    self.history_index = Some(idx + 1);
                } else {
                    self.line.clear();
                    self.history_index = None;
                }
                self.redraw(events);
            }

            _ => {}
        }
    }

    fn redraw(&self, events: &mut Vec<TerminalEvent>) {
        let mut out = b"\r\x1B[K".to_vec();
        out.extend_from_slice(self.prompt.as_bytes());
        out.extend_from_slice(&self.line);
        push_output(events, &out);
    }

    fn reset_escape(&mut self) {
        self.escape_state = EscapeState::Normal;
        self.escape_buffer.clear();
    }
}

/// Append to the previous output event when there is one
fn push_output(events: &mut Vec<TerminalEvent>, bytes: &[u8]) {
    if let Some(TerminalEvent::Output(out)) = events.last_mut() {
        out.extend_from_slice(bytes);
    } else {
        events.push(TerminalEvent::Output(bytes.to_vec()));
    }
}

/// Remove the last UTF-8 character (or stray byte) from the buffer
fn pop_char(line: &mut Vec<u8>) -> bool {
    let Some(last) = line.pop() else {
        return false;
    };
    if last & 0xC0 == 0x80 {
        while let Some(&b) = line.last() {
            line.pop();
            if b & 0xC0 != 0x80 {
                break;
            }
        }
    }
    true
}
