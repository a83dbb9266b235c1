// SPDX-License-Identifier: GPL-3.0-only

//! Terminal interaction for capture sessions
//!
//! [`KeyboardQuit`] puts the terminal into raw mode so single key presses
//! reach the session without Enter; `q` or Ctrl+C ends the session.
//! [`ConsoleStatus`] rewrites one status line in place as frames arrive.
//!
//! Lines printed while raw mode is active end in `\r\n`, since the terminal no
//! longer translates newlines.

use crate::pipelines::{QuitSignal, SessionObserver, SessionProgress, SessionSummary};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::io::{IsTerminal, Write, stdout};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Quit signal driven by key presses on the controlling terminal
///
/// Inert when stdin is not a terminal. Raw mode is restored on drop.
pub struct KeyboardQuit {
    raw_mode: bool,
}

impl KeyboardQuit {
    pub fn new() -> Self {
        if !std::io::stdin().is_terminal() {
            debug!("stdin is not a terminal, keyboard quit disabled");
            return Self { raw_mode: false };
        }
        match enable_raw_mode() {
            Ok(()) => Self { raw_mode: true },
            Err(e) => {
                warn!(error = %e, "Failed to enable raw mode, keyboard quit disabled");
                Self { raw_mode: false }
            }
        }
    }

    /// Whether key presses are being watched
    pub fn is_active(&self) -> bool {
        self.raw_mode
    }
}

impl Default for KeyboardQuit {
    fn default() -> Self {
        Self::new()
    }
}

impl QuitSignal for KeyboardQuit {
    fn quit_requested(&mut self) -> bool {
        if !self.raw_mode {
            return false;
        }

        // Drain everything pending so stale keys do not pile up
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    warn!(error = %e, "Failed to poll terminal events");
                    return false;
                }
            }

            if let Ok(Event::Key(key)) = event::read()
                && key.kind == KeyEventKind::Press
            {
                // Ctrl+C arrives as a key event in raw mode
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return true;
                }
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc) {
                    return true;
                }
            }
        }
    }
}

impl Drop for KeyboardQuit {
    fn drop(&mut self) {
        if self.raw_mode
            && let Err(e) = disable_raw_mode()
        {
            warn!(error = %e, "Failed to restore terminal mode");
        }
    }
}

/// Session observer printing a single in-place status line
#[derive(Default)]
pub struct ConsoleStatus {
    averaging: bool,
}

impl ConsoleStatus {
    /// Status line for a periodic session
    pub fn periodic() -> Self {
        Self { averaging: false }
    }

    /// Status line for an averaging session
    pub fn averaging() -> Self {
        Self { averaging: true }
    }

    fn print(line: &str) {
        let mut out = stdout();
        // Status output is best effort
        let _ = write!(out, "{}", line);
        let _ = out.flush();
    }
}

impl SessionObserver for ConsoleStatus {
    fn session_started(&mut self, session_dir: &Path, source: &str) {
        Self::print(&format!(
            "Source: {}\r\nSaving to: {}\r\nPress q to stop\r\n",
            source,
            session_dir.display()
        ));
    }

    fn frame_processed(&mut self, progress: &SessionProgress) {
        let elapsed = progress.elapsed.as_secs();
        let captured = if self.averaging {
            format!("averaged: {}", progress.samples_averaged)
        } else {
            format!("captured: {}", progress.snapshots_written)
        };
        Self::print(&format!(
            "\r{:02}:{:02}  frames: {}  {}",
            elapsed / 60,
            elapsed % 60,
            progress.frames_received,
            captured
        ));
    }

    fn write_failed(&mut self, path: &Path, error: &str) {
        Self::print(&format!("\r\nFailed to write {}: {}\r\n", path.display(), error));
    }

    fn session_finished(&mut self, summary: &SessionSummary) {
        Self::print(&format!(
            "\r\nStopped ({}): {} frames, {} files written\r\n",
            summary.stop_reason,
            summary.frames_received,
            summary.artifacts.len()
        ));
    }
}
