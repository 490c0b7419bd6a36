use std::io::{self, Stdout, Write};
use std::ops::{Deref, DerefMut};

use crossterm::{cursor::SetCursorStyle, queue, terminal};
use log::warn;

/// What the session needs from a terminal: styled output plus raw mode and width.
pub trait TerminalDriver: Write {
    fn enter_raw_mode(&mut self) -> io::Result<()>;
    fn restore(&mut self) -> io::Result<()>;
    fn width(&self) -> io::Result<u16>;
}

/// The real terminal, via crossterm on stdout
pub struct CrosstermTerminal {
    out: Stdout,
}

impl CrosstermTerminal {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for CrosstermTerminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl TerminalDriver for CrosstermTerminal {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()
    }

    fn restore(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()
    }

    fn width(&self) -> io::Result<u16> {
        terminal::size().map(|(cols, _)| cols)
    }
}

/// Raw mode for as long as the guard lives.
///
/// Dropping the guard resets the cursor shape and leaves raw mode, on every
/// exit path including errors.
pub struct RawModeGuard<'a, T: TerminalDriver> {
    term: &'a mut T,
}

impl<'a, T: TerminalDriver> RawModeGuard<'a, T> {
    pub fn new(term: &'a mut T) -> io::Result<Self> {
        term.enter_raw_mode()?;
        Ok(Self { term })
    }
}

impl<T: TerminalDriver> Deref for RawModeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.term
    }
}

impl<T: TerminalDriver> DerefMut for RawModeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.term
    }
}

impl<T: TerminalDriver> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        let reset = queue!(self.term, SetCursorStyle::DefaultUserShape).and_then(|_| self.term.flush());
        if let Err(e) = reset {
            warn!("failed to reset cursor shape: {e}");
        }
        if let Err(e) = self.term.restore() {
            warn!("failed to restore terminal mode: {e}");
        }
    }
}

/// In-memory terminal for headless tests
#[derive(Debug, Default)]
pub struct MemoryTerminal {
    pub output: Vec<u8>,
    pub columns: u16,
    pub raw: bool,
    pub restores: usize,
    /// Make `enter_raw_mode` fail
    pub refuse_raw_mode: bool,
}

impl MemoryTerminal {
    pub fn new(columns: u16) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Write for MemoryTerminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TerminalDriver for MemoryTerminal {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        if self.refuse_raw_mode {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "not a tty"));
        }
        self.raw = true;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        self.raw = false;
        self.restores += 1;
        Ok(())
    }

    fn width(&self) -> io::Result<u16> {
        Ok(self.columns)
    }
}
