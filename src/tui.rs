//! # Text-based user interface (TUI)
//!
//! Terminal setup and teardown for the interactive player. The terminal is
//! put into raw mode on the alternate screen for the duration of a session
//! and restored afterwards, whether the session ends normally, with an error,
//! or with a panic on the UI thread.

use std::{
	io::{self, stdout, Stdout},
	panic,
	sync::Arc,
	thread
};

use crossterm::{
	execute,
	terminal::{
		disable_raw_mode, enable_raw_mode,
		EnterAlternateScreen, LeaveAlternateScreen
	}
};
use log::warn;
use ratatui::{backend::{Backend, CrosstermBackend}, Terminal};

/// The text-based user interface (TUI) type.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Run a session on the terminal. While the session runs, a panic on the
/// calling thread restores the terminal before the previous panic hook
/// reports it.
///
/// # Arguments
///
/// * `f` - The session.
///
/// # Returns
///
/// The result of the session.
///
/// # Errors
///
/// Any error that occurs while preparing the terminal, or while running the
/// session.
pub fn tui<F, T>(f: F) -> io::Result<T>
	where F: FnOnce(&mut Tui) -> io::Result<T>
{
	let previous = Arc::new(panic::take_hook());
	let ui_thread = thread::current().id();
	panic::set_hook(Box::new({
		let previous = Arc::clone(&previous);
		move |info| {
			if thread::current().id() == ui_thread
			{
				// Nothing more can be done if this fails mid-panic.
				let _ = restore();
			}
			(**previous)(info);
		}
	}));
	let result = Session::begin().and_then(|mut session| {
		let result = f(&mut session.terminal);
		session.end().and(result)
	});
	// Dropping the session hook releases its share of the previous hook.
	drop(panic::take_hook());
	match Arc::try_unwrap(previous)
	{
		Ok(hook) => panic::set_hook(hook),
		Err(shared) => panic::set_hook(Box::new(move |info| (**shared)(info)))
	}
	result
}

/// An active session on the terminal. Dropping the session restores the
/// terminal.
struct Session
{
	terminal: Tui,
	ended: bool
}

impl Session
{
	/// Enter the alternate screen and raw mode. Partial setup is undone on
	/// failure.
	fn begin() -> io::Result<Self>
	{
		let setup = || -> io::Result<Tui> {
			let mut stdout = stdout();
			execute!(stdout, EnterAlternateScreen)?;
			enable_raw_mode()?;
			Terminal::new(CrosstermBackend::new(stdout))
		};
		match setup()
		{
			Ok(terminal) => Ok(Self { terminal, ended: false }),
			Err(e) =>
			{
				let _ = restore();
				Err(e)
			}
		}
	}

	/// Restore the terminal, reporting any failure.
	fn end(mut self) -> io::Result<()>
	{
		self.ended = true;
		restore()
	}
}

impl Drop for Session
{
	fn drop(&mut self)
	{
		if !self.ended
		{
			if let Err(e) = restore()
			{
				warn!("failed to restore terminal: {}", e);
			}
		}
	}
}

/// Restore the terminal to its original state, cursor included.
fn restore() -> io::Result<()>
{
	let mut stdout = stdout();
	execute!(stdout, LeaveAlternateScreen)?;
	disable_raw_mode()?;
	CrosstermBackend::new(stdout).show_cursor()
}
