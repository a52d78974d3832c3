//! # Application
//!
//! The interactive player: a puzzle thread on the terminal. The grid and the
//! clue lists fill the screen, and commands typed on the input line are
//! dispatched exactly as if they had been posted in the thread.

use std::{io, mem::take, time::Duration};

use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use cryptic_crossword::{
	command::{Bot, Origin},
	puzzle::Puzzle,
	render::{CluesWidget, GridWidget}
};
use log::warn;
use ratatui::{
	buffer::Buffer,
	layout::{Constraint, Layout, Rect},
	style::{Color, Style, Stylize},
	text::Line,
	widgets::{Block, BorderType, Borders, Paragraph, Widget, Wrap},
	Frame
};

use crate::tui::Tui;

////////////////////////////////////////////////////////////////////////////////
//                                Application.                                //
////////////////////////////////////////////////////////////////////////////////

/// The application state.
#[must_use]
pub struct App
{
	/// Whether the application is running.
	state: ExecutionState,

	/// Carries out the commands.
	bot: Bot,

	/// Where the commands are issued. The thread follows any puzzle started
	/// from the input line.
	origin: Origin,

	/// The puzzle hosted by the current thread, if any.
	puzzle: Option<Puzzle>,

	/// The command being typed.
	input: String,

	/// The reply to the last command.
	status: String
}

// Public interface.
impl App
{
	/// The longest command that may be typed.
	const MAX_INPUT: usize = 80;

	/// Create a new application state.
	///
	/// # Arguments
	///
	/// * `bot` - Carries out the commands.
	/// * `origin` - Where the commands are issued.
	///
	/// # Returns
	///
	/// The new application state.
	pub fn new(bot: Bot, origin: Origin) -> Self
	{
		let mut app = Self {
			state: ExecutionState::Playing,
			bot,
			origin,
			puzzle: None,
			input: String::new(),
			status: String::new()
		};
		app.refresh();
		app.status =
			if app.puzzle.is_some()
			{
				"Type 'answer 1A word', 'remove 1A', or 'end'.".to_string()
			}
			else
			{
				"Type 'start' to begin today's puzzle.".to_string()
			};
		app
	}

	/// Run the application until the player exits.
	///
	/// # Arguments
	///
	/// * `tui` - The text-based user interface (TUI).
	///
	/// # Returns
	///
	/// The final state of the puzzle hosted by the current thread, if any.
	///
	/// # Errors
	///
	/// Any error that occurs while running the application.
	pub fn run(mut self, tui: &mut Tui) -> io::Result<Option<Puzzle>>
	{
		while self.is_running()
		{
			tui.draw(|frame| self.render_frame(frame))?;
			self.process_event()?;
		}
		Ok(self.puzzle)
	}

	/// Check if the application is running.
	///
	/// # Returns
	///
	/// `true` if the application is running, `false` otherwise.
	#[inline]
	#[must_use]
	pub fn is_running(&self) -> bool
	{
		!matches!(self.state, ExecutionState::Exiting)
	}
}

// Private implementation details.
impl App
{
	/// Reload the puzzle hosted by the current thread.
	fn refresh(&mut self)
	{
		match self.bot.store.load(self.origin.thread)
		{
			Ok(puzzle) => self.puzzle = puzzle,
			Err(e) =>
			{
				warn!("cannot load thread {}: {}", self.origin.thread, e);
				self.status = e.to_string();
			}
		}
	}

	/// Dispatch the typed command, show the reply, and reload the puzzle.
	fn submit(&mut self)
	{
		let text = take(&mut self.input);
		if text.trim().is_empty()
		{
			return
		}
		let (message, reply) = self.bot.respond(&self.origin, &text);
		self.status = message;
		if let Some(reply) = reply
		{
			self.origin.thread = reply.thread;
			for notice in reply.notices
			{
				self.status.push(' ');
				self.status.push_str(&notice);
			}
		}
		self.refresh();
	}

	/// Append a character to the command, unless it is full.
	fn append(&mut self, c: char)
	{
		if self.input.chars().count() < Self::MAX_INPUT
		{
			self.input.push(c);
		}
	}

	/// Delete the last character of the command.
	fn delete(&mut self)
	{
		self.input.pop();
	}

	/// Mark the application for exit. The application will exit after the next
	/// iteration of the main loop.
	fn exit(&mut self)
	{
		self.state = ExecutionState::Exiting;
	}

	/// Render the application frame.
	///
	/// # Arguments
	///
	/// * `frame` - The target frame.
	fn render_frame(&self, frame: &mut Frame)
	{
		frame.render_widget(self, frame.area());
	}

	/// Render the puzzle: the grid on the left, the clues on the right.
	///
	/// # Arguments
	///
	/// * `area` - The target area.
	/// * `buf` - The target buffer.
	fn render_puzzle(&self, area: Rect, buf: &mut Buffer)
	{
		let title = format!("Thread {}", self.origin.thread);
		let Some(puzzle) = &self.puzzle else {
			Paragraph::new("There is no crossword in this thread.")
				.block(
					Block::default()
						.borders(Borders::ALL)
						.title_top(Line::from(title).centered())
				)
				.render(area, buf);
			return
		};
		let grid = GridWidget(&puzzle.grid);
		let (width, _) = grid.size().unwrap_or((u16::MAX, u16::MAX));
		let [left, right] = Layout::horizontal([
			Constraint::Length(width.saturating_add(2)),
			Constraint::Min(20)
		]).areas(area);
		let block = Block::default()
			.borders(Borders::ALL)
			.border_type(BorderType::Rounded)
			.title_top(
				Line::from(format!("{} – {}", title, puzzle.status)).centered()
			);
		grid.render(block.inner(left), buf);
		block.render(left, buf);
		let block = Block::default()
			.borders(Borders::ALL)
			.border_type(BorderType::Rounded)
			.title_top(Line::from("Clues").centered());
		CluesWidget(&puzzle.clues).render(block.inner(right), buf);
		block.render(right, buf);
	}

	/// Render the command line.
	///
	/// # Arguments
	///
	/// * `area` - The target area.
	/// * `buf` - The target buffer.
	fn render_input(&self, area: Rect, buf: &mut Buffer)
	{
		Paragraph::new(format!("{}▏", self.input))
			.style(Style::default().fg(Color::Black).bg(Color::Cyan))
			.block(
				Block::default()
					.borders(Borders::ALL)
					.title_top(Line::from("⎋ – exit".yellow().bold()).left_aligned())
					.title_top(Line::from("↵ – send".green().bold()).right_aligned())
			)
			.render(area, buf);
	}

	/// Process events. Block for only a short while, so that the frame is
	/// redrawn regularly.
	///
	/// # Errors
	///
	/// Any error that occurs while processing events.
	fn process_event(&mut self) -> io::Result<()>
	{
		if poll(Duration::from_millis(250))?
		{
			match read()?
			{
				Event::Key(event) if event.kind == KeyEventKind::Press =>
					self.process_key_event(event),
				_ => {}
			}
		}
		Ok(())
	}

	/// Process a key event:
	///
	/// * Escape - Exit the application.
	/// * Enter - Send the command.
	/// * Backspace - Delete the last character of the command.
	/// * Delete - Clear the command.
	/// * Ctrl+R - Reload the puzzle.
	/// * Any other character - Append it to the command.
	///
	/// # Arguments
	///
	/// * `event` - The key event to process.
	fn process_key_event(&mut self, event: KeyEvent)
	{
		if !self.is_running()
		{
			return
		}
		match event.code
		{
			KeyCode::Esc => self.exit(),
			KeyCode::Enter => self.submit(),
			KeyCode::Backspace => self.delete(),
			KeyCode::Delete => self.input.clear(),
			KeyCode::Char('r') if event.modifiers.contains(KeyModifiers::CONTROL) =>
				self.refresh(),
			KeyCode::Char(c) if !c.is_control() => self.append(c),
			_ => {}
		}
	}
}

impl Widget for &App
{
	fn render(self, area: Rect, buf: &mut Buffer)
	{
		let [body, input, status] = Layout::vertical([
			Constraint::Min(3),
			Constraint::Length(3),
			Constraint::Length(2)
		]).areas(area);
		self.render_puzzle(body, buf);
		self.render_input(input, buf);
		Paragraph::new(self.status.as_str())
			.wrap(Wrap { trim: true })
			.render(status, buf);
	}
}

/// The execution state of the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExecutionState
{
	/// The player is typing commands.
	Playing,

	/// The application is exiting.
	Exiting
}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test
{
	use std::{sync::Arc, time::Duration};

	use chrono::NaiveDate;
	use cryptic_crossword::{
		engine::EngineConfig,
		fetch::DirectoryFetcher,
		puzzle::{ChannelId, Position, PuzzleStatus, ThreadId},
		render::TextRenderer,
		service::Source,
		store::MemoryStore
	};
	use ratatui::{buffer::Buffer, layout::Rect};

	use super::*;

	fn app() -> App
	{
		let bot = Bot {
			store: Arc::new(MemoryStore::new()),
			fetcher: Arc::new(DirectoryFetcher),
			renderer: Arc::new(TextRenderer::default()),
			config: EngineConfig::default(),
			source: Source { url: "samples".to_string(), ..Source::metro_cryptic() },
			timeout: Duration::from_secs(5)
		};
		let origin = Origin {
			channel: ChannelId(1),
			thread: ThreadId(0),
			date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
			user: "player".to_string()
		};
		App::new(bot, origin)
	}

	fn type_line(app: &mut App, line: &str)
	{
		for c in line.chars()
		{
			app.process_key_event(KeyCode::Char(c).into());
		}
		app.process_key_event(KeyCode::Enter.into());
	}

	/// Ensure that the application exits when the escape key is pressed.
	#[test]
	fn test_handle_exit()
	{
		let mut app = app();
		assert!(app.is_running());
		app.process_key_event(KeyCode::Esc.into());
		assert!(!app.is_running());
	}

	/// Ensure that the command line is edited correctly.
	#[test]
	fn test_handle_edit()
	{
		let mut app = app();
		app.process_key_event(KeyCode::Backspace.into());
		assert_eq!(app.input, "");
		for c in "answer 1a".chars()
		{
			app.process_key_event(KeyCode::Char(c).into());
		}
		assert_eq!(app.input, "answer 1a");
		app.process_key_event(KeyCode::Backspace.into());
		assert_eq!(app.input, "answer 1");
		app.process_key_event(KeyCode::Delete.into());
		assert_eq!(app.input, "");
		// Test saturating the command line.
		for _ in 0..100
		{
			app.process_key_event(KeyCode::Char('x').into());
		}
		assert_eq!(app.input.len(), App::MAX_INPUT);
	}

	/// Ensure that commands typed on the command line are carried out, and
	/// that the player follows the new thread.
	#[test]
	fn test_handle_commands()
	{
		let mut app = app();
		assert!(app.puzzle.is_none());
		type_line(&mut app, "start");
		assert_eq!(app.input, "");
		assert_eq!(app.origin.thread, ThreadId(1));
		assert!(app.status.starts_with("Thread 'Metro Cryptic 2025-01-01'"));
		assert!(app.puzzle.is_some());

		type_line(&mut app, "answer 9a ring");
		assert_eq!(app.status, "player answered 'RING' for clue '9A'!");
		let puzzle = app.puzzle.as_ref().unwrap();
		assert_eq!(puzzle.grid[Position::new(9, 2)].value, Some('R'));
		assert_eq!(puzzle.status, PuzzleStatus::Running);

		type_line(&mut app, "answer 9a rings");
		assert_eq!(
			app.status,
			"Answer length mismatch! Clue 9A expects 4 letters, but you provided 5."
		);
		type_line(&mut app, "end");
		assert_eq!(app.status, "This crossword has been ended.");
		assert!(app.puzzle.is_none());
		assert!(app.is_running());
	}

	/// Ensure that the frame shows the grid and the clues.
	#[test]
	fn test_render()
	{
		let mut app = app();
		type_line(&mut app, "start");
		let area = Rect::new(0, 0, 120, 40);
		let mut buf = Buffer::empty(area);
		(&app).render(area, &mut buf);
		let screen = (0..area.height)
			.map(|y| {
				(0..area.width).map(|x| buf[(x, y)].symbol()).collect::<String>()
			})
			.collect::<Vec<_>>()
			.join("\n");
		assert!(screen.contains("Thread 1 – running"));
		assert!(screen.contains("Across"));
		assert!(screen.contains("Down"));
		assert!(screen.contains("███"));
		assert!(screen.contains("↵ – send"));
	}
}
