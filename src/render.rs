//! # Rendering
//!
//! Herein are the two pictures a puzzle thread shows its players: the grid
//! and the clue lists. Both are ordinary [`ratatui`] widgets, so the
//! interactive player draws them straight onto the terminal, while
//! [`TextRenderer`] draws them into an off-screen buffer and emits the result
//! as UTF-8 text suitable for posting.

use std::{
	error::Error,
	fmt::{self, Display, Formatter}
};

use ratatui::{
	buffer::Buffer,
	layout::{Constraint, Layout, Rect},
	style::{Color, Modifier, Style, Stylize},
	text::{Line, Span},
	widgets::{Block, Borders, Paragraph, Widget, Wrap}
};

use crate::puzzle::{Cell, Clue, ClueIndex, Direction, Grid};

/// A producer of puzzle images.
pub trait Render: Send + Sync
{
	/// Draw the grid, letters and labels included.
	///
	/// # Errors
	///
	/// Any failure to draw the grid.
	fn render_grid(&self, grid: &Grid) -> Result<Vec<u8>, RenderError>;

	/// Draw the across and down clue lists, marking the solved clues.
	///
	/// # Errors
	///
	/// Any failure to draw the clues.
	fn render_clues(&self, clues: &ClueIndex) -> Result<Vec<u8>, RenderError>;
}

////////////////////////////////////////////////////////////////////////////////
//                                   Grid.                                    //
////////////////////////////////////////////////////////////////////////////////

/// Draws the grid, one cell per [`CELL_WIDTH`](Self::CELL_WIDTH) ×
/// [`CELL_HEIGHT`](Self::CELL_HEIGHT) block: the label on the upper line, the
/// letter centered on the lower one. Cells that do not fit wholly within the
/// target area are omitted.
#[derive(Clone, Copy, Debug)]
pub struct GridWidget<'a>(pub &'a Grid);

impl GridWidget<'_>
{
	/// The number of columns occupied by a cell.
	pub const CELL_WIDTH: u16 = 3;

	/// The number of rows occupied by a cell.
	pub const CELL_HEIGHT: u16 = 2;

	/// The glyphs of a blank cell, for both lines.
	const BLANK: &'static str = "███";

	/// The glyph of an empty, usable cell.
	const EMPTY: char = '·';

	/// The size of the area needed to draw the whole grid.
	///
	/// # Returns
	///
	/// The width and height, or `None` if they exceed the range of a terminal
	/// coordinate.
	pub fn size(&self) -> Option<(u16, u16)>
	{
		let width = u16::try_from(self.0.width()).ok()?
			.checked_mul(Self::CELL_WIDTH)?;
		let height = u16::try_from(self.0.height()).ok()?
			.checked_mul(Self::CELL_HEIGHT)?;
		Some((width, height))
	}

	fn render_cell(cell: &Cell, x: u16, y: u16, buf: &mut Buffer)
	{
		if cell.blank
		{
			let style = Style::default().fg(Color::DarkGray);
			buf.set_string(x, y, Self::BLANK, style);
			buf.set_string(x, y + 1, Self::BLANK, style);
			return
		}
		let label = cell.label.as_deref().unwrap_or_default();
		buf.set_stringn(
			x,
			y,
			format!("{:<3}", label),
			Self::CELL_WIDTH as usize,
			Style::default().fg(Color::Gray)
		);
		let (letter, style) = match cell.value
		{
			Some(letter) => (letter, Style::default().bold()),
			None => (Self::EMPTY, Style::default().fg(Color::DarkGray))
		};
		buf.set_string(x, y + 1, format!(" {} ", letter), style);
	}
}

impl Widget for GridWidget<'_>
{
	fn render(self, area: Rect, buf: &mut Buffer)
	{
		let area = area.intersection(buf.area);
		for cell in self.0.iter()
		{
			let (Ok(column), Ok(row)) = (
				u16::try_from(cell.position.x),
				u16::try_from(cell.position.y)
			) else { continue };
			let x = column.saturating_mul(Self::CELL_WIDTH)
				.saturating_add(area.x);
			let y = row.saturating_mul(Self::CELL_HEIGHT)
				.saturating_add(area.y);
			let fits = x.saturating_add(Self::CELL_WIDTH) <= area.right()
				&& y.saturating_add(Self::CELL_HEIGHT) <= area.bottom();
			if fits
			{
				Self::render_cell(cell, x, y, buf);
			}
		}
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                   Clues.                                   //
////////////////////////////////////////////////////////////////////////////////

/// Draws the across and down clue lists side by side, each in numerical
/// order. Solved clues are dimmed, crossed out, and ticked.
#[derive(Clone, Copy, Debug)]
pub struct CluesWidget<'a>(pub &'a ClueIndex);

impl<'a> CluesWidget<'a>
{
	/// The mark appended to solved clues.
	const SOLVED: &'static str = " ✓";

	/// Collect the clues of one direction in numerical order. Numbers are
	/// compared as integers, so `9` precedes `10`.
	pub fn ordered(&self, direction: Direction) -> Vec<&'a Clue>
	{
		let mut clues = self.0.values()
			.filter(|clue| clue.direction == direction)
			.collect::<Vec<_>>();
		clues.sort_by_key(|clue| {
			(clue.number.parse::<u64>().unwrap_or(u64::MAX), clue.number.clone())
		});
		clues
	}

	/// Produce the display line for a clue.
	fn line(clue: &Clue) -> Line<'static>
	{
		let text = format!("{}. {}", clue.number, clue.text);
		if clue.is_solved()
		{
			let style = Style::default()
				.add_modifier(Modifier::CROSSED_OUT | Modifier::DIM);
			Line::from(vec![
				Span::styled(text, style),
				Span::styled(Self::SOLVED, Style::default().fg(Color::Green))
			])
		}
		else
		{
			Line::from(text)
		}
	}

	/// An upper bound on the number of rows needed to draw both lists within
	/// the given total width.
	pub fn height_hint(&self, width: u16) -> u16
	{
		// Word wrapping can waste up to half a line per wrap on long words.
		let column = (width / 2).max(2) as usize / 2;
		[Direction::Across, Direction::Down].into_iter()
			.map(|direction| {
				self.ordered(direction).iter()
					.map(|clue| {
						let length = clue.number.chars().count()
							+ clue.text.chars().count()
							+ 2 + Self::SOLVED.chars().count();
						length / column + 1
					})
					.sum::<usize>() + 1
			})
			.max()
			.map_or(1, |rows| u16::try_from(rows).unwrap_or(u16::MAX))
	}

	fn render_list(&self, direction: Direction, area: Rect, buf: &mut Buffer)
	{
		let lines = self.ordered(direction).into_iter()
			.map(Self::line)
			.collect::<Vec<_>>();
		Paragraph::new(lines)
			.block(
				Block::default()
					.borders(Borders::TOP)
					.title(direction.to_string().bold())
			)
			.wrap(Wrap { trim: true })
			.render(area, buf);
	}
}

impl Widget for CluesWidget<'_>
{
	fn render(self, area: Rect, buf: &mut Buffer)
	{
		let [across, down] = Layout::horizontal([
			Constraint::Percentage(50),
			Constraint::Percentage(50)
		]).areas(area);
		self.render_list(Direction::Across, across, buf);
		self.render_list(Direction::Down, down, buf);
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                   Text.                                    //
////////////////////////////////////////////////////////////////////////////////

/// Renders puzzle images as plain UTF-8 text. Styling is discarded; trailing
/// whitespace is trimmed from every line, and trailing empty lines are
/// dropped.
#[derive(Clone, Copy, Debug)]
pub struct TextRenderer
{
	/// The total width of the clue lists, in columns.
	pub clue_width: u16
}

impl Default for TextRenderer
{
	fn default() -> Self { Self { clue_width: 100 } }
}

impl TextRenderer
{
	/// The largest image, in cells, that will be drawn.
	pub const MAX_AREA: u32 = 1 << 20;

	/// Draw a widget into an off-screen buffer of the given size and dump the
	/// buffer as text.
	fn draw<W: Widget>(
		widget: W,
		width: u16,
		height: u16
	) -> Result<Vec<u8>, RenderError>
	{
		if u32::from(width) * u32::from(height) > Self::MAX_AREA
		{
			return Err(RenderError::TooLarge {
				width: width as usize,
				height: height as usize
			})
		}
		let area = Rect::new(0, 0, width, height);
		let mut buf = Buffer::empty(area);
		widget.render(area, &mut buf);
		let mut lines = (0..height)
			.map(|y| {
				let line = (0..width)
					.map(|x| buf[(x, y)].symbol())
					.collect::<String>();
				line.trim_end().to_string()
			})
			.collect::<Vec<_>>();
		while lines.last().is_some_and(|line| line.is_empty())
		{
			lines.pop();
		}
		let mut text = lines.join("\n");
		text.push('\n');
		Ok(text.into_bytes())
	}
}

impl Render for TextRenderer
{
	fn render_grid(&self, grid: &Grid) -> Result<Vec<u8>, RenderError>
	{
		let widget = GridWidget(grid);
		let (width, height) = widget.size()
			.ok_or(RenderError::TooLarge {
				width: grid.width(),
				height: grid.height()
			})?;
		Self::draw(widget, width, height)
	}

	fn render_clues(&self, clues: &ClueIndex) -> Result<Vec<u8>, RenderError>
	{
		let widget = CluesWidget(clues);
		let height = widget.height_hint(self.clue_width);
		Self::draw(widget, self.clue_width, height)
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                  Errors.                                   //
////////////////////////////////////////////////////////////////////////////////

/// The complete enumeration of rendering failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderError
{
	/// The image would be unreasonably large.
	TooLarge {
		/// The requested width.
		width: usize,

		/// The requested height.
		height: usize
	}
}

impl Display for RenderError
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::TooLarge { width, height } =>
				write!(f, "image of {}×{} is too large to draw", width, height)
		}
	}
}

impl Error for RenderError {}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test
{
	use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

	use crate::{
		engine::apply_answer,
		puzzle::{Direction, ThreadId},
		render::*,
		testing::sample_puzzle
	};

	fn text(bytes: Vec<u8>) -> String { String::from_utf8(bytes).unwrap() }

	/// Ensure that the grid is drawn with labels, blanks, and letters in
	/// place.
	#[test]
	fn test_render_grid()
	{
		let mut puzzle = sample_puzzle(ThreadId(1));
		let renderer = TextRenderer::default();
		let image = text(renderer.render_grid(&puzzle.grid).unwrap());
		let lines = image.lines().collect::<Vec<_>>();
		assert_eq!(lines.len(), 26);
		assert_eq!(lines[0], "1  2     3     4  ███5     6     7");
		assert_eq!(lines[1], " ·  ·  ·  ·  ·  · ███ ·  ·  ·  ·  ·  ·");
		assert_eq!(lines[2], "███   ███   ███   ███   ███   ███   ███");

		apply_answer(&mut puzzle, "1A", "LIEDIN").unwrap();
		let image = text(renderer.render_grid(&puzzle.grid).unwrap());
		let lines = image.lines().collect::<Vec<_>>();
		assert_eq!(lines[1], " L  I  E  D  I  N ███ ·  ·  ·  ·  ·  ·");
		assert_eq!(lines[3], "███ · ███ · ███ · ███ · ███ · ███ · ███");
	}

	/// Ensure that the clue lists are ordered numerically and that solved
	/// clues are ticked.
	#[test]
	fn test_render_clues()
	{
		let mut puzzle = sample_puzzle(ThreadId(1));
		let widget = CluesWidget(&puzzle.clues);
		let numbers = widget.ordered(Direction::Across).iter()
			.map(|clue| clue.number.as_str())
			.collect::<Vec<_>>();
		assert_eq!(
			numbers,
			["1", "5", "8", "9", "10", "11", "12", "13", "14", "16", "17", "18",
				"19", "20"]
		);

		let renderer = TextRenderer::default();
		let image = text(renderer.render_clues(&puzzle.clues).unwrap());
		assert!(image.starts_with("Across"), "{}", image);
		assert!(image.contains("Down"));
		assert!(image.contains("9. Ring round the outskirts of Kent (4)"));
		assert!(image.contains("15. Shake hands, having lost a partner (5)"));
		assert!(!image.contains('✓'));

		apply_answer(&mut puzzle, "9A", "RING").unwrap();
		let image = text(renderer.render_clues(&puzzle.clues).unwrap());
		assert!(image.contains("9. Ring round the outskirts of Kent (4) ✓"));
		assert_eq!(image.matches('✓').count(), 1);
	}

	/// Ensure that a grid too large for its area is clipped to whole cells.
	#[test]
	fn test_clip()
	{
		let puzzle = sample_puzzle(ThreadId(1));
		let area = Rect::new(0, 0, 8, 3);
		let mut buf = Buffer::empty(area);
		GridWidget(&puzzle.grid).render(area, &mut buf);
		let row = |y: u16| {
			(0..8).map(|x| buf[(x, y)].symbol()).collect::<String>()
		};
		assert_eq!(row(0), "1  2    ");
		assert_eq!(row(1), " ·  ·   ");
		assert_eq!(row(2), "        ");
	}
}
