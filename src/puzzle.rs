//! # Puzzle model
//!
//! Herein is the normalized model of a cryptic crossword: the [`Grid`] of
//! [`Cell`]s, the [`ClueIndex`] keyed by [`ClueRef`], and the [`Puzzle`]
//! record that binds both to the conversation thread hosting it. Cells refer
//! to clues only by reference, never by handle, so the model serializes as
//! plain data.

use std::{
	collections::{BTreeSet, HashMap},
	fmt::{self, Display, Formatter},
	ops::{Index, IndexMut}
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{engine::Rejection, extract::ExtractionError};

////////////////////////////////////////////////////////////////////////////////
//                                Identifiers.                                //
////////////////////////////////////////////////////////////////////////////////

/// The identifier of the conversation thread that hosts a puzzle. Every
/// puzzle record is addressed by its thread.
#[derive(
	Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
	Serialize, Deserialize
)]
pub struct ThreadId(pub u64);

impl Display for ThreadId
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		write!(f, "{}", self.0)
	}
}

/// The identifier of the channel in which a puzzle was started.
#[derive(
	Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
	Serialize, Deserialize
)]
pub struct ChannelId(pub u64);

impl Display for ChannelId
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		write!(f, "{}", self.0)
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                 Positions.                                 //
////////////////////////////////////////////////////////////////////////////////

/// The position of a cell within the grid. The origin is the top-left corner;
/// `x` is the column and `y` is the row.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
	Serialize, Deserialize
)]
pub struct Position
{
	/// The zero-based column.
	pub x: usize,

	/// The zero-based row.
	pub y: usize
}

impl Position
{
	#[inline]
	pub const fn new(x: usize, y: usize) -> Self { Self { x, y } }

	/// Advance the position `steps` cells in the given direction.
	#[inline]
	#[must_use]
	pub const fn step(self, direction: Direction, steps: usize) -> Self
	{
		match direction
		{
			Direction::Across => Self::new(self.x + steps, self.y),
			Direction::Down => Self::new(self.x, self.y + steps)
		}
	}
}

impl Display for Position
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		write!(f, "{},{}", self.x, self.y)
	}
}

/// The two perpendicular fill directions of a crossword.
#[derive(
	Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
	Serialize, Deserialize
)]
pub enum Direction
{
	Across,
	Down
}

impl Direction
{
	/// Get the letter that denotes the direction in a clue reference.
	#[inline]
	#[must_use]
	pub const fn letter(self) -> char
	{
		match self
		{
			Self::Across => 'A',
			Self::Down => 'D'
		}
	}

	/// Get the direction denoted by the given clue reference letter, if any.
	/// Only uppercase letters are recognized.
	#[inline]
	#[must_use]
	pub const fn from_letter(letter: char) -> Option<Self>
	{
		match letter
		{
			'A' => Some(Self::Across),
			'D' => Some(Self::Down),
			_ => None
		}
	}
}

impl Display for Direction
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::Across => write!(f, "Across"),
			Self::Down => write!(f, "Down")
		}
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                   Cells.                                   //
////////////////////////////////////////////////////////////////////////////////

/// A single grid square.
///
/// A blank cell never holds a letter, a label, or any clue references. Only
/// [`value`](Self::value) changes after extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell
{
	/// The position of the cell within the grid.
	pub position: Position,

	/// Whether the cell is an unusable (black) square.
	pub blank: bool,

	/// The clue number printed in the cell, present only on cells that start
	/// one or more clues.
	pub label: Option<String>,

	/// The letter currently filled into the cell, always uppercase.
	pub value: Option<char>,

	/// The references of the clues that cover this cell.
	pub clue_refs: BTreeSet<ClueRef>
}

impl Cell
{
	/// Construct an empty cell.
	///
	/// # Arguments
	///
	/// * `position` - The position of the cell.
	/// * `blank` - Whether the cell is an unusable square.
	/// * `label` - The printed clue number, if any. Ignored for blank cells.
	pub fn new(position: Position, blank: bool, label: Option<String>) -> Self
	{
		Self {
			position,
			blank,
			label: if blank { None } else { label },
			value: None,
			clue_refs: BTreeSet::new()
		}
	}

	/// Check if the cell is a non-blank cell that holds a letter.
	#[inline]
	#[must_use]
	pub fn is_filled(&self) -> bool { !self.blank && self.value.is_some() }
}

////////////////////////////////////////////////////////////////////////////////
//                                   Grid.                                    //
////////////////////////////////////////////////////////////////////////////////

/// A square grid of cells, linearized in row-major order. The cell at
/// position `(x, y)` lives at index `y * width + x`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid
{
	/// The number of columns, which equals the number of rows.
	width: usize,

	/// The cells, in row-major order.
	cells: Vec<Cell>
}

impl Grid
{
	/// Assemble a square grid from extracted cells.
	///
	/// # Arguments
	///
	/// * `cells` - The extracted cells, in any order.
	/// * `width` - The number of rows encountered during extraction.
	///
	/// # Returns
	///
	/// The grid.
	///
	/// # Errors
	///
	/// * [`ExtractionError::EmptyGrid`] if there are no cells at all.
	/// * [`ExtractionError::NotSquare`] if the cells do not tile a
	///   `width`×`width` square exactly once.
	pub fn square(mut cells: Vec<Cell>, width: usize) -> Result<Self, ExtractionError>
	{
		if width == 0 || cells.is_empty()
		{
			return Err(ExtractionError::EmptyGrid)
		}
		cells.sort_by_key(|cell| (cell.position.y, cell.position.x));
		let tiled = cells.len() == width * width
			&& cells.iter().enumerate().all(|(index, cell)| {
				cell.position == Position::new(index % width, index / width)
			});
		if !tiled
		{
			return Err(ExtractionError::NotSquare {
				rows: width,
				cells: cells.len()
			})
		}
		Ok(Self { width, cells })
	}

	/// The number of columns.
	#[inline]
	#[must_use]
	pub fn width(&self) -> usize { self.width }

	/// The number of rows. Grids are square, so this is also the width.
	#[inline]
	#[must_use]
	pub fn height(&self) -> usize { self.width }

	/// Get the cell at the given position, if it lies within the grid.
	#[inline]
	#[must_use]
	pub fn get(&self, position: Position) -> Option<&Cell>
	{
		self.linear(position).map(|index| &self.cells[index])
	}

	/// Get the cell at the given position mutably, if it lies within the grid.
	#[inline]
	#[must_use]
	pub fn get_mut(&mut self, position: Position) -> Option<&mut Cell>
	{
		match self.linear(position)
		{
			Some(index) => Some(&mut self.cells[index]),
			None => None
		}
	}

	/// Iterate over the cells in row-major order.
	#[inline]
	pub fn iter(&self) -> impl Iterator<Item = &Cell> + '_
	{
		self.cells.iter()
	}

	/// Iterate over the rows of the grid, top to bottom.
	#[inline]
	pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_
	{
		self.cells.chunks_exact(self.width.max(1))
	}

	/// Find the positions of every cell carrying the given label, in
	/// row-major order.
	pub fn labelled(&self, label: &str) -> Vec<Position>
	{
		self.cells.iter()
			.filter(|cell| cell.label.as_deref() == Some(label))
			.map(|cell| cell.position)
			.collect()
	}

	/// Check whether every non-blank cell holds a letter.
	///
	/// # Returns
	///
	/// `true` if the grid is completely filled, `false` otherwise.
	#[must_use]
	pub fn is_filled(&self) -> bool
	{
		self.cells.iter().filter(|cell| !cell.blank).all(|cell| cell.value.is_some())
	}

	#[inline]
	fn linear(&self, position: Position) -> Option<usize>
	{
		(position.x < self.width && position.y < self.width)
			.then(|| position.y * self.width + position.x)
	}
}

impl Index<Position> for Grid
{
	type Output = Cell;

	#[inline]
	fn index(&self, position: Position) -> &Self::Output
	{
		&self.cells[position.y * self.width + position.x]
	}
}

impl IndexMut<Position> for Grid
{
	#[inline]
	fn index_mut(&mut self, position: Position) -> &mut Self::Output
	{
		&mut self.cells[position.y * self.width + position.x]
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                   Clues.                                   //
////////////////////////////////////////////////////////////////////////////////

/// A clue reference: the clue's displayed number followed by its direction
/// letter, e.g., `5A` or `12D`.
#[derive(
	Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
	Serialize, Deserialize
)]
#[serde(transparent)]
pub struct ClueRef(String);

impl ClueRef
{
	/// Form the reference for the clue with the given number and direction.
	#[inline]
	pub fn new(number: &str, direction: Direction) -> Self
	{
		Self(format!("{}{}", number, direction.letter()))
	}

	/// Parse a user-supplied clue reference. The input is uppercased and all
	/// whitespace is removed before validation, so ` 5 d` is accepted as `5D`.
	///
	/// # Arguments
	///
	/// * `raw` - The reference as typed by the user.
	///
	/// # Returns
	///
	/// The normalized clue reference.
	///
	/// # Errors
	///
	/// [`Rejection::InvalidClueFormat`] unless the normalized input is one or
	/// more ASCII digits followed by exactly one of `A` or `D`.
	pub fn parse(raw: &str) -> Result<Self, Rejection>
	{
		let normalized = normalize(raw);
		let mut chars = normalized.chars();
		let valid = match chars.next_back()
		{
			Some(letter) => Direction::from_letter(letter).is_some()
				&& !chars.as_str().is_empty()
				&& chars.as_str().chars().all(|c| c.is_ascii_digit()),
			None => false
		};
		if valid
		{
			Ok(Self(normalized))
		}
		else
		{
			Err(Rejection::InvalidClueFormat(raw.to_string()))
		}
	}

	/// The direction encoded in the reference.
	#[must_use]
	pub fn direction(&self) -> Option<Direction>
	{
		self.0.chars().next_back().and_then(Direction::from_letter)
	}

	#[inline]
	#[must_use]
	pub fn as_str(&self) -> &str { &self.0 }
}

impl Display for ClueRef
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		write!(f, "{}", self.0)
	}
}

/// Uppercase the ASCII letters of the input and strip every whitespace
/// character from it. This is the normalization applied to both clue
/// references and answers. Other characters are kept as they are, so the
/// number of characters never changes except by the whitespace removed.
pub fn normalize(raw: &str) -> String
{
	raw.chars()
		.filter(|c| !c.is_whitespace())
		.map(|c| c.to_ascii_uppercase())
		.collect()
}

/// Whether a clue has been answered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClueStatus
{
	#[default]
	Unsolved,
	Solved
}

/// One numbered clue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue
{
	/// The displayed number. An across and a down clue starting at the same
	/// cell share it.
	pub number: String,

	/// The fill direction.
	pub direction: Direction,

	/// The position of the first cell of the answer.
	pub start: Position,

	/// The word lengths of the answer, e.g., `[4, 2]` for a six letter answer
	/// of two words. Never empty, and every entry is positive.
	pub lengths: Vec<usize>,

	/// Whether the clue has been answered.
	pub status: ClueStatus,

	/// The clue text, length annotation included.
	pub text: String
}

impl Clue
{
	/// The total number of letters in the answer.
	#[inline]
	#[must_use]
	pub fn len(&self) -> usize { self.lengths.iter().sum() }

	/// The reference under which this clue is indexed.
	#[inline]
	pub fn reference(&self) -> ClueRef { ClueRef::new(&self.number, self.direction) }

	/// The ordered positions of the cells that the answer occupies.
	pub fn span(&self) -> impl Iterator<Item = Position> + '_
	{
		(0..self.len()).map(move |i| self.start.step(self.direction, i))
	}

	#[inline]
	#[must_use]
	pub fn is_solved(&self) -> bool { self.status == ClueStatus::Solved }
}

/// The clue index maps every clue reference to its clue. Order is
/// irrelevant; lookups are by reference.
pub type ClueIndex = HashMap<ClueRef, Clue>;

////////////////////////////////////////////////////////////////////////////////
//                                  Puzzles.                                  //
////////////////////////////////////////////////////////////////////////////////

/// The lifecycle status of a puzzle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuzzleStatus
{
	#[default]
	Running,
	Completed
}

impl Display for PuzzleStatus
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::Running => write!(f, "running"),
			Self::Completed => write!(f, "completed")
		}
	}
}

/// One puzzle instance, addressed by the thread that hosts it. At most one
/// puzzle exists per channel, date, and source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle
{
	/// The thread hosting the puzzle.
	pub thread: ThreadId,

	/// The channel in which the puzzle was started.
	pub channel: ChannelId,

	/// The publication date of the puzzle.
	pub date: NaiveDate,

	/// The site or puzzle variant the puzzle came from.
	pub source: String,

	/// The lifecycle status.
	pub status: PuzzleStatus,

	/// The cells.
	pub grid: Grid,

	/// The clues.
	pub clues: ClueIndex
}

impl Puzzle
{
	/// Check whether every non-blank cell holds a letter.
	#[inline]
	#[must_use]
	pub fn is_complete(&self) -> bool { self.grid.is_filled() }

	#[inline]
	#[must_use]
	pub fn is_running(&self) -> bool { self.status == PuzzleStatus::Running }
}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////
