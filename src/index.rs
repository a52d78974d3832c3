//! # Clue indexing
//!
//! Herein is the cross-referencing of extracted clues against the extracted
//! grid. Each clue is anchored at the cell bearing its number and measured by
//! the length annotation that ends its text. Clues that cannot be anchored or
//! measured are skipped with a warning; the rest of the puzzle still indexes.

use std::{
	error::Error,
	fmt::{self, Display, Formatter},
	sync::LazyLock
};

use log::{debug, warn};
use regex::Regex;

use crate::{
	extract::RawClue,
	puzzle::{Clue, ClueIndex, ClueRef, ClueStatus, Grid, Position}
};

/// The length annotation that ends a clue, e.g., `(8)` or `(4,2)`.
static LENGTH_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\(([\d,]+)\)$")
		.unwrap_or_else(|e| panic!("BUG: invalid LENGTH_ANNOTATION: {e}"))
});

/// Build the clue index for a puzzle, recording in each covered cell the
/// references of the clues that cover it.
///
/// # Arguments
///
/// * `clues` - The extracted clues of both directions.
/// * `grid` - The extracted grid. Only the `clue_refs` of its cells change.
///
/// # Returns
///
/// A 2-tuple comprising the clue index and the warnings for every clue that
/// was skipped, respectively.
pub fn build_clue_index(
	clues: &[RawClue],
	grid: &mut Grid
) -> (ClueIndex, Vec<IndexingWarning>)
{
	let mut index = ClueIndex::new();
	let mut warnings = Vec::new();
	for raw in clues
	{
		debug!("processing clue: {:?}", raw);
		match index_clue(raw, grid, &index)
		{
			Ok(clue) =>
			{
				let reference = clue.reference();
				for position in clue.span()
				{
					grid[position].clue_refs.insert(reference.clone());
				}
				index.insert(reference, clue);
			}
			Err(warning) =>
			{
				warn!("{}", warning);
				warnings.push(warning);
			}
		}
	}
	(index, warnings)
}

/// Anchor and measure a single clue.
fn index_clue(
	raw: &RawClue,
	grid: &Grid,
	index: &ClueIndex
) -> Result<Clue, IndexingWarning>
{
	let reference = ClueRef::new(&raw.number, raw.direction);
	if index.contains_key(&reference)
	{
		return Err(IndexingWarning::DuplicateClue(reference))
	}
	let start = match grid.labelled(&raw.number).as_slice()
	{
		[] => return Err(IndexingWarning::StartNotFound(reference)),
		[start] => *start,
		starts => return Err(IndexingWarning::DuplicateLabel {
			clue: reference,
			cells: starts.to_vec()
		})
	};
	let lengths = parse_lengths(&raw.text, grid.width())
		.ok_or_else(|| IndexingWarning::LengthNotFound(reference.clone()))?;
	let clue = Clue {
		number: raw.number.clone(),
		direction: raw.direction,
		start,
		lengths,
		status: ClueStatus::Unsolved,
		text: raw.text.clone()
	};
	// Every cell of the answer must be a usable cell of the grid.
	if let Some(position) = clue.span()
		.find(|&p| !grid.get(p).is_some_and(|cell| !cell.blank))
	{
		return Err(IndexingWarning::SpanOutsideGrid {
			clue: reference,
			position
		})
	}
	Ok(clue)
}

/// Parse the word lengths from the annotation that ends the clue text.
///
/// # Arguments
///
/// * `text` - The clue text.
/// * `limit` - The most letters that an answer may have.
///
/// # Returns
///
/// The word lengths, or `None` if there is no well-formed annotation with
/// only positive lengths totalling at most `limit`.
fn parse_lengths(text: &str, limit: usize) -> Option<Vec<usize>>
{
	let annotation = LENGTH_ANNOTATION.captures(text)?.get(1)?.as_str();
	let lengths = annotation.split(',')
		.map(|length| length.parse::<usize>().ok().filter(|&n| n > 0))
		.collect::<Option<Vec<_>>>()?;
	let total = lengths.iter()
		.try_fold(0usize, |total, &length| total.checked_add(length))?;
	(total <= limit).then_some(lengths)
}

////////////////////////////////////////////////////////////////////////////////
//                                 Warnings.                                  //
////////////////////////////////////////////////////////////////////////////////

/// The complete enumeration of reasons to leave a clue out of the index.
/// None of these prevents the puzzle from being created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexingWarning
{
	/// No cell bears the clue's number.
	StartNotFound(ClueRef),

	/// More than one cell bears the clue's number, so the clue cannot be
	/// anchored reliably.
	DuplicateLabel {
		/// The clue.
		clue: ClueRef,

		/// Every cell bearing the number.
		cells: Vec<Position>
	},

	/// The clue text does not end with a length annotation.
	LengthNotFound(ClueRef),

	/// The answer would run off the grid or through a blank cell.
	SpanOutsideGrid {
		/// The clue.
		clue: ClueRef,

		/// The first offending position.
		position: Position
	},

	/// The clue list named the same clue twice. The first wins.
	DuplicateClue(ClueRef)
}

impl Display for IndexingWarning
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::StartNotFound(clue) =>
				write!(f, "Start not found for clue {}. Skipping.", clue),
			Self::DuplicateLabel { clue, cells } => write!(
				f,
				"Label of clue {} appears in {} cells. Skipping.",
				clue,
				cells.len()
			),
			Self::LengthNotFound(clue) =>
				write!(f, "Length not found for clue {}. Skipping.", clue),
			Self::SpanOutsideGrid { clue, position } => write!(
				f,
				"Clue {} runs off the grid at {}. Skipping.",
				clue,
				position
			),
			Self::DuplicateClue(clue) =>
				write!(f, "Clue {} is listed more than once. Skipping.", clue)
		}
	}
}

impl Error for IndexingWarning {}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test
{
	use std::{collections::BTreeSet, fs::read_to_string};

	use crate::{
		extract::{extract_clues, extract_grid, normalize_clue_text, RawClue},
		index::*,
		puzzle::{Cell, ClueRef, Direction, Grid, Position}
	};

	/// Extract the saved sample puzzle.
	fn sample() -> (Grid, Vec<RawClue>)
	{
		let read = |name: &str| {
			read_to_string(format!("samples/{}.html", name)).unwrap()
		};
		let (cells, width) = extract_grid(&read("puzzle_grid"));
		let mut clues = extract_clues(&read("down_clues"), Direction::Down);
		clues.extend(extract_clues(&read("across_clues"), Direction::Across));
		(Grid::square(cells, width).unwrap(), clues)
	}

	/// Build a 5×5 grid with a blank in the bottom-right corner and the given
	/// labels.
	fn small_grid(labels: &[(usize, usize, &str)]) -> Grid
	{
		let cells = (0..25)
			.map(|i| {
				let position = Position::new(i % 5, i / 5);
				let label = labels.iter()
					.find(|(x, y, _)| Position::new(*x, *y) == position)
					.map(|(_, _, label)| label.to_string());
				Cell::new(position, i == 24, label)
			})
			.collect();
		Grid::square(cells, 5).unwrap()
	}

	fn raw(number: &str, text: &str, direction: Direction) -> RawClue
	{
		RawClue {
			number: number.to_string(),
			text: normalize_clue_text(text),
			direction
		}
	}

	fn clue_ref(s: &str) -> ClueRef { ClueRef::parse(s).unwrap() }

	/// Ensure that every clue of the sample puzzle indexes.
	#[test]
	fn test_index_sample()
	{
		let (mut grid, clues) = sample();
		let (index, warnings) = build_clue_index(&clues, &mut grid);
		assert!(warnings.is_empty(), "{:?}", warnings);
		assert_eq!(index.len(), 21);

		let clue = &index[&clue_ref("1A")];
		assert_eq!(clue.start, Position::new(0, 0));
		assert_eq!(clue.lengths, vec![4, 2]);
		assert_eq!(clue.len(), 6);
		assert_eq!(clue.number, "1");
		assert!(!clue.is_solved());

		// An across and a down clue share the number at the same cell.
		assert_eq!(index[&clue_ref("5A")].start, Position::new(7, 0));
		assert_eq!(index[&clue_ref("5D")].start, Position::new(7, 0));
		assert_eq!(index[&clue_ref("5D")].lengths, vec![6, 7]);
		assert_eq!(index[&clue_ref("7D")].lengths, vec![1, 12]);
		assert_eq!(index[&clue_ref("15D")].start, Position::new(5, 8));

		assert_eq!(
			grid[Position::new(1, 0)].clue_refs,
			BTreeSet::from([clue_ref("1A"), clue_ref("2D")])
		);
		assert_eq!(
			grid[Position::new(1, 1)].clue_refs,
			BTreeSet::from([clue_ref("2D")])
		);
		assert!(grid.iter().filter(|c| c.blank).all(|c| c.clue_refs.is_empty()));
		assert!(grid.iter().filter(|c| !c.blank).all(|c| !c.clue_refs.is_empty()));
	}

	/// Ensure that a hyphenated length becomes a multi-word length.
	#[test]
	fn test_hyphenated_length()
	{
		let mut grid = small_grid(&[(0, 0, "1")]);
		let clues = [raw("1", "Settled little dog (1-4)", Direction::Across)];
		let (index, warnings) = build_clue_index(&clues, &mut grid);
		assert!(warnings.is_empty());
		let clue = &index[&clue_ref("1A")];
		assert_eq!(clue.text, "Settled little dog (1,4)");
		assert_eq!(clue.lengths, vec![1, 4]);
		assert_eq!(clue.len(), 5);
	}

	/// Ensure that clues that cannot be anchored or measured are skipped with
	/// a warning while the rest still index.
	#[test]
	fn test_index_warnings()
	{
		let mut grid = small_grid(&[
			(0, 0, "1"),
			(0, 2, "2"),
			(2, 0, "3"),
			(3, 3, "3"),
			(4, 0, "4")
		]);
		let clues = [
			raw("1", "Fine (5)", Direction::Across),
			raw("1", "Fine again (5)", Direction::Across),
			raw("2", "No length", Direction::Across),
			raw("2", "Zero length (0)", Direction::Down),
			raw("3", "Ambiguous (2)", Direction::Down),
			raw("4", "Into the blank (5)", Direction::Down),
			raw("5", "Nowhere (3)", Direction::Across),
			raw("4", "Off the edge (2)", Direction::Across)
		];
		let (index, warnings) = build_clue_index(&clues, &mut grid);
		assert_eq!(index.len(), 1);
		assert!(index.contains_key(&clue_ref("1A")));
		assert_eq!(
			warnings,
			vec![
				IndexingWarning::DuplicateClue(clue_ref("1A")),
				IndexingWarning::LengthNotFound(clue_ref("2A")),
				IndexingWarning::LengthNotFound(clue_ref("2D")),
				IndexingWarning::DuplicateLabel {
					clue: clue_ref("3D"),
					cells: vec![Position::new(2, 0), Position::new(3, 3)]
				},
				IndexingWarning::SpanOutsideGrid {
					clue: clue_ref("4D"),
					position: Position::new(4, 4)
				},
				IndexingWarning::StartNotFound(clue_ref("5A")),
				IndexingWarning::SpanOutsideGrid {
					clue: clue_ref("4A"),
					position: Position::new(5, 0)
				}
			]
		);
		// Skipped clues leave no trace in the grid.
		assert!(grid.iter().all(|c| {
			c.clue_refs.iter().all(|r| r.as_str() == "1A")
		}));
	}

	/// Ensure that absurd length annotations are skipped rather than
	/// measured.
	#[test]
	fn test_oversized_lengths()
	{
		let mut grid = small_grid(&[(0, 0, "1"), (0, 1, "2")]);
		let clues = [
			raw("1", "Huge (18446744073709551615,1)", Direction::Across),
			raw("1", "Enormous (99999999999999999999)", Direction::Down),
			raw("2", "Wider than the grid (3,3)", Direction::Across),
			raw("2", "Just fits (2,2)", Direction::Down)
		];
		let (index, warnings) = build_clue_index(&clues, &mut grid);
		assert_eq!(
			warnings,
			vec![
				IndexingWarning::LengthNotFound(clue_ref("1A")),
				IndexingWarning::LengthNotFound(clue_ref("1D")),
				IndexingWarning::LengthNotFound(clue_ref("2A"))
			]
		);
		assert_eq!(index.len(), 1);
		assert_eq!(index[&clue_ref("2D")].len(), 4);
	}
}
