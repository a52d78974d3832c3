//! # Answer engine
//!
//! Herein is the state machine at the heart of a running puzzle. Each clue is
//! either unsolved or solved: a valid answer solves it, and removing the
//! answer unsolves it again. Answers are validated in full before anything is
//! written, so a rejected submission never touches the puzzle.
//!
//! Answers overwrite whatever the cells held before, including letters placed
//! by crossing clues; there is no conflict detection. What removal does to
//! crossing letters is governed by [`RemovalPolicy`].

use std::{
	error::Error,
	fmt::{self, Display, Formatter}
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::puzzle::{normalize, ClueRef, ClueStatus, Position, Puzzle, PuzzleStatus};

////////////////////////////////////////////////////////////////////////////////
//                              Configuration.                                //
////////////////////////////////////////////////////////////////////////////////

/// How removing an answer treats cells shared with crossing clues.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq,
	Serialize, Deserialize, clap::ValueEnum
)]
pub enum RemovalPolicy
{
	/// Clear every cell of the clue, even letters that a crossing clue still
	/// relies on.
	#[default]
	Unconditional,

	/// Clear only the cells that no other solved clue covers.
	Shared
}

/// The configuration of the answer engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig
{
	/// How removal treats shared cells.
	pub removal: RemovalPolicy
}

////////////////////////////////////////////////////////////////////////////////
//                               Transitions.                                 //
////////////////////////////////////////////////////////////////////////////////

/// The outcome of a successful [`apply_answer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied
{
	/// The normalized reference of the solved clue.
	pub clue: ClueRef,

	/// The normalized answer, as written into the grid.
	pub answer: String,

	/// Whether the answer completed the grid.
	pub completed: bool
}

/// The outcome of a successful [`remove_answer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Removed
{
	/// The normalized reference of the unsolved clue.
	pub clue: ClueRef,

	/// The positions of the cells that were cleared.
	pub cleared: Vec<Position>
}

/// Apply an answer to a clue. The clue reference and the answer are
/// uppercased and stripped of whitespace, the answer is checked against the
/// clue's length, and then its letters are written across the clue's cells.
/// Completing the grid completes the puzzle.
///
/// The status of the puzzle is deliberately not consulted, so answers are
/// still accepted after completion.
///
/// # Arguments
///
/// * `puzzle` - The puzzle to update.
/// * `clue` - The clue reference, as typed by the user.
/// * `answer` - The answer, as typed by the user.
///
/// # Returns
///
/// The normalized clue and answer, and whether the grid is now complete.
///
/// # Errors
///
/// * [`Rejection::InvalidClueFormat`] if the reference is malformed.
/// * [`Rejection::ClueNotFound`] if the puzzle has no such clue.
/// * [`Rejection::LengthMismatch`] if the answer has the wrong length.
/// * [`Rejection::InvalidAnswer`] if the answer contains anything but the
///   letters `A` to `Z`.
pub fn apply_answer(
	puzzle: &mut Puzzle,
	clue: &str,
	answer: &str
) -> Result<Applied, Rejection>
{
	let reference = ClueRef::parse(clue)?;
	let answer = normalize(answer);
	let entry = puzzle.clues.get_mut(&reference)
		.ok_or_else(|| Rejection::ClueNotFound(reference.clone()))?;
	let expected = entry.len();
	let actual = answer.chars().count();
	if actual != expected
	{
		return Err(Rejection::LengthMismatch {
			clue: reference,
			expected,
			actual
		})
	}
	if !answer.chars().all(|c| c.is_ascii_alphabetic())
	{
		return Err(Rejection::InvalidAnswer { clue: reference, answer })
	}

	// The answer is valid, so commit it.
	for (position, letter) in entry.span().zip(answer.chars())
	{
		if let Some(cell) = puzzle.grid.get_mut(position)
		{
			cell.value = Some(letter);
		}
	}
	entry.status = ClueStatus::Solved;
	debug!("{}: solved with {}", reference, answer);

	let completed = puzzle.is_complete();
	if completed
	{
		info!("puzzle in thread {} is complete", puzzle.thread);
		puzzle.status = PuzzleStatus::Completed;
	}
	Ok(Applied { clue: reference, answer, completed })
}

/// Remove the answer to a clue, returning the clue to the unsolved state and
/// clearing its cells according to the removal policy. Only running puzzles
/// accept removals.
///
/// # Arguments
///
/// * `puzzle` - The puzzle to update.
/// * `clue` - The clue reference, as typed by the user.
/// * `policy` - How to treat cells shared with crossing clues.
///
/// # Returns
///
/// The normalized clue and the positions that were cleared.
///
/// # Errors
///
/// * [`Rejection::PuzzleNotActive`] if the puzzle is not running.
/// * [`Rejection::InvalidClueFormat`] if the reference is malformed.
/// * [`Rejection::ClueNotFound`] if the puzzle has no such clue.
pub fn remove_answer(
	puzzle: &mut Puzzle,
	clue: &str,
	policy: RemovalPolicy
) -> Result<Removed, Rejection>
{
	if !puzzle.is_running()
	{
		return Err(Rejection::PuzzleNotActive)
	}
	let reference = ClueRef::parse(clue)?;
	let entry = puzzle.clues.get_mut(&reference)
		.ok_or_else(|| Rejection::ClueNotFound(reference.clone()))?;
	entry.status = ClueStatus::Unsolved;
	let span = entry.span().collect::<Vec<_>>();

	let mut cleared = Vec::with_capacity(span.len());
	for position in span
	{
		let Some(cell) = puzzle.grid.get(position) else { continue };
		let claimed = match policy
		{
			RemovalPolicy::Unconditional => false,
			RemovalPolicy::Shared => cell.clue_refs.iter()
				.filter(|other| **other != reference)
				.any(|other| puzzle.clues.get(other).is_some_and(|c| c.is_solved()))
		};
		if !claimed
		{
			puzzle.grid[position].value = None;
			cleared.push(position);
		}
	}
	debug!("{}: unsolved, cleared {} cells", reference, cleared.len());
	Ok(Removed { clue: reference, cleared })
}

////////////////////////////////////////////////////////////////////////////////
//                                Rejections.                                 //
////////////////////////////////////////////////////////////////////////////////

/// The complete enumeration of reasons to refuse a submission. Every
/// rejection leaves the puzzle exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection
{
	/// The clue reference is not a number followed by `A` or `D`.
	InvalidClueFormat(String),

	/// The puzzle has no clue with the given reference.
	ClueNotFound(ClueRef),

	/// The answer does not have as many letters as the clue demands.
	LengthMismatch {
		/// The clue.
		clue: ClueRef,

		/// The number of letters the clue demands.
		expected: usize,

		/// The number of letters supplied.
		actual: usize
	},

	/// The answer contains something other than letters.
	InvalidAnswer {
		/// The clue.
		clue: ClueRef,

		/// The normalized answer.
		answer: String
	},

	/// The puzzle is no longer running.
	PuzzleNotActive
}

impl Display for Rejection
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::InvalidClueFormat(_) => write!(
				f,
				"Invalid clue format! Use a number followed by 'A' or 'D', \
					e.g., '5D'."
			),
			Self::ClueNotFound(clue) =>
				write!(f, "Clue {} not found in the puzzle.", clue),
			Self::LengthMismatch { clue, expected, actual } => write!(
				f,
				"Answer length mismatch! Clue {} expects {} letters, but you \
					provided {}.",
				clue,
				expected,
				actual
			),
			Self::InvalidAnswer { clue, answer } => write!(
				f,
				"Invalid answer '{}' for clue {}! Use letters only.",
				answer,
				clue
			),
			Self::PuzzleNotActive =>
				write!(f, "This thread does not contain an active crossword.")
		}
	}
}

impl Error for Rejection {}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test
{
	use crate::{
		engine::*,
		puzzle::{ClueRef, Position, Puzzle, PuzzleStatus, ThreadId},
		testing::sample_puzzle
	};

	fn puzzle() -> Puzzle { sample_puzzle(ThreadId(1)) }

	fn clue_ref(s: &str) -> ClueRef { ClueRef::parse(s).unwrap() }

	fn row(puzzle: &Puzzle, y: usize, xs: std::ops::Range<usize>) -> String
	{
		xs.map(|x| puzzle.grid[Position::new(x, y)].value.unwrap_or('.'))
			.collect()
	}

	/// Ensure that a correctly sized answer fills the clue's cells, and that
	/// any other size is rejected without touching the puzzle.
	#[test]
	fn test_length()
	{
		let mut puzzle = puzzle();
		assert!(!puzzle.grid[Position::new(0, 0)].blank);
		assert!(puzzle.grid[Position::new(0, 1)].blank);
		let pristine = puzzle.clone();
		assert_eq!(
			apply_answer(&mut puzzle, "1A", "LIEDI"),
			Err(Rejection::LengthMismatch {
				clue: clue_ref("1A"),
				expected: 6,
				actual: 5
			})
		);
		assert_eq!(puzzle, pristine);

		let applied = apply_answer(&mut puzzle, " 1 a", "lied in").unwrap();
		assert_eq!(
			applied,
			Applied {
				clue: clue_ref("1A"),
				answer: "LIEDIN".to_string(),
				completed: false
			}
		);
		assert_eq!(row(&puzzle, 0, 0..7), "LIEDIN.");
		assert!(puzzle.clues[&clue_ref("1A")].is_solved());
		assert_eq!(puzzle.status, PuzzleStatus::Running);
	}

	/// Ensure that malformed references, unknown clues, and non-letters are
	/// rejected without touching the puzzle.
	#[test]
	fn test_rejections()
	{
		let mut puzzle = puzzle();
		let pristine = puzzle.clone();
		assert_eq!(
			apply_answer(&mut puzzle, "1X", "LIEDIN"),
			Err(Rejection::InvalidClueFormat("1X".to_string()))
		);
		assert_eq!(
			apply_answer(&mut puzzle, "99a", "LIEDIN"),
			Err(Rejection::ClueNotFound(clue_ref("99A")))
		);
		assert_eq!(
			apply_answer(&mut puzzle, "1A", "LIE-IN"),
			Err(Rejection::InvalidAnswer {
				clue: clue_ref("1A"),
				answer: "LIE-IN".to_string()
			})
		);
		// Only the letters A to Z fill cells, one letter per cell.
		assert_eq!(
			apply_answer(&mut puzzle, "1A", "liediß"),
			Err(Rejection::InvalidAnswer {
				clue: clue_ref("1A"),
				answer: "LIEDIß".to_string()
			})
		);
		assert_eq!(
			apply_answer(&mut puzzle, "1A", "liédin"),
			Err(Rejection::InvalidAnswer {
				clue: clue_ref("1A"),
				answer: "LIéDIN".to_string()
			})
		);
		assert_eq!(
			remove_answer(&mut puzzle, "D", RemovalPolicy::Unconditional),
			Err(Rejection::InvalidClueFormat("D".to_string()))
		);
		assert_eq!(
			remove_answer(&mut puzzle, "4A", RemovalPolicy::Unconditional),
			Err(Rejection::ClueNotFound(clue_ref("4A")))
		);
		assert_eq!(puzzle, pristine);
	}

	/// Ensure that crossing answers overwrite each other, last write wins.
	#[test]
	fn test_overwrite()
	{
		let mut puzzle = puzzle();
		apply_answer(&mut puzzle, "1A", "LIEDIN").unwrap();
		apply_answer(&mut puzzle, "2D", "AUTHORITARIAN").unwrap();
		assert_eq!(row(&puzzle, 0, 0..6), "LAEDIN");
		apply_answer(&mut puzzle, "1A", "SETTLE").unwrap();
		assert_eq!(row(&puzzle, 0, 0..6), "SETTLE");
		assert_eq!(puzzle.grid[Position::new(1, 1)].value, Some('U'));
	}

	/// Ensure that applying and then removing an answer without solved
	/// crossings restores the puzzle.
	#[test]
	fn test_round_trip()
	{
		for policy in [RemovalPolicy::Unconditional, RemovalPolicy::Shared]
		{
			let mut puzzle = puzzle();
			let pristine = puzzle.clone();
			apply_answer(&mut puzzle, "9A", "RING").unwrap();
			assert_eq!(row(&puzzle, 2, 9..13), "RING");
			let removed = remove_answer(&mut puzzle, "9a", policy).unwrap();
			assert_eq!(removed.clue, clue_ref("9A"));
			assert_eq!(removed.cleared.len(), 4);
			assert_eq!(puzzle, pristine);
		}
	}

	/// Ensure that unconditional removal also erases letters that a solved
	/// crossing clue contributed.
	#[test]
	fn test_remove_unconditional()
	{
		let mut puzzle = puzzle();
		apply_answer(&mut puzzle, "1A", "LIEDIN").unwrap();
		apply_answer(&mut puzzle, "2D", "AUTHORITARIAN").unwrap();
		let removed =
			remove_answer(&mut puzzle, "2D", RemovalPolicy::Unconditional)
				.unwrap();
		assert_eq!(removed.cleared.len(), 13);
		assert_eq!(row(&puzzle, 0, 0..6), "L.EDIN");
		assert!(!puzzle.clues[&clue_ref("2D")].is_solved());
		// The crossing clue stays solved, even though it lost a letter.
		assert!(puzzle.clues[&clue_ref("1A")].is_solved());
	}

	/// Ensure that shared removal keeps letters that a solved crossing clue
	/// still covers, but clears those of unsolved crossings.
	#[test]
	fn test_remove_shared()
	{
		let mut puzzle = puzzle();
		apply_answer(&mut puzzle, "1A", "LIEDIN").unwrap();
		apply_answer(&mut puzzle, "2D", "AUTHORITARIAN").unwrap();
		let removed =
			remove_answer(&mut puzzle, "2D", RemovalPolicy::Shared).unwrap();
		assert_eq!(removed.cleared.len(), 12);
		assert!(!removed.cleared.contains(&Position::new(1, 0)));
		assert_eq!(row(&puzzle, 0, 0..6), "LAEDIN");
		assert_eq!(puzzle.grid[Position::new(1, 2)].value, None);

		// Once the crossing clue is gone too, nothing protects the cell.
		remove_answer(&mut puzzle, "1A", RemovalPolicy::Shared).unwrap();
		assert_eq!(row(&puzzle, 0, 0..6), "......");
	}

	/// Ensure that filling every cell completes the puzzle, that completed
	/// puzzles refuse removals, and that they still accept answers.
	#[test]
	fn test_completion()
	{
		let mut puzzle = puzzle();
		let mut references = puzzle.clues.keys().cloned().collect::<Vec<_>>();
		references.sort();
		let (last, rest) = references.split_last().unwrap();
		for reference in rest
		{
			let length = puzzle.clues[reference].len();
			let applied = apply_answer(
				&mut puzzle,
				reference.as_str(),
				&"X".repeat(length)
			).unwrap();
			assert!(!applied.completed, "{}", reference);
		}
		let length = puzzle.clues[last].len();
		let applied =
			apply_answer(&mut puzzle, last.as_str(), &"Y".repeat(length))
				.unwrap();
		assert!(applied.completed);
		assert!(puzzle.is_complete());
		assert_eq!(puzzle.status, PuzzleStatus::Completed);

		let pristine = puzzle.clone();
		assert_eq!(
			remove_answer(&mut puzzle, "1A", RemovalPolicy::Unconditional),
			Err(Rejection::PuzzleNotActive)
		);
		assert_eq!(puzzle, pristine);
		apply_answer(&mut puzzle, "1A", "LIEDIN").unwrap();
		assert_eq!(row(&puzzle, 0, 0..6), "LIEDIN");

		puzzle.grid[Position::new(4, 4)].value = None;
		assert!(!puzzle.is_complete());
	}
}
