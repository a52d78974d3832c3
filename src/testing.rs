//! Fixtures shared by the unit tests. The sample fragments under `samples/`
//! follow the markup of the live puzzle page.

use std::fs::read_to_string;

use chrono::NaiveDate;

use crate::{
	fetch::Fragments,
	puzzle::{ChannelId, Puzzle, PuzzleStatus, ThreadId},
	service::assemble
};

/// The directory holding the saved puzzle fragments.
pub(crate) const SAMPLES: &str = "samples";

/// Read the saved puzzle fragments.
pub(crate) fn sample_fragments() -> Fragments
{
	let read = |name: &str| {
		read_to_string(format!("{}/{}.html", SAMPLES, name)).unwrap()
	};
	Fragments {
		grid: read("puzzle_grid"),
		across: read("across_clues"),
		down: read("down_clues")
	}
}

/// Assemble the saved puzzle into a fresh, running puzzle hosted by the given
/// thread of channel `42` on New Year's Day 2025.
pub(crate) fn sample_puzzle(thread: ThreadId) -> Puzzle
{
	let (grid, clues, warnings) = assemble(&sample_fragments()).unwrap();
	assert!(warnings.is_empty(), "{:?}", warnings);
	Puzzle {
		thread,
		channel: ChannelId(42),
		date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
		source: "metrocryptic".to_string(),
		status: PuzzleStatus::Running,
		grid,
		clues
	}
}
