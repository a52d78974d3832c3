//! # Puzzle service
//!
//! Herein are the four operations that a chat front end offers its users:
//! start a puzzle, submit an answer, remove an answer, and end a puzzle.
//! Each composes the extractor, the indexer, and the answer engine with the
//! [store](PuzzleStore), the [fetcher](Fetch), and the [renderer](Render).
//!
//! Updates to a puzzle run under the store's lock for the puzzle's thread,
//! from the load through the final save, so concurrent submissions to one
//! puzzle are serialized while different puzzles proceed independently.
//! Fetching and rendering never happen while a lock is held.

use std::{
	error::Error,
	fmt::{self, Display, Formatter},
	sync::Arc,
	time::Duration
};

use chrono::NaiveDate;
use log::{debug, info};

use crate::{
	engine::{apply_answer, remove_answer, Applied, EngineConfig, Rejection, Removed},
	extract::{extract_clues, extract_grid, ExtractionError},
	fetch::{fetch_with_timeout, Fetch, FetchError, Fragments},
	index::{build_clue_index, IndexingWarning},
	puzzle::{ChannelId, ClueIndex, Direction, Grid, Puzzle, PuzzleStatus, ThreadId},
	render::{Render, RenderError},
	store::{next_thread_id, PuzzleStore, StoreError}
};

////////////////////////////////////////////////////////////////////////////////
//                                 Requests.                                  //
////////////////////////////////////////////////////////////////////////////////

/// A puzzle source: a site or puzzle variant with a page to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source
{
	/// The identifier recorded with every puzzle from this source.
	pub name: String,

	/// The human-readable title, used to name puzzle threads.
	pub title: String,

	/// The location of the puzzle page.
	pub url: String
}

impl Source
{
	/// The location of the daily Metro cryptic crossword.
	pub const METRO_CRYPTIC_URL: &'static str =
		"https://metro.co.uk/puzzles/cryptic-crosswords-online-free-daily-word-puzzle/";

	/// The daily Metro cryptic crossword.
	pub fn metro_cryptic() -> Self
	{
		Self {
			name: "metrocryptic".to_string(),
			title: "Metro Cryptic".to_string(),
			url: Self::METRO_CRYPTIC_URL.to_string()
		}
	}

	/// The name of the thread hosting this source's puzzle for the given
	/// date.
	pub fn thread_name(&self, date: NaiveDate) -> String
	{
		format!("{} {}", self.title, date.format("%Y-%m-%d"))
	}
}

impl Default for Source
{
	fn default() -> Self { Self::metro_cryptic() }
}

/// Everything needed to start a puzzle.
#[derive(Clone, Debug)]
pub struct StartRequest
{
	/// The channel in which the puzzle is requested.
	pub channel: ChannelId,

	/// The thread that will host the puzzle, or `None` for the next free
	/// thread at the moment the puzzle is recorded.
	pub thread: Option<ThreadId>,

	/// The puzzle date.
	pub date: NaiveDate,

	/// Where to fetch the puzzle from.
	pub source: Source,

	/// How long to wait for the puzzle page.
	pub timeout: Duration
}

////////////////////////////////////////////////////////////////////////////////
//                                 Outcomes.                                  //
////////////////////////////////////////////////////////////////////////////////

/// The rendered pictures of a puzzle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Images
{
	/// The grid.
	pub grid: Vec<u8>,

	/// The clue lists.
	pub clues: Vec<u8>
}

impl Images
{
	/// Render both pictures of a puzzle.
	///
	/// # Errors
	///
	/// [`RenderError`] if either picture cannot be drawn.
	pub fn of(renderer: &dyn Render, puzzle: &Puzzle) -> Result<Self, RenderError>
	{
		Ok(Self {
			grid: renderer.render_grid(&puzzle.grid)?,
			clues: renderer.render_clues(&puzzle.clues)?
		})
	}
}

/// The outcome of [`start_puzzle`].
#[derive(Clone, Debug)]
pub struct Started
{
	/// The new puzzle, as stored.
	pub puzzle: Puzzle,

	/// The rendered puzzle.
	pub images: Images,

	/// The clues that were left out of the index.
	pub warnings: Vec<IndexingWarning>
}

/// The outcome of [`submit_answer`].
#[derive(Clone, Debug)]
pub struct Answered
{
	/// The accepted answer.
	pub applied: Applied,

	/// The updated puzzle, as stored.
	pub puzzle: Puzzle,

	/// The rendered puzzle.
	pub images: Images
}

/// The outcome of [`retract_answer`].
#[derive(Clone, Debug)]
pub struct Retracted
{
	/// The removed answer.
	pub removed: Removed,

	/// The updated puzzle, as stored.
	pub puzzle: Puzzle,

	/// The rendered puzzle.
	pub images: Images
}

////////////////////////////////////////////////////////////////////////////////
//                                Operations.                                 //
////////////////////////////////////////////////////////////////////////////////

/// Turn the raw fragments of a puzzle page into a grid and a clue index.
///
/// # Arguments
///
/// * `fragments` - The grid, across, and down markup.
///
/// # Returns
///
/// A 3-tuple comprising the grid, the clue index, and the warnings for every
/// clue that was left out, respectively.
///
/// # Errors
///
/// * [`ExtractionError::EmptyGrid`] or [`ExtractionError::NotSquare`] if the
///   grid is unusable.
/// * [`ExtractionError::NoClues`] if either clue list is empty.
/// * [`ExtractionError::NothingIndexed`] if no clue fits the grid.
pub fn assemble(
	fragments: &Fragments
) -> Result<(Grid, ClueIndex, Vec<IndexingWarning>), ExtractionError>
{
	let (cells, width) = extract_grid(&fragments.grid);
	let mut grid = Grid::square(cells, width)?;
	let across = extract_clues(&fragments.across, Direction::Across);
	if across.is_empty()
	{
		return Err(ExtractionError::NoClues(Direction::Across))
	}
	let mut clues = extract_clues(&fragments.down, Direction::Down);
	if clues.is_empty()
	{
		return Err(ExtractionError::NoClues(Direction::Down))
	}
	clues.extend(across);
	let (index, warnings) = build_clue_index(&clues, &mut grid);
	if index.is_empty()
	{
		return Err(ExtractionError::NothingIndexed)
	}
	debug!("assembled {}×{} grid with {} clues", width, width, index.len());
	Ok((grid, index, warnings))
}

/// Start a puzzle: fetch its page, extract and index it, render it, and only
/// then record it. Any failure leaves the store untouched.
///
/// # Arguments
///
/// * `store` - The puzzle store.
/// * `fetcher` - The supplier of puzzle pages.
/// * `renderer` - The producer of puzzle images.
/// * `request` - What to start, and where.
///
/// # Returns
///
/// The new puzzle, its images, and any indexing warnings.
///
/// # Errors
///
/// * [`ServiceError::DuplicatePuzzle`] if the channel already has this
///   source's puzzle for the date.
/// * [`ServiceError::Fetch`], [`ServiceError::Extraction`], or
///   [`ServiceError::Render`] if the puzzle cannot be prepared.
/// * [`ServiceError::Store`] if the store fails.
pub fn start_puzzle(
	store: &dyn PuzzleStore,
	fetcher: &Arc<dyn Fetch>,
	renderer: &dyn Render,
	request: &StartRequest
) -> Result<Started, ServiceError>
{
	let StartRequest { channel, thread, date, ref source, timeout } = *request;
	if let Some(existing) = store.exists(channel, date, &source.name)?
	{
		return Err(ServiceError::DuplicatePuzzle { existing })
	}
	let fragments = fetch_with_timeout(fetcher, &source.url, timeout)?;
	let (grid, clues, warnings) = assemble(&fragments)?;
	let mut puzzle = Puzzle {
		thread: match thread
		{
			Some(thread) => thread,
			None => next_thread_id(store)?
		},
		channel,
		date,
		source: source.name.clone(),
		status: PuzzleStatus::Running,
		grid,
		clues
	};
	let images = Images::of(renderer, &puzzle)?;
	loop
	{
		match store.create(puzzle.clone())
		{
			// Another start took the thread since it was chosen.
			Err(StoreError::ThreadTaken(taken)) if thread.is_none() =>
			{
				debug!("thread {} taken, choosing another", taken);
				puzzle.thread = next_thread_id(store)?;
			}
			result => break result?
		}
	}
	info!("started {} in thread {}", source.thread_name(date), puzzle.thread);
	Ok(Started { puzzle, images, warnings })
}

/// Submit an answer to a clue of the puzzle hosted by a thread.
///
/// # Arguments
///
/// * `store` - The puzzle store.
/// * `renderer` - The producer of puzzle images.
/// * `thread` - The thread hosting the puzzle.
/// * `clue` - The clue reference, as typed by the user.
/// * `answer` - The answer, as typed by the user.
///
/// # Returns
///
/// The accepted answer, the updated puzzle, and its images.
///
/// # Errors
///
/// * [`ServiceError::NoPuzzle`] if the thread hosts no puzzle.
/// * [`ServiceError::Rejection`] if the answer is refused.
/// * [`ServiceError::Store`] or [`ServiceError::Render`] on failure.
pub fn submit_answer(
	store: &dyn PuzzleStore,
	renderer: &dyn Render,
	thread: ThreadId,
	clue: &str,
	answer: &str
) -> Result<Answered, ServiceError>
{
	let (applied, puzzle) = {
		let _guard = store.locks().acquire(thread);
		let mut puzzle = store.load(thread)?
			.ok_or(ServiceError::NoPuzzle(thread))?;
		let applied = apply_answer(&mut puzzle, clue, answer)?;
		store.save(thread, &puzzle.grid, &puzzle.clues)?;
		if applied.completed
		{
			store.set_status(thread, PuzzleStatus::Completed)?;
		}
		(applied, puzzle)
	};
	let images = Images::of(renderer, &puzzle)?;
	Ok(Answered { applied, puzzle, images })
}

/// Remove the answer to a clue of the puzzle hosted by a thread.
///
/// # Arguments
///
/// * `store` - The puzzle store.
/// * `renderer` - The producer of puzzle images.
/// * `config` - The answer engine configuration.
/// * `thread` - The thread hosting the puzzle.
/// * `clue` - The clue reference, as typed by the user.
///
/// # Returns
///
/// The removed answer, the updated puzzle, and its images.
///
/// # Errors
///
/// * [`ServiceError::NoPuzzle`] if the thread hosts no puzzle.
/// * [`ServiceError::Rejection`] if the removal is refused.
/// * [`ServiceError::Store`] or [`ServiceError::Render`] on failure.
pub fn retract_answer(
	store: &dyn PuzzleStore,
	renderer: &dyn Render,
	config: EngineConfig,
	thread: ThreadId,
	clue: &str
) -> Result<Retracted, ServiceError>
{
	let (removed, puzzle) = {
		let _guard = store.locks().acquire(thread);
		let mut puzzle = store.load(thread)?
			.ok_or(ServiceError::NoPuzzle(thread))?;
		let removed = remove_answer(&mut puzzle, clue, config.removal)?;
		store.save(thread, &puzzle.grid, &puzzle.clues)?;
		(removed, puzzle)
	};
	let images = Images::of(renderer, &puzzle)?;
	Ok(Retracted { removed, puzzle, images })
}

/// End the puzzle hosted by a thread, deleting its record.
///
/// # Returns
///
/// The final state of the puzzle.
///
/// # Errors
///
/// * [`ServiceError::NoPuzzle`] if the thread hosts no puzzle.
/// * [`ServiceError::Store`] if the store fails.
pub fn end_puzzle(
	store: &dyn PuzzleStore,
	thread: ThreadId
) -> Result<Puzzle, ServiceError>
{
	let _guard = store.locks().acquire(thread);
	let puzzle = store.delete(thread)?.ok_or(ServiceError::NoPuzzle(thread))?;
	info!("ended puzzle in thread {}", thread);
	Ok(puzzle)
}

/// Load the puzzle hosted by a thread and render it.
///
/// # Errors
///
/// * [`ServiceError::NoPuzzle`] if the thread hosts no puzzle.
/// * [`ServiceError::Store`] or [`ServiceError::Render`] on failure.
pub fn show_puzzle(
	store: &dyn PuzzleStore,
	renderer: &dyn Render,
	thread: ThreadId
) -> Result<(Puzzle, Images), ServiceError>
{
	let puzzle = store.load(thread)?.ok_or(ServiceError::NoPuzzle(thread))?;
	let images = Images::of(renderer, &puzzle)?;
	Ok((puzzle, images))
}

////////////////////////////////////////////////////////////////////////////////
//                                  Errors.                                   //
////////////////////////////////////////////////////////////////////////////////

/// The complete enumeration of service failures. The [`Display`] text of each
/// is fit to show to the user who made the request.
#[derive(Debug)]
pub enum ServiceError
{
	/// The answer engine refused the submission.
	Rejection(Rejection),

	/// The puzzle page could not be fetched.
	Fetch(FetchError),

	/// The puzzle page could not be understood.
	Extraction(ExtractionError),

	/// The puzzle could not be drawn.
	Render(RenderError),

	/// The store failed.
	Store(StoreError),

	/// The thread hosts no puzzle.
	NoPuzzle(ThreadId),

	/// The puzzle is already running in another thread.
	DuplicatePuzzle {
		/// The thread hosting the existing puzzle.
		existing: ThreadId
	}
}

impl Display for ServiceError
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::Rejection(e) => write!(f, "{}", e),
			Self::Fetch(e) => write!(f, "Error fetching puzzle: {}", e),
			Self::Extraction(e) =>
				write!(f, "Error processing puzzle data: {}", e),
			Self::Render(e) => write!(f, "Error rendering puzzle: {}", e),
			Self::Store(e) => write!(f, "Error accessing puzzle records: {}", e),
			Self::NoPuzzle(_) => write!(
				f,
				"This thread does not seem to contain an active crossword."
			),
			Self::DuplicatePuzzle { existing } => write!(
				f,
				"Today's crossword is already running! You can find it in \
					thread {}.",
				existing
			)
		}
	}
}

impl Error for ServiceError
{
	fn source(&self) -> Option<&(dyn Error + 'static)>
	{
		match self
		{
			Self::Rejection(e) => Some(e),
			Self::Fetch(e) => Some(e),
			Self::Extraction(e) => Some(e),
			Self::Render(e) => Some(e),
			Self::Store(e) => Some(e),
			_ => None
		}
	}
}

impl From<Rejection> for ServiceError
{
	fn from(e: Rejection) -> Self { Self::Rejection(e) }
}

impl From<FetchError> for ServiceError
{
	fn from(e: FetchError) -> Self { Self::Fetch(e) }
}

impl From<ExtractionError> for ServiceError
{
	fn from(e: ExtractionError) -> Self { Self::Extraction(e) }
}

impl From<RenderError> for ServiceError
{
	fn from(e: RenderError) -> Self { Self::Render(e) }
}

impl From<StoreError> for ServiceError
{
	fn from(e: StoreError) -> Self
	{
		match e
		{
			StoreError::DuplicatePuzzle { existing } =>
				Self::DuplicatePuzzle { existing },
			e => Self::Store(e)
		}
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////
