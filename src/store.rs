//! # Puzzle store
//!
//! Herein is the persistence contract for puzzle records, together with two
//! implementations: [`MemoryStore`], which keeps records in process, and
//! [`FileStore`], which keeps one [`bincode`](bincode) file per thread so
//! that puzzles survive restarts.
//!
//! Every store carries a [`ThreadLocks`] table. A read-modify-write of a
//! puzzle must hold the lock for its thread from the load through the last
//! save, so that concurrent submissions to the same puzzle cannot lose each
//! other's letters. Locks for different threads are independent.

use std::{
	collections::{HashMap, HashSet},
	error::Error,
	fmt::{self, Display, Formatter},
	fs::{self, File},
	io::{self, BufReader, ErrorKind, Read, Write},
	path::{Path, PathBuf},
	sync::{Condvar, Mutex, MutexGuard, PoisonError}
};

use chrono::NaiveDate;
use log::{trace, warn};

use crate::puzzle::{ChannelId, ClueIndex, Grid, Puzzle, PuzzleStatus, ThreadId};

////////////////////////////////////////////////////////////////////////////////
//                                 Contract.                                  //
////////////////////////////////////////////////////////////////////////////////

/// Persistent storage for puzzle records, keyed by thread.
pub trait PuzzleStore: Send + Sync
{
	/// Find the thread of the puzzle started in the given channel for the
	/// given date and source, if there is one.
	fn exists(
		&self,
		channel: ChannelId,
		date: NaiveDate,
		source: &str
	) -> Result<Option<ThreadId>, StoreError>;

	/// Store a new puzzle record as given.
	///
	/// # Errors
	///
	/// * [`StoreError::DuplicatePuzzle`] if a puzzle already exists for the
	///   same channel, date, and source.
	/// * [`StoreError::ThreadTaken`] if the thread already hosts a puzzle.
	fn create(&self, puzzle: Puzzle) -> Result<(), StoreError>;

	/// Load the puzzle hosted by the given thread, if any.
	fn load(&self, thread: ThreadId) -> Result<Option<Puzzle>, StoreError>;

	/// Replace the cells and clues of a puzzle, leaving its status untouched.
	///
	/// # Errors
	///
	/// [`StoreError::NotFound`] if the thread hosts no puzzle.
	fn save(
		&self,
		thread: ThreadId,
		grid: &Grid,
		clues: &ClueIndex
	) -> Result<(), StoreError>;

	/// Update the status of a puzzle.
	///
	/// # Errors
	///
	/// [`StoreError::NotFound`] if the thread hosts no puzzle.
	fn set_status(
		&self,
		thread: ThreadId,
		status: PuzzleStatus
	) -> Result<(), StoreError>;

	/// Delete the puzzle hosted by the given thread.
	///
	/// # Returns
	///
	/// The deleted puzzle, or `None` if there was none.
	fn delete(&self, thread: ThreadId) -> Result<Option<Puzzle>, StoreError>;

	/// The threads of every stored puzzle, in ascending order.
	fn threads(&self) -> Result<Vec<ThreadId>, StoreError>;

	/// The per-thread lock table that serializes updates to each puzzle.
	fn locks(&self) -> &ThreadLocks;
}

/// Choose an identifier for a new thread: one past the largest identifier in
/// use, or `1` for an empty store.
pub fn next_thread_id<S: PuzzleStore + ?Sized>(store: &S) -> Result<ThreadId, StoreError>
{
	let last = store.threads()?.into_iter().max().map_or(0, |t| t.0);
	Ok(ThreadId(last + 1))
}

////////////////////////////////////////////////////////////////////////////////
//                                   Locks.                                   //
////////////////////////////////////////////////////////////////////////////////

/// Mutual exclusion per thread. Acquiring the lock for one thread never waits
/// on another thread's lock.
#[derive(Debug, Default)]
pub struct ThreadLocks
{
	/// The threads whose locks are currently held.
	busy: Mutex<HashSet<ThreadId>>,

	/// Signalled whenever a lock is released.
	released: Condvar
}

impl ThreadLocks
{
	/// Acquire the lock for the given thread, blocking until it is free.
	///
	/// # Returns
	///
	/// A guard that releases the lock when dropped.
	pub fn acquire(&self, thread: ThreadId) -> ThreadGuard<'_>
	{
		let mut busy = self.busy();
		while busy.contains(&thread)
		{
			busy = self.released.wait(busy)
				.unwrap_or_else(PoisonError::into_inner);
		}
		busy.insert(thread);
		trace!("locked thread {}", thread);
		ThreadGuard { locks: self, thread }
	}

	/// Check whether the lock for the given thread is currently held.
	#[must_use]
	pub fn is_locked(&self, thread: ThreadId) -> bool
	{
		self.busy().contains(&thread)
	}

	/// The set of busy threads. The set is always consistent, so a panic
	/// while holding it cannot leave it in a bad state.
	fn busy(&self) -> MutexGuard<'_, HashSet<ThreadId>>
	{
		self.busy.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Proof that the lock for a thread is held.
#[must_use]
#[derive(Debug)]
pub struct ThreadGuard<'a>
{
	locks: &'a ThreadLocks,
	thread: ThreadId
}

impl Drop for ThreadGuard<'_>
{
	fn drop(&mut self)
	{
		self.locks.busy().remove(&self.thread);
		self.locks.released.notify_all();
		trace!("unlocked thread {}", self.thread);
	}
}

////////////////////////////////////////////////////////////////////////////////
//                               Memory store.                                //
////////////////////////////////////////////////////////////////////////////////

/// A store that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryStore
{
	records: Mutex<HashMap<ThreadId, Puzzle>>,
	locks: ThreadLocks
}

impl MemoryStore
{
	#[inline]
	pub fn new() -> Self { Self::default() }

	fn records(&self) -> MutexGuard<'_, HashMap<ThreadId, Puzzle>>
	{
		self.records.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn update<F>(&self, thread: ThreadId, f: F) -> Result<(), StoreError>
		where F: FnOnce(&mut Puzzle)
	{
		let mut records = self.records();
		let puzzle = records.get_mut(&thread)
			.ok_or(StoreError::NotFound(thread))?;
		f(puzzle);
		Ok(())
	}
}

impl PuzzleStore for MemoryStore
{
	fn exists(
		&self,
		channel: ChannelId,
		date: NaiveDate,
		source: &str
	) -> Result<Option<ThreadId>, StoreError>
	{
		Ok(self.records().values()
			.find(|p| p.channel == channel && p.date == date && p.source == source)
			.map(|p| p.thread))
	}

	fn create(&self, puzzle: Puzzle) -> Result<(), StoreError>
	{
		let mut records = self.records();
		if let Some(existing) = records.values()
			.find(|p| {
				p.channel == puzzle.channel
					&& p.date == puzzle.date
					&& p.source == puzzle.source
			})
		{
			return Err(StoreError::DuplicatePuzzle { existing: existing.thread })
		}
		if records.contains_key(&puzzle.thread)
		{
			return Err(StoreError::ThreadTaken(puzzle.thread))
		}
		records.insert(puzzle.thread, puzzle);
		Ok(())
	}

	fn load(&self, thread: ThreadId) -> Result<Option<Puzzle>, StoreError>
	{
		Ok(self.records().get(&thread).cloned())
	}

	fn save(
		&self,
		thread: ThreadId,
		grid: &Grid,
		clues: &ClueIndex
	) -> Result<(), StoreError>
	{
		self.update(thread, |puzzle| {
			puzzle.grid = grid.clone();
			puzzle.clues = clues.clone();
		})
	}

	fn set_status(
		&self,
		thread: ThreadId,
		status: PuzzleStatus
	) -> Result<(), StoreError>
	{
		self.update(thread, |puzzle| puzzle.status = status)
	}

	fn delete(&self, thread: ThreadId) -> Result<Option<Puzzle>, StoreError>
	{
		Ok(self.records().remove(&thread))
	}

	fn threads(&self) -> Result<Vec<ThreadId>, StoreError>
	{
		let mut threads = self.records().keys().copied().collect::<Vec<_>>();
		threads.sort();
		Ok(threads)
	}

	#[inline]
	fn locks(&self) -> &ThreadLocks { &self.locks }
}

////////////////////////////////////////////////////////////////////////////////
//                                File store.                                 //
////////////////////////////////////////////////////////////////////////////////

/// A store that keeps each record in its own file, `<thread>.puzzle`, within
/// a single directory. Records are serialized in [`bincode`](bincode) format
/// and replaced atomically, so a crash mid-write leaves the previous record
/// intact.
///
/// Uniqueness of (channel, date, source) is enforced within one process only.
#[derive(Debug)]
pub struct FileStore
{
	/// The directory containing the records.
	dir: PathBuf,

	/// Serializes the uniqueness check and insertion of new records.
	creating: Mutex<()>,

	locks: ThreadLocks
}

impl FileStore
{
	/// The extension of record files.
	const EXTENSION: &'static str = "puzzle";

	/// Open the store rooted at the given directory, creating the directory
	/// if necessary.
	///
	/// # Errors
	///
	/// If the directory cannot be created, an error is returned.
	pub fn open<T: AsRef<Path>>(dir: T) -> Result<Self, StoreError>
	{
		let dir = dir.as_ref().to_path_buf();
		fs::create_dir_all(&dir)?;
		trace!("opened puzzle store: {}", dir.display());
		Ok(Self { dir, creating: Mutex::new(()), locks: ThreadLocks::default() })
	}

	/// The path of the record for the given thread.
	#[inline]
	#[must_use]
	pub fn path(&self, thread: ThreadId) -> PathBuf
	{
		self.dir.join(format!("{}.{}", thread, Self::EXTENSION))
	}

	/// Read the record at the given path.
	///
	/// # Errors
	///
	/// * If the file cannot be opened or read, an error is returned.
	/// * If the file does not hold a record, [`StoreError::Corrupt`] is
	///   returned.
	fn read(path: &Path) -> Result<Puzzle, StoreError>
	{
		let mut reader = BufReader::new(File::open(path)?);
		let mut content = Vec::new();
		reader.read_to_end(&mut content)?;
		let puzzle = bincode::deserialize(&content)
			.map_err(|e| StoreError::Corrupt {
				path: path.to_path_buf(),
				reason: e.to_string()
			})?;
		trace!("read puzzle record: {}", path.display());
		Ok(puzzle)
	}

	/// Write the record for a puzzle, replacing any previous record.
	fn write(&self, puzzle: &Puzzle) -> Result<(), StoreError>
	{
		let path = self.path(puzzle.thread);
		let partial = path.with_extension("partial");
		let content = bincode::serialize(puzzle)
			.map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
		let written = File::create(&partial)
			.and_then(|mut file| {
				file.write_all(&content)?;
				file.sync_all()
			})
			.and_then(|()| fs::rename(&partial, &path));
		if let Err(e) = written
		{
			if let Err(cleanup) = fs::remove_file(&partial)
			{
				if cleanup.kind() != ErrorKind::NotFound
				{
					warn!("cannot remove {}: {}", partial.display(), cleanup);
				}
			}
			return Err(e.into())
		}
		trace!("wrote puzzle record: {}", path.display());
		Ok(())
	}

	/// Apply an update to an existing record.
	fn update<F>(&self, thread: ThreadId, f: F) -> Result<(), StoreError>
		where F: FnOnce(&mut Puzzle)
	{
		let mut puzzle = self.load(thread)?
			.ok_or(StoreError::NotFound(thread))?;
		f(&mut puzzle);
		self.write(&puzzle)
	}
}

impl PuzzleStore for FileStore
{
	fn exists(
		&self,
		channel: ChannelId,
		date: NaiveDate,
		source: &str
	) -> Result<Option<ThreadId>, StoreError>
	{
		for thread in self.threads()?
		{
			// A damaged record cannot match, and must not block other channels.
			let puzzle = match self.load(thread)
			{
				Ok(Some(puzzle)) => puzzle,
				Ok(None) => continue,
				Err(e @ StoreError::Corrupt { .. }) =>
				{
					warn!("skipping thread {}: {}", thread, e);
					continue
				}
				Err(e) => return Err(e)
			};
			if puzzle.channel == channel
				&& puzzle.date == date
				&& puzzle.source == source
			{
				return Ok(Some(thread))
			}
		}
		Ok(None)
	}

	fn create(&self, puzzle: Puzzle) -> Result<(), StoreError>
	{
		let _creating = self.creating.lock()
			.unwrap_or_else(PoisonError::into_inner);
		if let Some(existing) =
			self.exists(puzzle.channel, puzzle.date, &puzzle.source)?
		{
			return Err(StoreError::DuplicatePuzzle { existing })
		}
		if self.path(puzzle.thread).exists()
		{
			return Err(StoreError::ThreadTaken(puzzle.thread))
		}
		self.write(&puzzle)
	}

	fn load(&self, thread: ThreadId) -> Result<Option<Puzzle>, StoreError>
	{
		match Self::read(&self.path(thread))
		{
			Ok(puzzle) => Ok(Some(puzzle)),
			Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound =>
				Ok(None),
			Err(e) => Err(e)
		}
	}

	fn save(
		&self,
		thread: ThreadId,
		grid: &Grid,
		clues: &ClueIndex
	) -> Result<(), StoreError>
	{
		self.update(thread, |puzzle| {
			puzzle.grid = grid.clone();
			puzzle.clues = clues.clone();
		})
	}

	fn set_status(
		&self,
		thread: ThreadId,
		status: PuzzleStatus
	) -> Result<(), StoreError>
	{
		self.update(thread, |puzzle| puzzle.status = status)
	}

	fn delete(&self, thread: ThreadId) -> Result<Option<Puzzle>, StoreError>
	{
		let puzzle = self.load(thread)?;
		if puzzle.is_some()
		{
			fs::remove_file(self.path(thread))?;
			trace!("deleted puzzle record for thread {}", thread);
		}
		Ok(puzzle)
	}

	fn threads(&self) -> Result<Vec<ThreadId>, StoreError>
	{
		let mut threads = Vec::new();
		for entry in fs::read_dir(&self.dir)?
		{
			let path = entry?.path();
			if path.extension().and_then(|e| e.to_str()) != Some(Self::EXTENSION)
			{
				continue
			}
			if let Some(thread) = path.file_stem()
				.and_then(|stem| stem.to_str())
				.and_then(|stem| stem.parse().ok())
			{
				threads.push(ThreadId(thread));
			}
		}
		threads.sort();
		Ok(threads)
	}

	#[inline]
	fn locks(&self) -> &ThreadLocks { &self.locks }
}

////////////////////////////////////////////////////////////////////////////////
//                                  Errors.                                   //
////////////////////////////////////////////////////////////////////////////////

/// The complete enumeration of store failures.
#[derive(Debug)]
pub enum StoreError
{
	/// The underlying storage failed.
	Io(io::Error),

	/// A record could not be decoded.
	Corrupt {
		/// The location of the record.
		path: PathBuf,

		/// Why decoding failed.
		reason: String
	},

	/// A puzzle already exists for the same channel, date, and source.
	DuplicatePuzzle {
		/// The thread hosting the existing puzzle.
		existing: ThreadId
	},

	/// The thread already hosts a puzzle.
	ThreadTaken(ThreadId),

	/// The thread hosts no puzzle.
	NotFound(ThreadId)
}

impl Display for StoreError
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::Io(e) => write!(f, "storage failure: {}", e),
			Self::Corrupt { path, reason } => write!(
				f,
				"corrupt puzzle record: {}: {}",
				path.display(),
				reason
			),
			Self::DuplicatePuzzle { existing } => write!(
				f,
				"a puzzle for this channel, date, and source already exists in \
					thread {}",
				existing
			),
			Self::ThreadTaken(thread) =>
				write!(f, "thread {} already hosts a puzzle", thread),
			Self::NotFound(thread) =>
				write!(f, "thread {} hosts no puzzle", thread)
		}
	}
}

impl Error for StoreError
{
	fn source(&self) -> Option<&(dyn Error + 'static)>
	{
		match self
		{
			Self::Io(e) => Some(e),
			_ => None
		}
	}
}

impl From<io::Error> for StoreError
{
	fn from(e: io::Error) -> Self { Self::Io(e) }
}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////
