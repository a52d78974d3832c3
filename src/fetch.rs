//! # Fetching
//!
//! Herein is the supplier side of puzzle creation: something that, given the
//! location of a puzzle page, produces the three markup fragments the
//! extractor needs. Driving a headless browser is left to other [`Fetch`]
//! implementations; [`DirectoryFetcher`] serves fragments that were saved to
//! disk.

use std::{
	error::Error,
	fmt::{self, Display, Formatter},
	fs,
	io,
	path::{Path, PathBuf},
	sync::{mpsc, Arc},
	thread,
	time::Duration
};

use log::{trace, warn};

/// The three markup fragments of a puzzle page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fragments
{
	/// The inner markup of the puzzle grid.
	pub grid: String,

	/// The inner markup of the across clue list.
	pub across: String,

	/// The inner markup of the down clue list.
	pub down: String
}

/// A supplier of puzzle fragments.
pub trait Fetch: Send + Sync
{
	/// Fetch the fragments of the puzzle page at the given location.
	///
	/// # Errors
	///
	/// Any failure to reach or load the page.
	fn fetch_fragments(&self, url: &str) -> Result<Fragments, FetchError>;
}

/// Serves fragments saved as `puzzle_grid.html`, `across_clues.html`, and
/// `down_clues.html` within the directory named by the location. A `file://`
/// prefix on the location is ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectoryFetcher;

impl DirectoryFetcher
{
	/// The file names of the grid, across, and down fragments, respectively.
	pub const FILES: [&'static str; 3] =
		["puzzle_grid.html", "across_clues.html", "down_clues.html"];

	fn read(dir: &Path, name: &str) -> Result<String, FetchError>
	{
		let path = dir.join(name);
		let content = fs::read_to_string(&path)
			.map_err(|e| FetchError::Io { path: path.clone(), source: e })?;
		trace!("read fragment: {}", path.display());
		Ok(content)
	}
}

impl Fetch for DirectoryFetcher
{
	fn fetch_fragments(&self, url: &str) -> Result<Fragments, FetchError>
	{
		let dir = Path::new(url.strip_prefix("file://").unwrap_or(url));
		let [grid, across, down] = Self::FILES;
		Ok(Fragments {
			grid: Self::read(dir, grid)?,
			across: Self::read(dir, across)?,
			down: Self::read(dir, down)?
		})
	}
}

/// Fetch the fragments on a worker thread, giving up after the timeout. An
/// abandoned fetch runs to completion in the background, but its result is
/// discarded.
///
/// # Arguments
///
/// * `fetcher` - The supplier of fragments.
/// * `url` - The location of the puzzle page.
/// * `timeout` - How long to wait for the fragments.
///
/// # Returns
///
/// The fragments.
///
/// # Errors
///
/// * [`FetchError::Timeout`] if the fetch did not finish in time.
/// * [`FetchError::Interrupted`] if the worker died without an answer.
/// * Any error reported by the fetcher itself.
pub fn fetch_with_timeout(
	fetcher: &Arc<dyn Fetch>,
	url: &str,
	timeout: Duration
) -> Result<Fragments, FetchError>
{
	let (sender, receiver) = mpsc::channel();
	let worker = Arc::clone(fetcher);
	let location = url.to_string();
	thread::Builder::new()
		.name("fetch".to_string())
		.spawn(move || {
			// The receiver is gone if the caller already gave up.
			let _ = sender.send(worker.fetch_fragments(&location));
		})
		.map_err(FetchError::Spawn)?;
	match receiver.recv_timeout(timeout)
	{
		Ok(result) => result,
		Err(mpsc::RecvTimeoutError::Timeout) =>
		{
			warn!("gave up fetching {} after {:?}", url, timeout);
			Err(FetchError::Timeout(timeout))
		}
		Err(mpsc::RecvTimeoutError::Disconnected) =>
			Err(FetchError::Interrupted)
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                  Errors.                                   //
////////////////////////////////////////////////////////////////////////////////

/// The complete enumeration of fetch failures.
#[derive(Debug)]
pub enum FetchError
{
	/// A fragment could not be read.
	Io {
		/// The location of the fragment.
		path: PathBuf,

		/// The underlying failure.
		source: io::Error
	},

	/// The page could not be loaded.
	Unavailable(String),

	/// The page did not load in time.
	Timeout(Duration),

	/// The fetch worker could not be started.
	Spawn(io::Error),

	/// The fetch worker died without producing a result.
	Interrupted
}

impl Display for FetchError
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::Io { path, source } =>
				write!(f, "{}: {}", path.display(), source),
			Self::Unavailable(reason) => write!(f, "{}", reason),
			Self::Timeout(timeout) =>
				write!(f, "timed out after {}s", timeout.as_secs_f32()),
			Self::Spawn(e) => write!(f, "cannot start fetch: {}", e),
			Self::Interrupted => write!(f, "fetch was interrupted")
		}
	}
}

impl Error for FetchError
{
	fn source(&self) -> Option<&(dyn Error + 'static)>
	{
		match self
		{
			Self::Io { source, .. } => Some(source),
			Self::Spawn(e) => Some(e),
			_ => None
		}
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test
{
	use std::{sync::Arc, thread, time::Duration};

	use crate::{fetch::*, testing::{sample_fragments, SAMPLES}};

	/// A fetcher that takes its time.
	struct Sluggish(Duration);

	impl Fetch for Sluggish
	{
		fn fetch_fragments(&self, _url: &str) -> Result<Fragments, FetchError>
		{
			thread::sleep(self.0);
			Ok(Fragments::default())
		}
	}

	/// A fetcher that always fails.
	struct Unreachable;

	impl Fetch for Unreachable
	{
		fn fetch_fragments(&self, url: &str) -> Result<Fragments, FetchError>
		{
			Err(FetchError::Unavailable(format!("{} is unreachable", url)))
		}
	}

	/// A fetcher that dies.
	struct Doomed;

	impl Fetch for Doomed
	{
		fn fetch_fragments(&self, _url: &str) -> Result<Fragments, FetchError>
		{
			panic!("fetcher exploded")
		}
	}

	#[test]
	fn test_directory_fetcher()
	{
		let fragments = DirectoryFetcher.fetch_fragments(SAMPLES).unwrap();
		assert_eq!(fragments, sample_fragments());
		let prefixed = DirectoryFetcher
			.fetch_fragments(&format!("file://{}", SAMPLES))
			.unwrap();
		assert_eq!(prefixed, fragments);
		assert!(matches!(
			DirectoryFetcher.fetch_fragments("no/such/dir"),
			Err(FetchError::Io { .. })
		));
	}

	#[test]
	fn test_timeout()
	{
		let slow: Arc<dyn Fetch> = Arc::new(Sluggish(Duration::from_millis(500)));
		assert!(matches!(
			fetch_with_timeout(&slow, "slow", Duration::from_millis(10)),
			Err(FetchError::Timeout(_))
		));
		let fast: Arc<dyn Fetch> = Arc::new(Sluggish(Duration::ZERO));
		assert_eq!(
			fetch_with_timeout(&fast, "fast", Duration::from_secs(5)).unwrap(),
			Fragments::default()
		);
	}

	#[test]
	fn test_failures()
	{
		let unreachable: Arc<dyn Fetch> = Arc::new(Unreachable);
		let error =
			fetch_with_timeout(&unreachable, "nowhere", Duration::from_secs(5))
				.unwrap_err();
		assert_eq!(error.to_string(), "nowhere is unreachable");
		let doomed: Arc<dyn Fetch> = Arc::new(Doomed);
		assert!(matches!(
			fetch_with_timeout(&doomed, "doom", Duration::from_secs(5)),
			Err(FetchError::Interrupted)
		));
	}
}
