//! # Cryptic Crossword
//!
//! A cryptic crossword is a crossword whose every clue is a small riddle:
//! a definition paired with wordplay that leads to the same answer. This
//! program hosts such puzzles for groups of players. Each puzzle lives in a
//! thread of a channel, and the players fill in answers together, one command
//! at a time. Progress is kept in a store, so a puzzle can be picked up again
//! whenever the players return.
//!
//! Via subcommands, the user can start a puzzle from saved puzzle markup,
//! submit and remove answers, show or end a puzzle, and list every stored
//! puzzle. The `play` subcommand opens a text-based user interface (TUI) that
//! accepts the same commands as the chat front end.

mod app;
mod tui;

use std::{
	env,
	error::Error,
	io::{self, Write},
	path::PathBuf,
	process,
	sync::Arc,
	time::Duration
};

use chrono::{Local, NaiveDate};
use clap::{ArgAction, Parser, Subcommand};
use cryptic_crossword::{
	command::{Bot, Origin},
	engine::{EngineConfig, RemovalPolicy},
	fetch::{DirectoryFetcher, Fetch},
	puzzle::{ChannelId, ThreadId},
	render::{Render, TextRenderer},
	service::{
		end_puzzle, retract_answer, show_puzzle, start_puzzle, submit_answer,
		Images, Source, StartRequest
	},
	store::{FileStore, PuzzleStore}
};
use log::{debug, trace, LevelFilter};

use app::App;
use tui::tui;

////////////////////////////////////////////////////////////////////////////////
//                           Command line options.                            //
////////////////////////////////////////////////////////////////////////////////

/// CLI for hosting collaborative cryptic crosswords.
#[derive(Clone, Debug, Parser)]
#[command(version)]
struct Opts
{
	/// The directory containing the puzzle records.
	#[arg(short = 's', long, default_value = "puzzles")]
	store: PathBuf,

	/// How removing an answer treats letters shared with crossing clues.
	#[arg(short = 'r', long, value_enum, default_value_t = RemovalPolicy::Unconditional)]
	removal: RemovalPolicy,

	/// Raise the log level: once for info, twice for debug, thrice for trace.
	/// `RUST_LOG` overrides this.
	#[arg(short = 'v', long, action = ArgAction::Count, global = true)]
	verbose: u8,

	#[command(subcommand)]
	command: Command
}

/// The subcommands of the CLI.
#[derive(Clone, Debug, Subcommand)]
enum Command
{
	/// Start a puzzle in a new thread and show it.
	Start {
		/// The channel requesting the puzzle.
		#[arg(short = 'c', long, default_value = "1")]
		channel: u64,

		/// The thread to host the puzzle. Defaults to the next free thread.
		#[arg(short = 't', long)]
		thread: Option<u64>,

		/// The puzzle date, as YYYY-MM-DD. Defaults to today.
		#[arg(short = 'd', long)]
		date: Option<NaiveDate>,

		/// The directory holding the saved puzzle markup: `puzzle_grid.html`,
		/// `across_clues.html`, and `down_clues.html`.
		#[arg(short = 'u', long, default_value = "samples")]
		url: String,

		/// How long (in seconds) to wait for the puzzle markup.
		#[arg(long, default_value = "60")]
		timeout: u64
	},

	/// Submit an answer and show the updated puzzle.
	Answer {
		/// The thread hosting the puzzle.
		thread: u64,

		/// The clue reference, e.g., 5D.
		clue: String,

		/// The answer. Several words are joined.
		#[arg(required = true, num_args = 1..)]
		answer: Vec<String>
	},

	/// Remove an answer and show the updated puzzle.
	Remove {
		/// The thread hosting the puzzle.
		thread: u64,

		/// The clue reference, e.g., 5D.
		clue: String
	},

	/// End a puzzle, deleting its record.
	End {
		/// The thread hosting the puzzle.
		thread: u64
	},

	/// Show a puzzle.
	Show {
		/// The thread hosting the puzzle.
		thread: u64
	},

	/// List every stored puzzle.
	List,

	/// Open the text-based user interface (TUI) on a thread. Type commands
	/// such as `start`, `answer 5D word`, `remove 5D`, and `end`.
	Play {
		/// The thread to open. Defaults to the most recent thread.
		thread: Option<u64>,

		/// The channel in which commands are issued.
		#[arg(short = 'c', long, default_value = "1")]
		channel: u64,

		/// The directory holding the saved puzzle markup, for `start`.
		#[arg(short = 'u', long, default_value = "samples")]
		url: String,

		/// The name shown for the player's answers.
		#[arg(long, default_value = "you")]
		user: String
	}
}

////////////////////////////////////////////////////////////////////////////////
//                               Main program.                                //
////////////////////////////////////////////////////////////////////////////////

/// Parse the command line options and execute the appropriate subcommand.
fn main()
{
	let opts = Opts::parse();
	init_logger(opts.verbose);
	debug!("Command line options: {:?}", opts);
	if let Err(e) = run(opts)
	{
		eprintln!("{}", e);
		process::exit(1);
	}
}

/// Initialize logging at the level selected by the verbosity count, unless
/// `RUST_LOG` says otherwise.
///
/// # Arguments
///
/// * `verbose` - The number of times `-v` was given.
fn init_logger(verbose: u8)
{
	let level = match verbose
	{
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		_ => LevelFilter::Trace
	};
	let mut builder = env_logger::Builder::new();
	builder
		.filter(None, level)
		.format_timestamp(None)
		.format_target(false);
	if let Ok(spec) = env::var("RUST_LOG")
	{
		builder.parse_filters(&spec);
	}
	builder.init();
}

/// Execute the subcommand.
///
/// # Errors
///
/// Any error that the subcommand reports, worded for the user.
fn run(opts: Opts) -> Result<(), Box<dyn Error>>
{
	let store: Arc<dyn PuzzleStore> = Arc::new(FileStore::open(&opts.store)?);
	let renderer = TextRenderer::default();
	let config = EngineConfig { removal: opts.removal };
	match opts.command
	{
		Command::Start { channel, thread, date, url, timeout } =>
		{
			let date = date.unwrap_or_else(|| Local::now().date_naive());
			let source = Source { url, ..Source::metro_cryptic() };
			let request = StartRequest {
				channel: ChannelId(channel),
				thread: thread.map(ThreadId),
				date,
				source: source.clone(),
				timeout: Duration::from_secs(timeout)
			};
			let fetcher: Arc<dyn Fetch> = Arc::new(DirectoryFetcher);
			let started =
				start_puzzle(store.as_ref(), &fetcher, &renderer, &request)?;
			for warning in &started.warnings
			{
				eprintln!("{}", warning);
			}
			println!(
				"Thread '{}' created successfully! (thread {})",
				source.thread_name(date),
				started.puzzle.thread
			);
			print_images(&started.images)?;
		}
		Command::Answer { thread, clue, answer } =>
		{
			let answer = answer.join(" ");
			let answered = submit_answer(
				store.as_ref(),
				&renderer,
				ThreadId(thread),
				&clue,
				&answer
			)?;
			println!(
				"Answered '{}' for clue '{}'!",
				answered.applied.answer,
				answered.applied.clue
			);
			print_images(&answered.images)?;
			if answered.applied.completed
			{
				println!("Congratulations! The crossword is complete!");
			}
		}
		Command::Remove { thread, clue } =>
		{
			let retracted = retract_answer(
				store.as_ref(),
				&renderer,
				config,
				ThreadId(thread),
				&clue
			)?;
			println!("Removed the answer for clue '{}'!", retracted.removed.clue);
			print_images(&retracted.images)?;
		}
		Command::End { thread } =>
		{
			end_puzzle(store.as_ref(), ThreadId(thread))?;
			println!("This crossword has been ended.");
		}
		Command::Show { thread } =>
		{
			let (puzzle, images) =
				show_puzzle(store.as_ref(), &renderer, ThreadId(thread))?;
			println!("{} {} ({})", puzzle.source, puzzle.date, puzzle.status);
			print_images(&images)?;
		}
		Command::List =>
		{
			for thread in store.threads()?
			{
				if let Some(puzzle) = store.load(thread)?
				{
					let usable = puzzle.grid.iter().filter(|c| !c.blank).count();
					let filled = puzzle.grid.iter().filter(|c| c.is_filled()).count();
					println!(
						"{}\t{}\t{}\t{}\t{}\t{}/{}",
						thread,
						puzzle.channel,
						puzzle.date,
						puzzle.source,
						puzzle.status,
						filled,
						usable
					);
				}
			}
		}
		Command::Play { thread, channel, url, user } =>
		{
			let thread = match thread
			{
				Some(thread) => ThreadId(thread),
				None => store.threads()?.last().copied().unwrap_or(ThreadId(0))
			};
			let renderer: Arc<dyn Render> = Arc::new(renderer);
			let bot = Bot {
				store,
				fetcher: Arc::new(DirectoryFetcher),
				renderer,
				config,
				source: Source { url, ..Source::metro_cryptic() },
				timeout: Duration::from_secs(60)
			};
			let origin = Origin {
				channel: ChannelId(channel),
				thread,
				date: Local::now().date_naive(),
				user
			};
			trace!("Opening TUI");
			let puzzle = tui(|terminal| App::new(bot, origin).run(terminal))?;
			if let Some(puzzle) = puzzle
			{
				println!("{} {} ({})", puzzle.source, puzzle.date, puzzle.status);
			}
		}
	}
	Ok(())
}

/// Print the images of a puzzle to standard output: the grid, then the
/// clues.
///
/// # Errors
///
/// Any error that occurs while writing.
fn print_images(images: &Images) -> io::Result<()>
{
	let mut stdout = io::stdout().lock();
	stdout.write_all(&images.grid)?;
	writeln!(stdout)?;
	stdout.write_all(&images.clues)?;
	stdout.flush()
}
