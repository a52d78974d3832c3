//! # Commands
//!
//! Herein is the chat-facing surface of the puzzle service. Users type
//! commands such as `/answer 5d lied in`; a [`Command`] is parsed from the
//! text and dispatched by a [`Bot`], which replies with a status line, the
//! updated images, and any notices to post in the puzzle thread.

use std::{
	error::Error,
	fmt::{self, Display, Formatter},
	str::FromStr,
	sync::Arc,
	time::Duration
};

use chrono::NaiveDate;
use log::{debug, warn};

use crate::{
	engine::EngineConfig,
	fetch::Fetch,
	puzzle::{ChannelId, ThreadId},
	render::Render,
	service::{
		end_puzzle, retract_answer, start_puzzle, submit_answer, Images,
		ServiceError, Source, StartRequest
	},
	store::PuzzleStore
};

////////////////////////////////////////////////////////////////////////////////
//                                 Commands.                                  //
////////////////////////////////////////////////////////////////////////////////

/// A user command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command
{
	/// Start today's puzzle in a new thread.
	Start,

	/// Submit an answer.
	Answer {
		/// The clue reference, as typed.
		clue: String,

		/// The answer, as typed.
		answer: String
	},

	/// Remove an answer.
	Remove {
		/// The clue reference, as typed.
		clue: String
	},

	/// End the puzzle, deleting its record.
	End
}

impl FromStr for Command
{
	type Err = CommandError;

	/// Parse a command. The leading `/` is optional and the command name is
	/// case-insensitive. The clue reference of an answer is its first word;
	/// the rest of the text is the answer.
	fn from_str(s: &str) -> Result<Self, Self::Err>
	{
		let s = s.trim();
		let s = s.strip_prefix('/').unwrap_or(s);
		let mut words = s.split_whitespace();
		let name = words.next().ok_or(CommandError::Empty)?.to_lowercase();
		let rest = words.collect::<Vec<_>>();
		match name.as_str()
		{
			"start" => Ok(Self::Start),
			"end" => Ok(Self::End),
			"answer" => match rest.split_first()
			{
				None => Err(CommandError::MissingClue("answer")),
				Some((_, [])) => Err(CommandError::MissingAnswer),
				Some((clue, answer)) => Ok(Self::Answer {
					clue: clue.to_string(),
					answer: answer.join(" ")
				})
			},
			"remove" if rest.is_empty() => Err(CommandError::MissingClue("remove")),
			"remove" => Ok(Self::Remove { clue: rest.join(" ") }),
			_ => Err(CommandError::Unknown(name))
		}
	}
}

/// The complete enumeration of command parse failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandError
{
	/// There was no command at all.
	Empty,

	/// The command is not recognized.
	Unknown(String),

	/// The named command needs a clue reference.
	MissingClue(&'static str),

	/// An answer command has a clue but no answer.
	MissingAnswer
}

impl Display for CommandError
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::Empty => write!(
				f,
				"Commands: start, answer <clue> <answer>, remove <clue>, end."
			),
			Self::Unknown(name) => write!(
				f,
				"Unknown command '{}'. Commands: start, answer <clue> <answer>, \
					remove <clue>, end.",
				name
			),
			Self::MissingClue(command) =>
				write!(f, "Which clue? Try '{} 5D ...'.", command),
			Self::MissingAnswer => write!(f, "Which answer? Try 'answer 5D word'.")
		}
	}
}

impl Error for CommandError {}

////////////////////////////////////////////////////////////////////////////////
//                                 Dispatch.                                  //
////////////////////////////////////////////////////////////////////////////////

/// Where and by whom a command was issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin
{
	/// The channel in which the command was typed.
	pub channel: ChannelId,

	/// The thread in which the command was typed. Ignored when starting a
	/// puzzle, which always opens a new thread.
	pub thread: ThreadId,

	/// The current date.
	pub date: NaiveDate,

	/// The name of the user.
	pub user: String
}

/// The bot's reply to a successful command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply
{
	/// The thread that the reply concerns.
	pub thread: ThreadId,

	/// The status line for the user.
	pub message: String,

	/// The updated images of the puzzle, if it still exists.
	pub images: Option<Images>,

	/// Additional messages to post in the thread.
	pub notices: Vec<String>
}

/// The puzzle bot: everything needed to carry out commands.
#[derive(Clone)]
pub struct Bot
{
	/// The puzzle records.
	pub store: Arc<dyn PuzzleStore>,

	/// The supplier of puzzle pages.
	pub fetcher: Arc<dyn Fetch>,

	/// The producer of puzzle images.
	pub renderer: Arc<dyn Render>,

	/// The answer engine configuration.
	pub config: EngineConfig,

	/// Where today's puzzle comes from.
	pub source: Source,

	/// How long to wait for the puzzle page.
	pub timeout: Duration
}

impl Bot
{
	/// Carry out a command.
	///
	/// # Arguments
	///
	/// * `origin` - Where and by whom the command was issued.
	/// * `command` - The command.
	///
	/// # Returns
	///
	/// The reply to post.
	///
	/// # Errors
	///
	/// [`ServiceError`] if the command failed. Its text is the reply.
	pub fn dispatch(
		&self,
		origin: &Origin,
		command: &Command
	) -> Result<Reply, ServiceError>
	{
		debug!("{} issued {:?} in thread {}", origin.user, command, origin.thread);
		let store = self.store.as_ref();
		let renderer = self.renderer.as_ref();
		let reply = match command
		{
			Command::Start =>
			{
				let request = StartRequest {
					channel: origin.channel,
					thread: None,
					date: origin.date,
					source: self.source.clone(),
					timeout: self.timeout
				};
				let started =
					start_puzzle(store, &self.fetcher, renderer, &request)?;
				let mut notices = vec![
					"Here are today's crossword and clues!".to_string()
				];
				notices.extend(started.warnings.iter().map(|w| w.to_string()));
				Reply {
					thread: started.puzzle.thread,
					message: format!(
						"Thread '{}' created successfully!",
						self.source.thread_name(origin.date)
					),
					images: Some(started.images),
					notices
				}
			}
			Command::Answer { clue, answer } =>
			{
				let answered =
					submit_answer(store, renderer, origin.thread, clue, answer)?;
				let applied = &answered.applied;
				let notices =
					if applied.completed
					{
						vec!["Congratulations! The crossword is complete!".to_string()]
					}
					else
					{
						Vec::new()
					};
				Reply {
					thread: origin.thread,
					message: format!(
						"{} answered '{}' for clue '{}'!",
						origin.user,
						applied.answer,
						applied.clue
					),
					images: Some(answered.images),
					notices
				}
			}
			Command::Remove { clue } =>
			{
				let retracted = retract_answer(
					store,
					renderer,
					self.config,
					origin.thread,
					clue
				)?;
				Reply {
					thread: origin.thread,
					message: format!(
						"{} removed the answer for clue '{}'!",
						origin.user,
						retracted.removed.clue
					),
					images: Some(retracted.images),
					notices: Vec::new()
				}
			}
			Command::End =>
			{
				end_puzzle(store, origin.thread)?;
				Reply {
					thread: origin.thread,
					message: "This crossword has been ended.".to_string(),
					images: None,
					notices: Vec::new()
				}
			}
		};
		Ok(reply)
	}

	/// Parse and carry out a command, turning every failure into a reply.
	///
	/// # Returns
	///
	/// The status line, or the reason the command failed, and the reply if it
	/// succeeded.
	pub fn respond(&self, origin: &Origin, text: &str) -> (String, Option<Reply>)
	{
		let command = match text.parse::<Command>()
		{
			Ok(command) => command,
			Err(e) => return (e.to_string(), None)
		};
		match self.dispatch(origin, &command)
		{
			Ok(reply) => (reply.message.clone(), Some(reply)),
			Err(e) =>
			{
				warn!("{} failed: {}", text.trim(), e);
				(e.to_string(), None)
			}
		}
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////
