//! # Extraction
//!
//! Herein is the translation of scraped puzzle markup into the raw material
//! of the model: the cells of the grid and the clue tuples of each clue list.
//! The markup is the inner HTML of the puzzle page's grid element and of its
//! two clue lists, so it is parsed leniently; missing markup yields empty
//! results for the caller to inspect rather than an error.

use std::{
	borrow::Cow,
	error::Error,
	fmt::{self, Display, Formatter},
	sync::LazyLock
};

use log::{debug, trace, warn};
use regex::Regex;
use select::{
	document::Document,
	node::Node,
	predicate::{Class, Name, Predicate}
};

use crate::puzzle::{Cell, Direction, Position};

////////////////////////////////////////////////////////////////////////////////
//                                   Grid.                                    //
////////////////////////////////////////////////////////////////////////////////

/// Extract the cells of the grid from its markup. Rows are read in document
/// order, top to bottom, and cells within each row left to right. A cell is
/// blank iff it carries the `inactive` class; its label is the text of a
/// nested `cell-label` span.
///
/// # Arguments
///
/// * `markup` - The grid markup, a table of rows of cells. A bare sequence
///   of rows is accepted too.
///
/// # Returns
///
/// A 2-tuple comprising the cells and the number of rows encountered,
/// respectively. Both are empty if the markup is empty.
pub fn extract_grid(markup: &str) -> (Vec<Cell>, usize)
{
	if markup.trim().is_empty()
	{
		warn!("no grid markup provided");
		return (Vec::new(), 0)
	}
	let document = Document::from(as_table(markup).as_ref());
	let mut cells = Vec::new();
	let mut rows = 0;
	for (y, row) in document.find(Name("tr")).enumerate()
	{
		rows += 1;
		for (x, td) in row.find(Name("td")).enumerate()
		{
			let blank = td.is(Class("inactive"));
			let label = td.find(Name("span").and(Class("cell-label")))
				.next()
				.map(|span| span.text().trim().to_string())
				.filter(|text| !text.is_empty());
			cells.push(Cell::new(Position::new(x, y), blank, label));
		}
	}
	trace!("extracted {} cells in {} rows", cells.len(), rows);
	(cells, rows)
}

/// The HTML parser drops table rows that appear outside of a table, so wrap
/// bare rows in one.
fn as_table(markup: &str) -> Cow<'_, str>
{
	if markup.to_ascii_lowercase().contains("<table")
	{
		Cow::Borrowed(markup)
	}
	else
	{
		Cow::Owned(format!("<table>{}</table>", markup))
	}
}

////////////////////////////////////////////////////////////////////////////////
//                                   Clues.                                   //
////////////////////////////////////////////////////////////////////////////////

/// A clue as it appears in a clue list, before it is cross-referenced against
/// the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawClue
{
	/// The clue number, from the item's `value` attribute.
	pub number: String,

	/// The normalized clue text, length annotation included.
	pub text: String,

	/// The direction of the list the clue came from.
	pub direction: Direction
}

/// Extract the clues of a single clue list from its markup. Each list item
/// supplies its number via the `value` attribute and its text via its first
/// nested span. Items without a number are skipped.
///
/// # Arguments
///
/// * `markup` - The clue list markup.
/// * `direction` - The direction of every clue in the list.
///
/// # Returns
///
/// The clues in document order. Empty if the markup is empty.
pub fn extract_clues(markup: &str, direction: Direction) -> Vec<RawClue>
{
	if markup.trim().is_empty()
	{
		warn!("no {} clue markup provided", direction);
		return Vec::new()
	}
	let document = Document::from(markup);
	document.find(Name("li"))
		.filter_map(|li| {
			let Some(number) = li.attr("value").map(str::trim)
			else
			{
				warn!("{} clue without a number: {}", direction, li.text().trim());
				return None
			};
			let text = normalize_clue_text(&item_text(&li));
			debug!("extracted clue: {}{}: {}", number, direction.letter(), text);
			Some(RawClue { number: number.to_string(), text, direction })
		})
		.collect()
}

/// The text of a clue list item: its first span if it has one, otherwise the
/// item itself. Whitespace runs collapse to single spaces.
fn item_text(li: &Node) -> String
{
	let text = li.find(Name("span"))
		.next()
		.map_or_else(|| li.text(), |span| span.text());
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A hyphenated length annotation, e.g., `(1-4)`.
static HYPHENATED_LENGTH: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\((\d+)-(\d+)\)")
		.unwrap_or_else(|e| panic!("BUG: invalid HYPHENATED_LENGTH: {e}"))
});

/// A stray `undefined` immediately following the length annotation at the end
/// of the clue text.
static TRAILING_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(\([\d,]+\)) undefined$")
		.unwrap_or_else(|e| panic!("BUG: invalid TRAILING_PLACEHOLDER: {e}"))
});

/// Rewrite hyphenated lengths as multi-word lengths, i.e., `(1-4)` becomes
/// `(1,4)`, then strip a placeholder that leaked in after the final length
/// annotation.
pub(crate) fn normalize_clue_text(text: &str) -> String
{
	let text = HYPHENATED_LENGTH.replace_all(text, "($1,$2)");
	TRAILING_PLACEHOLDER.replace(&text, "$1").into_owned()
}

////////////////////////////////////////////////////////////////////////////////
//                                  Errors.                                   //
////////////////////////////////////////////////////////////////////////////////

/// The complete enumeration of extraction failures. Any of these aborts the
/// creation of a puzzle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionError
{
	/// The grid markup was missing or contained no cells.
	EmptyGrid,

	/// The cells do not form a square with one row per column.
	NotSquare {
		/// The number of rows encountered.
		rows: usize,

		/// The number of cells encountered.
		cells: usize
	},

	/// The clue list for the given direction was missing or empty.
	NoClues(Direction),

	/// Not a single clue could be matched against the grid.
	NothingIndexed
}

impl Display for ExtractionError
{
	fn fmt(&self, f: &mut Formatter) -> fmt::Result
	{
		match self
		{
			Self::EmptyGrid => write!(f, "the puzzle grid is missing or empty"),
			Self::NotSquare { rows, cells } => write!(
				f,
				"the puzzle grid is not square: {} rows but {} cells",
				rows,
				cells
			),
			Self::NoClues(direction) =>
				write!(f, "the {} clues are missing or empty", direction),
			Self::NothingIndexed =>
				write!(f, "none of the clues could be placed on the grid")
		}
	}
}

impl Error for ExtractionError {}

////////////////////////////////////////////////////////////////////////////////
//                                   Tests.                                   //
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test
{
	use std::fs::read_to_string;

	use crate::{extract::*, puzzle::{Direction, Position}};

	/// Read one of the saved puzzle fragments.
	fn sample(name: &str) -> String
	{
		read_to_string(format!("samples/{}.html", name)).unwrap()
	}

	/// Ensure that the saved grid extracts to a 13×13 grid with the expected
	/// blanks and labels.
	#[test]
	fn test_extract_grid()
	{
		let (cells, width) = extract_grid(&sample("puzzle_grid"));
		assert_eq!(width, 13);
		assert_eq!(cells.len(), width * width);
		let cell = |x, y| {
			cells.iter().find(|c| c.position == Position::new(x, y)).unwrap()
		};
		assert!(!cell(0, 0).blank);
		assert!(cell(0, 1).blank);
		assert!(cell(1, 0).clue_refs.is_empty());
		assert_eq!(cell(0, 0).label.as_deref(), Some("1"));
		assert_eq!(cell(7, 0).label.as_deref(), Some("5"));
		assert_eq!(cell(2, 0).label, None);
		assert!(cell(6, 0).blank);
		assert!(cells.iter().all(|c| c.value.is_none()));
		assert_eq!(cells.iter().filter(|c| !c.blank).count(), 119);
	}

	/// Ensure that missing markup yields an empty grid rather than an error.
	#[test]
	fn test_extract_grid_empty()
	{
		assert_eq!(extract_grid(""), (vec![], 0));
		assert_eq!(extract_grid(" \n\t"), (vec![], 0));
	}

	/// Ensure that rows supplied without an enclosing table survive parsing.
	#[test]
	fn test_extract_grid_bare_rows()
	{
		let markup = "\
			<tr>\
				<td class=\"cell\"><span class=\"cell-label\"> 1 </span></td>\
				<td class=\"cell inactive\"></td>\
			</tr>\
			<tr>\
				<td class=\"cell\"></td>\
				<td class=\"cell\"></td>\
			</tr>";
		let (cells, width) = extract_grid(markup);
		assert_eq!(width, 2);
		assert_eq!(cells.len(), 4);
		assert_eq!(cells[0].label.as_deref(), Some("1"));
		assert!(cells[1].blank);
		assert_eq!(cells[2].position, Position::new(0, 1));
		assert_eq!(cells[3].position, Position::new(1, 1));
	}

	/// Ensure that the saved across clues extract in document order with
	/// normalized text.
	#[test]
	fn test_extract_across_clues()
	{
		let clues = extract_clues(&sample("across_clues"), Direction::Across);
		assert_eq!(clues.len(), 14);
		assert_eq!(
			clues[0],
			RawClue {
				number: "1".to_string(),
				text: "Settled little dog, maintaining support (4,2)".to_string(),
				direction: Direction::Across
			}
		);
		assert_eq!(clues[1].number, "5");
		assert_eq!(clues[2].text, "Holding breath let icon physically fit (8)");
		let placeholder = clues.iter().find(|c| c.number == "14").unwrap();
		assert_eq!(placeholder.text, "Deliver a hundred to the French quarter (6)");
	}

	/// Ensure that the saved down clues extract in document order with
	/// normalized text.
	#[test]
	fn test_extract_down_clues()
	{
		let clues = extract_clues(&sample("down_clues"), Direction::Down);
		assert_eq!(clues.len(), 7);
		assert_eq!(
			clues[0],
			RawClue {
				number: "2".to_string(),
				text: "Strict writer in tiara again (13)".to_string(),
				direction: Direction::Down
			}
		);
		assert_eq!(clues[1].number, "3");
		assert_eq!(clues[2].text, "Fit for drinking by Italian river board (7)");
		assert!(clues.iter().all(|c| c.direction == Direction::Down));
		let hyphenated = clues.iter().find(|c| c.number == "7").unwrap();
		assert!(hyphenated.text.ends_with("(1,12)"));
	}

	/// Ensure that missing clue markup yields no clues, and that items
	/// without a number are skipped.
	#[test]
	fn test_extract_clues_degenerate()
	{
		assert!(extract_clues("", Direction::Across).is_empty());
		let markup = "<li><span>Orphan (3)</span></li>\
			<li value=\"4\">Spanless   clue (5)</li>";
		let clues = extract_clues(markup, Direction::Down);
		assert_eq!(clues.len(), 1);
		assert_eq!(clues[0].number, "4");
		assert_eq!(clues[0].text, "Spanless clue (5)");
	}

	/// Ensure that hyphenated lengths are split and placeholders stripped
	/// only where they follow the final length annotation.
	#[test]
	fn test_normalize_clue_text()
	{
		let cases = [
			("Settled little dog (1-4)", "Settled little dog (1,4)"),
			("Nothing to do (7)", "Nothing to do (7)"),
			("Stray word (5) undefined", "Stray word (5)"),
			("Stray word (2-3) undefined", "Stray word (2,3)"),
			("undefined leads the way (9)", "undefined leads the way (9)"),
			("Not at the end (3) undefined here", "Not at the end (3) undefined here"),
			("Two splits (1-2) and (3-4)", "Two splits (1,2) and (3,4)")
		];
		for (raw, expected) in cases
		{
			assert_eq!(normalize_clue_text(raw), expected, "{:?}", raw);
		}
	}

	/// Ensure that extraction is idempotent.
	#[test]
	fn test_idempotent()
	{
		let grid = sample("puzzle_grid");
		assert_eq!(extract_grid(&grid), extract_grid(&grid));
		let across = sample("across_clues");
		assert_eq!(
			extract_clues(&across, Direction::Across),
			extract_clues(&across, Direction::Across)
		);
	}
}
