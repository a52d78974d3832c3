//! # Cryptic Crossword
//!
//! A collaborative cryptic crossword for chat. Each day's puzzle is scraped
//! from its publisher's page, normalized into a grid of cells and an index of
//! clues, and hosted in a conversation thread, where players fill in answers
//! together by command. Progress is persisted, so a puzzle survives restarts
//! of the bot.
//!
//! The crate is organized leaf-first:
//!
//! * [`puzzle`] - The model: cells, grid, clues, and puzzle records.
//! * [`extract`] - Translation of puzzle markup into cells and raw clues.
//! * [`index`] - Cross-referencing of raw clues against the grid.
//! * [`engine`] - Application and removal of answers.
//! * [`store`] - Persistence of puzzle records, with per-thread locking.
//! * [`fetch`] - Supply of puzzle markup.
//! * [`render`] - Drawing of the grid and the clue lists.
//! * [`service`] - The start, answer, remove, and end operations.
//! * [`command`] - Parsing and dispatch of chat commands.

pub mod command;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod index;
pub mod puzzle;
pub mod render;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;
