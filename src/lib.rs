//! A single-file, single-threaded embedded key-value store: a paged B+tree
//! keyed by `u32`, exposed through a line-oriented REPL that understands
//! `insert`, `select`, and a handful of `.`-prefixed diagnostic commands.
//!
//! Bottom-up: [`pager`] owns the file and the fixed page-slot cache,
//! [`node`] is the byte-exact codec for leaf/internal pages, [`btree`]
//! implements search/insert/split/promote, and [`table`] ties pager +
//! root page number into the `Table` facade that [`repl`] and
//! [`statement`] drive.

pub mod btree;
pub mod errors;
pub mod node;
pub mod pager;
pub mod repl;
pub mod row;
pub mod statement;
pub mod table;
