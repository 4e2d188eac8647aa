//! The `Table` facade: owns the pager and the root page number, and
//! exposes open/close/insert/select plus the cursor operations used by the
//! REPL's statement executor.

use std::path::Path;

use crate::btree;
use crate::errors::Error;
use crate::node::{self, NodeType};
use crate::pager::Pager;
use crate::row::Row;

pub struct Table {
    pager: Pager,
    pub root_page_num: u32,
}

/// A position within the table: `(page_num, cell_num, end_of_table)`.
/// Consumed by both `insert` (as the insertion point) and `select` (as a
/// scan iterator).
pub struct Cursor {
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl Table {
    /// Opens (or creates) the database file at `path`. A brand-new
    /// zero-length file is initialised with page 0 as an empty root leaf.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut pager = Pager::open(path)?;
        let root_page_num = 0;
        if pager.num_pages == 0 {
            let root = pager.get_page(root_page_num)?;
            node::initialize_leaf(root);
            node::set_is_root(root, true);
            pager.num_pages = 1;
            tracing::info!("initialised fresh database");
        }
        Ok(Table { pager, root_page_num })
    }

    /// Flushes all dirty pages and closes the file.
    pub fn close(mut self) -> Result<(), Error> {
        self.pager.close()
    }

    pub fn insert(&mut self, row: &Row) -> Result<(), Error> {
        btree::insert(&mut self.pager, &mut self.root_page_num, row)
    }

    pub fn cursor_start(&mut self) -> Result<Cursor, Error> {
        let located = btree::table_find(&mut self.pager, self.root_page_num, 0)?;
        let leaf_page_num = *located.path.last().unwrap();
        let num_cells = node::leaf_num_cells(self.pager.get_page(leaf_page_num)?);
        Ok(Cursor {
            page_num: leaf_page_num,
            cell_num: 0,
            end_of_table: num_cells == 0,
        })
    }

    pub fn cursor_value(&mut self, cursor: &Cursor) -> Result<Row, Error> {
        let bytes = btree::cell_value(&mut self.pager, cursor.page_num, cursor.cell_num)?;
        Ok(Row::deserialize(&bytes))
    }

    pub fn cursor_advance(&mut self, cursor: &mut Cursor) -> Result<(), Error> {
        let page = self.pager.get_page(cursor.page_num)?;
        cursor.cell_num += 1;
        if cursor.cell_num >= node::leaf_num_cells(page) {
            let next = node::leaf_next_leaf(page);
            if next == 0 {
                cursor.end_of_table = true;
            } else {
                cursor.page_num = next;
                cursor.cell_num = 0;
            }
        }
        Ok(())
    }

    pub fn print_tree(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        btree::print_tree(&mut self.pager, self.root_page_num, 0, &mut out)?;
        Ok(out)
    }

    /// Unused directly by the executor today but kept alongside
    /// `print_tree` since both walk the tree from the root; exposed for
    /// tests that want to confirm structural invariants without scraping
    /// `.btree` text output.
    #[allow(dead_code)]
    pub fn root_node_type(&mut self) -> Result<NodeType, Error> {
        let root = self.pager.get_page(self.root_page_num)?;
        Ok(node::node_type(root))
    }
}
