//! Search, insert, and the split-and-propagate algorithms for the paged
//! B+tree: leaf split, internal split, new-root promotion, and the
//! key-in-parent maintenance that keeps the structural invariant intact.
//!
//! Tree-fixup operations are threaded an explicit descent path (`&[u32]`,
//! root-to-parent) rather than chasing the `parent_page_num` stored in each
//! node header. The stored field stays in the on-disk format for
//! compatibility, but in-memory control flow never reads it back to decide
//! where to go next — see the design notes on parent back-pointers.

use crate::errors::{fatal, Error};
use crate::node::{
    initialize_internal, initialize_leaf, internal_child, internal_key, internal_num_keys,
    internal_right_child, leaf_cell, leaf_key, leaf_max_key, leaf_next_leaf, leaf_num_cells,
    leaf_value, node_type, parent, set_internal_child, set_internal_key, set_internal_num_keys,
    set_internal_right_child, set_is_root, set_leaf_cell, set_leaf_next_leaf, set_leaf_num_cells,
    set_parent, NodeType, Page, INTERNAL_NODE_MAX_CELLS, INVALID_PAGE_NUM,
    LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS, LEAF_NODE_RIGHT_SPLIT_COUNT,
};
use crate::pager::Pager;
use crate::row::ROW_SIZE;

/// Result of descending the tree for a key: the root-to-leaf path, and the
/// cell position within the leaf where that key belongs (an existing cell
/// with a matching key, or the insertion point).
pub struct Located {
    pub path: Vec<u32>,
    pub cell_num: u32,
}

/// Descends from `root_page_num` to the leaf that would contain `key`.
pub fn table_find(pager: &mut Pager, root_page_num: u32, key: u32) -> Result<Located, Error> {
    let mut path = Vec::new();
    let mut current = root_page_num;
    loop {
        path.push(current);
        let page = pager.get_page(current)?;
        match node_type(page) {
            NodeType::Leaf => {
                let cell_num = leaf_find(page, key);
                return Ok(Located { path, cell_num });
            }
            NodeType::Internal => {
                current = internal_find_child(page, key);
            }
        }
    }
}

fn leaf_find(page: &Page, key: u32) -> u32 {
    let mut lo = 0u32;
    let mut hi = leaf_num_cells(page);
    while lo < hi {
        let mid = (lo + hi) / 2;
        let at = leaf_key(page, mid as usize);
        if at == key {
            return mid;
        } else if at > key {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Smallest child index whose subtree may contain `key`: the smallest `i`
/// such that `key <= internal_key(i)`, falling through to `right_child`
/// when `key` exceeds every stored key.
fn internal_find_child(page: &Page, key: u32) -> u32 {
    let num_keys = internal_num_keys(page);
    let mut lo = 0u32;
    let mut hi = num_keys;
    while lo < hi {
        let mid = (lo + hi) / 2;
        if internal_key(page, mid as usize) >= key {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    internal_child(page, lo as usize)
}

/// The position a new child with max key `key` should be inserted at
/// within an internal node (used by `internal_node_insert`, distinct from
/// `internal_find_child` which returns a *child page number*).
fn internal_find_index(page: &Page, key: u32) -> u32 {
    let num_keys = internal_num_keys(page);
    let mut lo = 0u32;
    let mut hi = num_keys;
    while lo < hi {
        let mid = (lo + hi) / 2;
        if internal_key(page, mid as usize) >= key {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// The maximum key stored anywhere in the subtree rooted at `page_num`:
/// the leaf's own max key, or (recursively) the max key of its right
/// spine for an internal node.
pub fn node_max_key(pager: &mut Pager, page_num: u32) -> Result<u32, Error> {
    let (ty, right_child) = {
        let page = pager.get_page(page_num)?;
        (node_type(page), if node_type(page) == NodeType::Internal {
            internal_right_child(page)
        } else {
            0
        })
    };
    match ty {
        NodeType::Leaf => {
            let page = pager.get_page(page_num)?;
            Ok(leaf_max_key(page))
        }
        NodeType::Internal => {
            if right_child == INVALID_PAGE_NUM {
                fatal("tried to compute max_key through an empty internal node");
            }
            node_max_key(pager, right_child)
        }
    }
}

/// Inserts `row` keyed by `row.id`, rejecting duplicates.
pub fn insert(pager: &mut Pager, root_page_num: &mut u32, row: &crate::row::Row) -> Result<(), Error> {
    let key = row.id;
    let located = table_find(pager, *root_page_num, key)?;
    let leaf_page_num = *located.path.last().unwrap();
    {
        let leaf = pager.get_page(leaf_page_num)?;
        if located.cell_num < leaf_num_cells(leaf) && leaf_key(leaf, located.cell_num as usize) == key {
            return Err(Error::Execute("Error: Duplicate key.".into()));
        }
    }
    let value = row.serialize();
    leaf_insert(pager, root_page_num, &located.path, located.cell_num, key, &value)
}

fn leaf_insert(
    pager: &mut Pager,
    root_page_num: &mut u32,
    path: &[u32],
    cell_num: u32,
    key: u32,
    value: &[u8; ROW_SIZE],
) -> Result<(), Error> {
    let leaf_page_num = *path.last().unwrap();
    let num_cells = leaf_num_cells(pager.get_page(leaf_page_num)?);

    if (num_cells as usize) < LEAF_NODE_MAX_CELLS {
        let leaf = pager.get_page(leaf_page_num)?;
        for i in (cell_num..num_cells).rev() {
            let (k, v) = leaf_cell(leaf, i as usize);
            set_leaf_cell(leaf, i as usize + 1, k, &v);
        }
        set_leaf_cell(leaf, cell_num as usize, key, value);
        set_leaf_num_cells(leaf, num_cells + 1);
        return Ok(());
    }

    if pager.allocate_page() as usize >= crate::node::TABLE_MAX_PAGES {
        return Err(Error::Execute("Error: Table full.".into()));
    }
    leaf_split_and_insert(pager, root_page_num, path, cell_num, key, value)
}

/// Splits a full leaf, distributing its `LEAF_NODE_MAX_CELLS` existing
/// cells plus the incoming one between the old page and a freshly
/// allocated sibling, then fixes up the parent (or promotes a new root).
fn leaf_split_and_insert(
    pager: &mut Pager,
    root_page_num: &mut u32,
    path: &[u32],
    cursor_cell_num: u32,
    key: u32,
    value: &[u8; ROW_SIZE],
) -> Result<(), Error> {
    let old_page_num = *path.last().unwrap();
    // Snapshot before any allocation invalidates the borrow.
    let snapshot: Page = *pager.get_page(old_page_num)?;

    let new_page_num = pager.allocate_page();
    {
        let new_page = pager.get_page(new_page_num)?;
        initialize_leaf(new_page);
        set_leaf_next_leaf(new_page, leaf_next_leaf(&snapshot));
        set_parent(new_page, parent(&snapshot));
    }
    {
        let old_page = pager.get_page(old_page_num)?;
        set_leaf_next_leaf(old_page, new_page_num);
    }

    for i in (0..=LEAF_NODE_MAX_CELLS as u32).rev() {
        let dest_page_num = if i as usize >= LEAF_NODE_LEFT_SPLIT_COUNT {
            new_page_num
        } else {
            old_page_num
        };
        let index_within = i % LEAF_NODE_LEFT_SPLIT_COUNT as u32;

        if i == cursor_cell_num {
            let dest = pager.get_page(dest_page_num)?;
            set_leaf_cell(dest, index_within as usize, key, value);
        } else {
            let src_index = if i > cursor_cell_num { i - 1 } else { i };
            let (k, v) = leaf_cell(&snapshot, src_index as usize);
            let dest = pager.get_page(dest_page_num)?;
            set_leaf_cell(dest, index_within as usize, k, &v);
        }
    }

    set_leaf_num_cells(pager.get_page(old_page_num)?, LEAF_NODE_LEFT_SPLIT_COUNT as u32);
    set_leaf_num_cells(pager.get_page(new_page_num)?, LEAF_NODE_RIGHT_SPLIT_COUNT as u32);

    tracing::debug!(old_page_num, new_page_num, "leaf split");

    if crate::node::is_root(&snapshot) {
        return create_new_root(pager, root_page_num, new_page_num);
    }

    let ancestors = &path[..path.len() - 1];
    let parent_page_num = *ancestors.last().unwrap();
    let old_max = leaf_max_key(&snapshot);
    let new_max = leaf_max_key(pager.get_page(old_page_num)?);
    if old_max != new_max {
        update_internal_node_key(pager, parent_page_num, old_max, new_max)?;
    }
    internal_node_insert(pager, root_page_num, ancestors, new_page_num)
}

/// Installs a new internal root at page 0. The current root's content is
/// relocated to a fresh page `L`, re-parented if it was itself internal,
/// and page 0 is rebuilt as `{child(0)=L, key(0)=max_key(L), right_child=R}`.
///
/// `right_page_num` may not be materialised yet (an internal-root split
/// passes a page number that hasn't been through `get_page` or
/// `initialize_internal`). Touch it before allocating `L`: `get_page`
/// bumps `num_pages` on first access, so allocating `L` afterwards is
/// guaranteed a distinct page number instead of colliding with R.
fn create_new_root(pager: &mut Pager, root_page_num: &mut u32, right_page_num: u32) -> Result<(), Error> {
    let root = *root_page_num;
    let root_snapshot: Page = *pager.get_page(root)?;

    pager.get_page(right_page_num)?;
    if node_type(&root_snapshot) == NodeType::Internal {
        initialize_internal(pager.get_page(right_page_num)?);
    }

    let left_page_num = pager.allocate_page();

    {
        let left = pager.get_page(left_page_num)?;
        *left = root_snapshot;
        set_is_root(left, false);
    }

    if node_type(&root_snapshot) == NodeType::Internal {
        let num_keys = internal_num_keys(&root_snapshot);
        for i in 0..num_keys {
            let child = internal_child(&root_snapshot, i as usize);
            set_parent(pager.get_page(child)?, left_page_num);
        }
        let right_child = internal_right_child(&root_snapshot);
        set_parent(pager.get_page(right_child)?, left_page_num);
    }

    let left_max_key = node_max_key(pager, left_page_num)?;

    {
        let root_page = pager.get_page(root)?;
        initialize_internal(root_page);
        set_is_root(root_page, true);
        set_internal_num_keys(root_page, 1);
        set_internal_child(root_page, 0, left_page_num);
        set_internal_key(root_page, 0, left_max_key);
        set_internal_right_child(root_page, right_page_num);
    }

    set_parent(pager.get_page(left_page_num)?, root);
    set_parent(pager.get_page(right_page_num)?, root);
    tracing::debug!(left_page_num, right_page_num, "new root created");
    Ok(())
}

fn update_internal_node_key(pager: &mut Pager, page_num: u32, old_key: u32, new_key: u32) -> Result<(), Error> {
    let page = pager.get_page(page_num)?;
    let index = internal_find_index(page, old_key);
    set_internal_key(page, index as usize, new_key);
    Ok(())
}

/// Inserts `new_child_page_num` as a child of the internal node at the end
/// of `ancestors` (root-to-parent path). Recurses into
/// `internal_split_and_insert` if the parent is full.
fn internal_node_insert(
    pager: &mut Pager,
    root_page_num: &mut u32,
    ancestors: &[u32],
    new_child_page_num: u32,
) -> Result<(), Error> {
    let parent_page_num = *ancestors.last().unwrap();
    let new_child_max = node_max_key(pager, new_child_page_num)?;
    set_parent(pager.get_page(new_child_page_num)?, parent_page_num);

    let (num_keys, right_child) = {
        let parent = pager.get_page(parent_page_num)?;
        (internal_num_keys(parent), internal_right_child(parent))
    };

    if right_child == INVALID_PAGE_NUM {
        set_internal_right_child(pager.get_page(parent_page_num)?, new_child_page_num);
        return Ok(());
    }

    if num_keys as usize >= INTERNAL_NODE_MAX_CELLS {
        return internal_split_and_insert(pager, root_page_num, ancestors, new_child_page_num);
    }

    let right_child_max = node_max_key(pager, right_child)?;
    let index = internal_find_index(pager.get_page(parent_page_num)?, new_child_max);

    let parent = pager.get_page(parent_page_num)?;
    set_internal_num_keys(parent, num_keys + 1);
    if new_child_max > right_child_max {
        set_internal_child(parent, num_keys as usize, right_child);
        set_internal_key(parent, num_keys as usize, right_child_max);
        set_internal_right_child(parent, new_child_page_num);
    } else {
        for i in (index..num_keys).rev() {
            let child = internal_child(parent, i as usize);
            let k = internal_key(parent, i as usize);
            set_internal_child(parent, i as usize + 1, child);
            set_internal_key(parent, i as usize + 1, k);
        }
        set_internal_child(parent, index as usize, new_child_page_num);
        set_internal_key(parent, index as usize, new_child_max);
    }
    Ok(())
}

/// Splits a full internal node (`ancestors.last()`), pushing the median
/// key up and inserting `new_child_page_num` into whichever side now owns
/// the matching key range.
fn internal_split_and_insert(
    pager: &mut Pager,
    root_page_num: &mut u32,
    ancestors: &[u32],
    new_child_page_num: u32,
) -> Result<(), Error> {
    let mut old_page_num = *ancestors.last().unwrap();
    let old_max = node_max_key(pager, old_page_num)?;
    let new_child_max = node_max_key(pager, new_child_page_num)?;

    let new_page_num = pager.allocate_page();
    let splitting_root = crate::node::is_root(pager.get_page(old_page_num)?);

    // Path from root to the grandparent (the node `new_page_num`, the
    // freshly split-off sibling, would be inserted into). `None` when the
    // node being split is itself the root, since create_new_root already
    // wires the new sibling in as `right_child` directly.
    let grandparent_path: Option<Vec<u32>> = if splitting_root {
        create_new_root(pager, root_page_num, new_page_num)?;
        old_page_num = internal_child(pager.get_page(*root_page_num)?, 0);
        None
    } else {
        initialize_internal(pager.get_page(new_page_num)?);
        Some(ancestors[..ancestors.len() - 1].to_vec())
    };

    let old_right_child = internal_right_child(pager.get_page(old_page_num)?);
    internal_node_insert(pager, root_page_num, &[new_page_num], old_right_child)?;
    set_internal_right_child(pager.get_page(old_page_num)?, INVALID_PAGE_NUM);

    let mut num_keys = internal_num_keys(pager.get_page(old_page_num)?) as i64;
    let split_from = INTERNAL_NODE_MAX_CELLS as i64 - 1;
    let split_to = INTERNAL_NODE_MAX_CELLS as i64 / 2 + 1;
    let mut i = split_from;
    while i >= split_to {
        let child = internal_child(pager.get_page(old_page_num)?, i as usize);
        internal_node_insert(pager, root_page_num, &[new_page_num], child)?;
        num_keys -= 1;
        set_internal_num_keys(pager.get_page(old_page_num)?, num_keys as u32);
        i -= 1;
    }

    let last_child = internal_child(pager.get_page(old_page_num)?, (num_keys - 1) as usize);
    set_internal_right_child(pager.get_page(old_page_num)?, last_child);
    num_keys -= 1;
    set_internal_num_keys(pager.get_page(old_page_num)?, num_keys as u32);

    let old_new_max = node_max_key(pager, old_page_num)?;
    let destination = if new_child_max < old_new_max {
        old_page_num
    } else {
        new_page_num
    };
    internal_node_insert(pager, root_page_num, &[destination], new_child_page_num)?;

    if let Some(grandparent_path) = grandparent_path {
        let grandparent = *grandparent_path.last().unwrap();
        update_internal_node_key(pager, grandparent, old_max, old_new_max)?;
        internal_node_insert(pager, root_page_num, &grandparent_path, new_page_num)?;
    } else {
        // old_max == previous root's max key; the new root's stored key for
        // the left child was already set to `old_new_max` by create_new_root
        // via node_max_key(left_page_num) after this point would be stale,
        // so fix it explicitly.
        update_internal_node_key(pager, *root_page_num, old_max, old_new_max)?;
    }

    tracing::debug!(old_page_num, new_page_num, "internal node split");
    Ok(())
}

/// Pretty-prints the tree rooted at `root_page_num`, indenting two spaces
/// per depth level.
pub fn print_tree(pager: &mut Pager, page_num: u32, depth: usize, out: &mut String) -> Result<(), Error> {
    let indent = "  ".repeat(depth);
    let (ty, num_cells_or_keys) = {
        let page = pager.get_page(page_num)?;
        match node_type(page) {
            NodeType::Leaf => (NodeType::Leaf, leaf_num_cells(page)),
            NodeType::Internal => (NodeType::Internal, internal_num_keys(page)),
        }
    };
    match ty {
        NodeType::Leaf => {
            out.push_str(&format!("{}- leaf (size {})\n", indent, num_cells_or_keys));
            for i in 0..num_cells_or_keys {
                let key = leaf_key(pager.get_page(page_num)?, i as usize);
                out.push_str(&format!("{}  - {}\n", indent, key));
            }
        }
        NodeType::Internal => {
            out.push_str(&format!("{}- internal (size {})\n", indent, num_cells_or_keys));
            for i in 0..num_cells_or_keys {
                let child = internal_child(pager.get_page(page_num)?, i as usize);
                print_tree(pager, child, depth + 1, out)?;
                let key = internal_key(pager.get_page(page_num)?, i as usize);
                out.push_str(&format!("{}  key {}\n", indent, key));
            }
            let right_child = internal_right_child(pager.get_page(page_num)?);
            print_tree(pager, right_child, depth + 1, out)?;
        }
    }
    Ok(())
}

/// Row bytes stored at the current cursor position, used by the cursor's
/// `value()` accessor.
pub fn cell_value(pager: &mut Pager, page_num: u32, cell_num: u32) -> Result<[u8; ROW_SIZE], Error> {
    let page = pager.get_page(page_num)?;
    let mut buf = [0u8; ROW_SIZE];
    buf.copy_from_slice(leaf_value(page, cell_num as usize));
    Ok(buf)
}
