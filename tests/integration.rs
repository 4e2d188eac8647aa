//! End-to-end tests driving the `Table` facade through a temporary file,
//! covering the boundary scenarios and invariants from the design.

use simple_db::node::{INTERNAL_NODE_MAX_CELLS, LEAF_NODE_MAX_CELLS};
use simple_db::row::Row;
use simple_db::table::Table;

fn temp_db_path() -> tempfile::TempPath {
    tempfile::NamedTempFile::new().unwrap().into_temp_path()
}

fn select_all(table: &mut Table) -> Vec<Row> {
    let mut cursor = table.cursor_start().unwrap();
    let mut rows = Vec::new();
    while !cursor.end_of_table {
        rows.push(table.cursor_value(&cursor).unwrap());
        table.cursor_advance(&mut cursor).unwrap();
    }
    rows
}

#[test]
fn fresh_file_single_insert() {
    let path = temp_db_path();
    let mut table = Table::open(&path).unwrap();
    table.insert(&Row::new(1, "alice", "a@x").unwrap()).unwrap();
    let rows = select_all(&mut table);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].to_string(), "(1, alice, a@x)");
}

#[test]
fn duplicate_insert_is_rejected_and_does_not_modify_tree() {
    let path = temp_db_path();
    let mut table = Table::open(&path).unwrap();
    table.insert(&Row::new(1, "a", "b").unwrap()).unwrap();
    let err = table.insert(&Row::new(1, "c", "d").unwrap());
    assert!(err.is_err());
    let rows = select_all(&mut table);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username, "a");
    assert_eq!(rows[0].email, "b");
}

#[test]
fn ascending_inserts_trigger_a_leaf_split() {
    let path = temp_db_path();
    let mut table = Table::open(&path).unwrap();
    let n = LEAF_NODE_MAX_CELLS as u32 + 1;
    for id in 1..=n {
        table
            .insert(&Row::new(id, format!("user{id}"), format!("u{id}@x")).unwrap())
            .unwrap();
    }
    let rows = select_all(&mut table);
    let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
    let expected: Vec<u32> = (1..=n).collect();
    assert_eq!(ids, expected);

    let tree = table.print_tree().unwrap();
    assert!(tree.starts_with("- internal"), "expected promoted root, got:\n{tree}");
}

#[test]
fn descending_inserts_still_produce_an_ordered_scan() {
    let path = temp_db_path();
    let mut table = Table::open(&path).unwrap();
    let n = LEAF_NODE_MAX_CELLS as u32 + 1;
    for id in (1..=n).rev() {
        table
            .insert(&Row::new(id, format!("user{id}"), format!("u{id}@x")).unwrap())
            .unwrap();
    }
    let rows = select_all(&mut table);
    let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
    let expected: Vec<u32> = (1..=n).collect();
    assert_eq!(ids, expected);
}

#[test]
fn enough_inserts_force_an_internal_split_into_a_three_level_tree() {
    let path = temp_db_path();
    let mut table = Table::open(&path).unwrap();
    // Enough leaves to exhaust a root internal node's fan-out
    // (INTERNAL_NODE_MAX_CELLS + 1 children) and force it to split too.
    let n = (LEAF_NODE_MAX_CELLS as u32) * (INTERNAL_NODE_MAX_CELLS as u32 + 2);
    for id in 1..=n {
        table
            .insert(&Row::new(id, format!("u{id}"), format!("u{id}@x")).unwrap())
            .unwrap();
    }
    let rows = select_all(&mut table);
    let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
    let expected: Vec<u32> = (1..=n).collect();
    assert_eq!(ids, expected);
    assert_eq!(table.root_page_num, 0);
}

#[test]
fn persists_across_close_and_reopen() {
    let path = temp_db_path();
    {
        let mut table = Table::open(&path).unwrap();
        table.insert(&Row::new(3, "c", "c").unwrap()).unwrap();
        table.insert(&Row::new(1, "a", "a").unwrap()).unwrap();
        table.insert(&Row::new(2, "b", "b").unwrap()).unwrap();
        table.close().unwrap();
    }
    let mut table = Table::open(&path).unwrap();
    let rows = select_all(&mut table);
    let texts: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
    assert_eq!(texts, vec!["(1, a, a)", "(2, b, b)", "(3, c, c)"]);
}

#[test]
fn root_stays_at_page_zero_across_many_splits() {
    let path = temp_db_path();
    let mut table = Table::open(&path).unwrap();
    for id in 1..=200u32 {
        table
            .insert(&Row::new(id, format!("u{id}"), format!("u{id}@x")).unwrap())
            .unwrap();
    }
    assert_eq!(table.root_page_num, 0);
}
