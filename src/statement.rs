//! The one-statement parser: recognises `insert <id> <username> <email>`
//! and `select`. Parse failures map to fixed `PREPARE_*` messages; execute
//! failures map to fixed `EXECUTE_*` messages. Both layers are
//! non-terminating: the REPL reports the message and reads the next line.

use crate::errors::Error;
use crate::row::Row;
use crate::table::Table;

pub enum Statement {
    Insert(Row),
    Select,
}

/// Parses one statement line. Errors carry the exact `PREPARE_*` message
/// text from the external interface contract.
pub fn parse(line: &str) -> Result<Statement, Error> {
    let mut words = line.split_whitespace();
    match words.next() {
        Some("insert") => {
            let id_tok = words
                .next()
                .ok_or_else(|| Error::Parse("Syntax error. Could not parse statement.".into()))?;
            let username = words
                .next()
                .ok_or_else(|| Error::Parse("Syntax error. Could not parse statement.".into()))?;
            let email = words
                .next()
                .ok_or_else(|| Error::Parse("Syntax error. Could not parse statement.".into()))?;
            if words.next().is_some() {
                return Err(Error::Parse("Syntax error. Could not parse statement.".into()));
            }
            let id: i64 = id_tok
                .parse()
                .map_err(|_| Error::Parse("ID must be a positive integer.".into()))?;
            if id < 0 {
                return Err(Error::Parse("ID must be a positive integer.".into()));
            }
            let row = Row::new(id as u32, username, email)?;
            Ok(Statement::Insert(row))
        }
        Some("select") => Ok(Statement::Select),
        Some(_) => Err(Error::Parse(format!(
            "Unrecognized keyword at start of '{}'.",
            line
        ))),
        None => Err(Error::Parse(format!(
            "Unrecognized keyword at start of '{}'.",
            line
        ))),
    }
}

/// Executes a parsed statement, printing `select` output directly to
/// `out`. Duplicate keys and a full table are `Error::Execute`, reported
/// by the caller without terminating the REPL.
pub fn execute(statement: Statement, table: &mut Table, out: &mut impl std::io::Write) -> Result<(), Error> {
    match statement {
        Statement::Insert(row) => {
            table.insert(&row)?;
            Ok(())
        }
        Statement::Select => {
            let mut cursor = table.cursor_start()?;
            while !cursor.end_of_table {
                let row = table.cursor_value(&cursor)?;
                writeln!(out, "{}", row).map_err(Error::Io)?;
                table.cursor_advance(&mut cursor)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_insert() {
        match parse("insert 1 alice a@x").unwrap() {
            Statement::Insert(row) => {
                assert_eq!(row.id, 1);
                assert_eq!(row.username, "alice");
                assert_eq!(row.email, "a@x");
            }
            _ => panic!("expected insert"),
        }
    }

    #[test]
    fn rejects_negative_id() {
        assert!(parse("insert -1 alice a@x").is_err());
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse("insert 1 alice").is_err());
    }

    #[test]
    fn recognises_select() {
        assert!(matches!(parse("select").unwrap(), Statement::Select));
    }

    #[test]
    fn rejects_unknown_keyword() {
        assert!(parse("delete 1").is_err());
    }
}
