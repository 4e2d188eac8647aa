//! The line-oriented REPL. Prompts, reads one line at a time from stdin,
//! and dispatches to meta-commands (`.exit`, `.constants`, `.btree`) or the
//! statement parser/executor. EOF is treated the same as `.exit`.

use std::io::{self, BufRead, Write};

use crate::errors::{fatal, Error};
use crate::node::{
    LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS, LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::node::COMMON_NODE_HEADER_SIZE;
use crate::row::ROW_SIZE;
use crate::statement;
use crate::table::Table;

const PROMPT: &str = "db > ";

pub fn run(mut table: Table) -> Result<(), Error> {
    let stdin = io::stdin();
    let mut out = io::stdout();

    loop {
        write!(out, "{}", PROMPT).map_err(Error::Io)?;
        out.flush().map_err(Error::Io)?;

        let mut line = String::new();
        let bytes_read = stdin.lock().read_line(&mut line).map_err(Error::Io)?;
        if bytes_read == 0 {
            // EOF (e.g. a piped script): behave like a clean `.exit`.
            table.close()?;
            return Ok(());
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            continue;
        }

        if let Some(meta) = line.strip_prefix('.') {
            if meta == "exit" {
                table.close()?;
                return Ok(());
            }
            run_meta_command(meta, &mut table, &mut out)?;
            continue;
        }

        match statement::parse(line) {
            Ok(stmt) => match statement::execute(stmt, &mut table, &mut out) {
                Ok(()) => {
                    writeln!(out, "Executed.").map_err(Error::Io)?;
                }
                Err(Error::Execute(msg)) => {
                    writeln!(out, "{}", msg).map_err(Error::Io)?;
                }
                Err(Error::Fatal(msg)) => fatal(msg),
                Err(e) => return Err(e),
            },
            Err(Error::Parse(msg)) => {
                writeln!(out, "{}", msg).map_err(Error::Io)?;
            }
            Err(e) => return Err(e),
        }
    }
}

fn run_meta_command(meta: &str, table: &mut Table, out: &mut impl Write) -> Result<(), Error> {
    match meta {
        "constants" => {
            writeln!(out, "Constants:").map_err(Error::Io)?;
            writeln!(out, "ROW_SIZE: {}", ROW_SIZE).map_err(Error::Io)?;
            writeln!(out, "COMMON_NODE_HEADER_SIZE: {}", COMMON_NODE_HEADER_SIZE).map_err(Error::Io)?;
            writeln!(out, "LEAF_NODE_HEADER_SIZE: {}", LEAF_NODE_HEADER_SIZE).map_err(Error::Io)?;
            writeln!(out, "LEAF_NODE_CELL_SIZE: {}", LEAF_NODE_CELL_SIZE).map_err(Error::Io)?;
            writeln!(out, "LEAF_NODE_SPACE_FOR_CELLS: {}", LEAF_NODE_SPACE_FOR_CELLS).map_err(Error::Io)?;
            writeln!(out, "LEAF_NODE_MAX_CELLS: {}", LEAF_NODE_MAX_CELLS).map_err(Error::Io)?;
        }
        "btree" => {
            let tree = table.print_tree()?;
            write!(out, "Tree:\n{}", tree).map_err(Error::Io)?;
        }
        _ => {
            writeln!(out, "Unrecognized command \".{}\".", meta).map_err(Error::Io)?;
        }
    }
    Ok(())
}
