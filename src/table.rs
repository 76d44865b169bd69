//! Grid rendering of factors.
//!
//! Every joint assignment becomes one row, with a `Name(state)` cell per scope variable
//! followed by the value:
//!
//! ```text
//! +------------+--------------+
//! | Disease    | phi(Disease) |
//! +============+==============+
//! | Disease(0) |       0.9500 |
//! +------------+--------------+
//! | Disease(1) |       0.0500 |
//! +------------+--------------+
//! ```

use std::fmt::{self, Display, Formatter};

use crate::factor::Factor;
use crate::index::Assignments;

/// Number of decimals used for values.
const PRECISION: usize = 4;

impl Display for Factor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let names = self.names();

        let mut header: Vec<String> = names.iter().map(|name| name.to_string()).collect();
        header.push(format!("phi({})", names.join(",")));

        let rows: Vec<Vec<String>> = Assignments::new(self.cardinalities())
            .zip(self.values())
            .map(|(states, value)| {
                let mut row: Vec<String> = names
                    .iter()
                    .zip(&states)
                    .map(|(name, state)| format!("{}({})", name, state))
                    .collect();
                row.push(format!("{:.*}", PRECISION, value));
                row
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|cell| width(cell)).collect();
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(width(cell));
            }
        }

        let value_column = widths.len() - 1;
        write_rule(f, &widths, '-')?;
        write_row(f, &header, &widths, value_column)?;
        write_rule(f, &widths, '=')?;
        for row in &rows {
            write_row(f, row, &widths, value_column)?;
            write_rule(f, &widths, '-')?;
        }
        Ok(())
    }
}

/// Display width of a cell. Counts chars rather than bytes, so accented names line up.
fn width(cell: &str) -> usize {
    cell.chars().count()
}

fn write_rule(f: &mut Formatter<'_>, widths: &[usize], fill: char) -> fmt::Result {
    write!(f, "+")?;
    for &w in widths {
        for _ in 0..w + 2 {
            write!(f, "{}", fill)?;
        }
        write!(f, "+")?;
    }
    writeln!(f)
}

fn write_row(f: &mut Formatter<'_>, cells: &[String], widths: &[usize], value_column: usize) -> fmt::Result {
    write!(f, "|")?;
    for (i, (cell, &w)) in cells.iter().zip(widths).enumerate() {
        let pad = " ".repeat(w - width(cell));
        if i == value_column {
            write!(f, " {}{} |", pad, cell)?;
        } else {
            write!(f, " {}{} |", cell, pad)?;
        }
    }
    writeln!(f)
}
