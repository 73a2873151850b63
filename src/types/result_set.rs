use crate::types::{NamedRow, Value};
use serde::{Deserialize, Serialize};

/// Rows returned by an adapter for a single statement.
///
/// Statements that return no rows (DML, DDL) carry an empty `columns` list
/// and report the number of changed rows in `rows_affected`. For row
/// returning statements `rows_affected` is the row count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub rows_affected: u64,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let rows_affected = rows.len() as u64;
        Self {
            columns,
            rows,
            rows_affected,
        }
    }

    /// Result of a statement that changed rows but returned none
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Shape every row according to `mode`, consuming the result set
    pub fn into_fetched(self, mode: FetchMode) -> Vec<FetchedRow> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| FetchedRow::shape(&columns, row, mode))
            .collect()
    }
}

/// How the `fetch_*` helpers shape a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Column name to value
    #[default]
    Assoc,
    /// Positional values
    Num,
    /// Both of the above
    Both,
}

/// A row after fetch-mode shaping.
///
/// Named forms keep result column order. Duplicate column names collapse
/// onto the first column's position with the last column's value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FetchedRow {
    Assoc(NamedRow),
    Num(Vec<Value>),
    Both {
        named: NamedRow,
        positional: Vec<Value>,
    },
}

impl FetchedRow {
    pub fn shape(columns: &[String], row: Vec<Value>, mode: FetchMode) -> Self {
        match mode {
            FetchMode::Num => FetchedRow::Num(row),
            FetchMode::Assoc => FetchedRow::Assoc(columns.iter().cloned().zip(row).collect()),
            FetchMode::Both => FetchedRow::Both {
                named: columns.iter().cloned().zip(row.iter().cloned()).collect(),
                positional: row,
            },
        }
    }

    /// Look up a value by column name. Always `None` for `Num` rows.
    pub fn get(&self, column: &str) -> Option<&Value> {
        match self {
            FetchedRow::Assoc(named) | FetchedRow::Both { named, .. } => named.get(column),
            FetchedRow::Num(_) => None,
        }
    }

    /// Look up a value by position. Always `None` for `Assoc` rows.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            FetchedRow::Num(positional) | FetchedRow::Both { positional, .. } => {
                positional.get(index)
            }
            FetchedRow::Assoc(_) => None,
        }
    }
}
