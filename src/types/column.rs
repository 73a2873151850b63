use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// TYPE(length) or TYPE(precision, scale)
static SIZED_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_ ]*?)\s*\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\)\s*$")
        .expect("valid column type regex")
});

/// One column of a table as reported by `describe_table`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub schema_name: Option<String>,
    pub table_name: String,
    pub column_name: String,
    /// 1-based ordinal position
    pub column_position: u32,
    pub data_type: String,
    pub default: Option<String>,
    pub nullable: bool,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub primary: bool,
    /// 1-based position within the primary key
    pub primary_position: Option<u32>,
    pub identity: bool,
}

/// Size information parsed from a declared column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    pub name: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl DeclaredType {
    /// Split `VARCHAR(255)` into a name and a length, `DECIMAL(10,2)` into
    /// a name, precision and scale. Anything else is returned as a bare name.
    pub fn parse(declared: &str) -> Self {
        if let Some(caps) = SIZED_TYPE.captures(declared) {
            let name = caps[1].trim().to_string();
            let first = caps[2].parse::<u32>().ok();
            match caps.get(3).and_then(|m| m.as_str().parse::<u32>().ok()) {
                Some(scale) => Self {
                    name,
                    length: None,
                    precision: first,
                    scale: Some(scale),
                },
                None => Self {
                    name,
                    length: first,
                    precision: None,
                    scale: None,
                },
            }
        } else {
            Self {
                name: declared.trim().to_string(),
                length: None,
                precision: None,
                scale: None,
            }
        }
    }
}
