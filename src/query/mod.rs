// Statement classification and the select builder
pub mod query_type_detection;
pub mod select;

pub use query_type_detection::{QueryTypeDetector, StatementClass};
pub use select::{where_expr, Direction, JoinKind, Select};
