// Values, result sets and table metadata shared by every adapter
pub mod column;
pub mod ordered;
pub mod result_set;
pub mod value;

pub use column::{ColumnDescriptor, DeclaredType};
pub use ordered::{NamedRow, OrderedMap};
pub use result_set::{FetchMode, FetchedRow, ResultSet};
pub use value::Value;
