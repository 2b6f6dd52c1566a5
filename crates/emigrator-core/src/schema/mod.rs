mod coerce;
mod field;
mod object;
mod record;
mod value;

pub use coerce::{coerce, parse_timestamp};
pub use field::{to_snake_case, Fallback, FieldDef, FieldKind, NullPolicy};
pub use object::{FieldEntry, FieldObject};
pub use record::DbRecord;
pub use value::DbValue;
