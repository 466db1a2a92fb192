// utils
pub mod error;
pub mod parser;

// calendar objects
pub mod tree;
pub mod object;
pub mod validate;
pub mod prune;

// calendar-query
pub mod collation;
pub mod text;
pub mod filter;
pub mod timerange;
pub mod query;

pub use error::{InvalidFileContents, MissingUid, ObjectError, QueryError, UnknownCollation};
pub use filter::{CalendarFilter, CompFilter, ParamFilter, PropFilter, TimeRange};
pub use object::CalendarObject;
pub use text::TextMatcher;
pub use validate::validate_calendar;
