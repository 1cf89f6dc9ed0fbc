//! Filter expression language for Autotask queries.
//!
//! Turns human-written conditions into the structured filter tree the
//! Autotask REST API accepts in its `search` parameter:
//!
//! ```text
//! Status!=5 AND (Priority=1 OR AssignedResourceID=123)
//! ```
//!
//! becomes an `and` group holding one `noteq` condition and a nested `or`
//! group. Values are typed from their literal text (`true`, `42`, `1.5`);
//! anything else is passed through as written, quotes included, except for
//! the text-matching operators (`contains`, `beginsWith`, ...) whose values
//! are unquoted.
//!
//! ## Supported syntax
//!
//! - Comparisons: `=`, `!=`, `>`, `>=`, `<`, `<=`
//! - Text matching: `contains`, `notContains`, `beginsWith`, `endsWith`
//! - Lists: `Status in (1, 5)`, `QueueID notIn (8, 9)`
//! - Null checks: `ContactID isNull`, `ContactID isNotNull`
//! - Connectives `AND` / `OR` (any case) and parentheses to any depth
//!
//! Unparseable input is reported as a [`FilterError`].

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::{Filter, FilterGroup, FilterValue, LogicalOperator, QueryFilter, QueryOperator};
pub use error::{FilterError, FilterResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse_filter, FilterParser};
