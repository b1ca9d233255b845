//! Query language: syntax tree, parameters and parser.

pub mod ast;
pub mod params;
pub mod parser;

pub use self::ast::{AstNode, KnnNode, LogicOp, TagValue};
pub use self::params::{ParamValue, QueryParams};
pub use self::parser::parse_query;
