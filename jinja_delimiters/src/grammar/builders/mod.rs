//! Builder functions for template grammar productions

pub mod atomic;
pub mod blocks;
pub mod expressions;
pub mod helpers;

pub use atomic::{parse_argument_list, parse_parameter_list, parse_primary, Parser};
pub use blocks::{parse_comment, parse_content_item, parse_statement, parse_template, parse_variable};
pub use expressions::{parse_expression, parse_or_expression, parse_tuple_or_expression};
