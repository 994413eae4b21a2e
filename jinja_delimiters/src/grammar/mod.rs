//! Template grammar: syntax tree, builders and block keyword structure

pub mod ast;
pub mod builders;
pub mod keywords;

pub use ast::{Checkpoint, Child, Node, NodeId, NodeKind, SyntaxTree, TreeBuilder};
pub use builders::Parser;
