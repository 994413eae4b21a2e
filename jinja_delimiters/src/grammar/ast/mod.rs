//! Syntax tree arena and builder

pub mod builder;
pub mod nodes;

pub use builder::{Checkpoint, TreeBuilder};
pub use nodes::{Child, Node, NodeId, NodeKind, SyntaxTree};
