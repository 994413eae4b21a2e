//! Syntax tree nodes
//!
//! Nodes live in an arena owned by [`SyntaxTree`] and are addressed by
//! [`NodeId`]. A node's children are either other nodes or token indices into
//! the [`TokenStream`] the tree was parsed from, so every token of the input
//! (whitespace included) appears exactly once as a leaf.

use crate::tokens::TokenStream;
use serde::{Deserialize, Serialize};
use std::fmt;

// === NODE KINDS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Template,

    // Content
    Text,
    Comment,
    Variable,

    // Statements
    ForBlock,
    IfBlock,
    ElifBlock,
    ElseBlock,
    SetBlock,
    WithBlock,
    BlockDefinition,
    ExtendsBlock,
    IncludeBlock,
    ImportBlock,
    FromImportBlock,
    MacroBlock,
    CallBlock,
    FilterBlock,
    RawBlock,
    AutoescapeBlock,
    TransBlock,
    PluralizeBlock,
    GenericBlock,
    EndTag,

    // Statement parts
    TargetList,
    ImportName,
    ParameterList,
    Parameter,
    ArgumentList,
    KeywordArgument,
    DictEntry,

    // Expressions
    ConditionalExpression,
    OrExpression,
    AndExpression,
    NotExpression,
    ComparisonExpression,
    IsExpression,
    ArithmeticExpression,
    TermExpression,
    PowerExpression,
    UnaryExpression,
    FilterExpression,
    AttributeAccess,
    SubscriptAccess,
    FunctionCall,
    ParenthesizedExpression,
    VariableReference,
    StringLiteral,
    NumberLiteral,
    BooleanLiteral,
    NoneLiteral,
    ListLiteral,
    DictLiteral,
    TupleLiteral,

    /// Placeholder where the parser expected something else
    Error,
}

impl NodeKind {
    /// Nodes introduced by a block tag
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Self::ForBlock
                | Self::IfBlock
                | Self::ElifBlock
                | Self::ElseBlock
                | Self::SetBlock
                | Self::WithBlock
                | Self::BlockDefinition
                | Self::ExtendsBlock
                | Self::IncludeBlock
                | Self::ImportBlock
                | Self::FromImportBlock
                | Self::MacroBlock
                | Self::CallBlock
                | Self::FilterBlock
                | Self::RawBlock
                | Self::AutoescapeBlock
                | Self::TransBlock
                | Self::PluralizeBlock
                | Self::GenericBlock
                | Self::EndTag
        )
    }

    /// Statements that may own a body closed by an end tag
    pub fn has_body(self) -> bool {
        matches!(
            self,
            Self::ForBlock
                | Self::IfBlock
                | Self::WithBlock
                | Self::BlockDefinition
                | Self::MacroBlock
                | Self::CallBlock
                | Self::FilterBlock
                | Self::RawBlock
                | Self::AutoescapeBlock
                | Self::TransBlock
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::StringLiteral
                | Self::NumberLiteral
                | Self::BooleanLiteral
                | Self::NoneLiteral
                | Self::ListLiteral
                | Self::DictLiteral
                | Self::TupleLiteral
        )
    }

    pub fn is_expression(self) -> bool {
        self.is_literal()
            || matches!(
                self,
                Self::ConditionalExpression
                    | Self::OrExpression
                    | Self::AndExpression
                    | Self::NotExpression
                    | Self::ComparisonExpression
                    | Self::IsExpression
                    | Self::ArithmeticExpression
                    | Self::TermExpression
                    | Self::PowerExpression
                    | Self::UnaryExpression
                    | Self::FilterExpression
                    | Self::AttributeAccess
                    | Self::SubscriptAccess
                    | Self::FunctionCall
                    | Self::ParenthesizedExpression
                    | Self::VariableReference
            )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Template => "TEMPLATE",
            Self::Text => "TEXT",
            Self::Comment => "COMMENT",
            Self::Variable => "VARIABLE",
            Self::ForBlock => "FOR_BLOCK",
            Self::IfBlock => "IF_BLOCK",
            Self::ElifBlock => "ELIF_BLOCK",
            Self::ElseBlock => "ELSE_BLOCK",
            Self::SetBlock => "SET_BLOCK",
            Self::WithBlock => "WITH_BLOCK",
            Self::BlockDefinition => "BLOCK_DEFINITION",
            Self::ExtendsBlock => "EXTENDS_BLOCK",
            Self::IncludeBlock => "INCLUDE_BLOCK",
            Self::ImportBlock => "IMPORT_BLOCK",
            Self::FromImportBlock => "FROM_IMPORT_BLOCK",
            Self::MacroBlock => "MACRO_BLOCK",
            Self::CallBlock => "CALL_BLOCK",
            Self::FilterBlock => "FILTER_BLOCK",
            Self::RawBlock => "RAW_BLOCK",
            Self::AutoescapeBlock => "AUTOESCAPE_BLOCK",
            Self::TransBlock => "TRANS_BLOCK",
            Self::PluralizeBlock => "PLURALIZE_BLOCK",
            Self::GenericBlock => "GENERIC_BLOCK",
            Self::EndTag => "END_TAG",
            Self::TargetList => "TARGET_LIST",
            Self::ImportName => "IMPORT_NAME",
            Self::ParameterList => "PARAMETER_LIST",
            Self::Parameter => "PARAMETER",
            Self::ArgumentList => "ARGUMENT_LIST",
            Self::KeywordArgument => "KEYWORD_ARGUMENT",
            Self::DictEntry => "DICT_ENTRY",
            Self::ConditionalExpression => "CONDITIONAL_EXPRESSION",
            Self::OrExpression => "OR_EXPRESSION",
            Self::AndExpression => "AND_EXPRESSION",
            Self::NotExpression => "NOT_EXPRESSION",
            Self::ComparisonExpression => "COMPARISON_EXPRESSION",
            Self::IsExpression => "IS_EXPRESSION",
            Self::ArithmeticExpression => "ARITHMETIC_EXPRESSION",
            Self::TermExpression => "TERM_EXPRESSION",
            Self::PowerExpression => "POWER_EXPRESSION",
            Self::UnaryExpression => "UNARY_EXPRESSION",
            Self::FilterExpression => "FILTER_EXPRESSION",
            Self::AttributeAccess => "ATTRIBUTE_ACCESS",
            Self::SubscriptAccess => "SUBSCRIPT_ACCESS",
            Self::FunctionCall => "FUNCTION_CALL",
            Self::ParenthesizedExpression => "PARENTHESIZED_EXPRESSION",
            Self::VariableReference => "VARIABLE_REFERENCE",
            Self::StringLiteral => "STRING_LITERAL",
            Self::NumberLiteral => "NUMBER_LITERAL",
            Self::BooleanLiteral => "BOOLEAN_LITERAL",
            Self::NoneLiteral => "NONE_LITERAL",
            Self::ListLiteral => "LIST_LITERAL",
            Self::DictLiteral => "DICT_LITERAL",
            Self::TupleLiteral => "TUPLE_LITERAL",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// === ARENA ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Child {
    Node(NodeId),
    /// Index into the token stream
    Token(usize),
}

/// One node; `start..end` is the byte range of everything beneath it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Child>,
    pub start: usize,
    pub end: usize,
}

impl Node {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Parsed template; children are stored before their parents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    pub(crate) fn from_parts(nodes: Vec<Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// # Panics
    /// If `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[Child] {
        &self.node(id).children
    }

    /// Direct child nodes, skipping token leaves
    pub fn child_nodes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().filter_map(|child| match child {
            Child::Node(node) => Some(*node),
            Child::Token(_) => None,
        })
    }

    /// Direct token leaves, skipping child nodes
    pub fn child_tokens(&self, id: NodeId) -> impl Iterator<Item = usize> + '_ {
        self.children(id).iter().filter_map(|child| match child {
            Child::Token(index) => Some(*index),
            Child::Node(_) => None,
        })
    }

    pub fn first_child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.child_nodes(id).find(|child| self.kind(*child) == kind)
    }

    /// All nodes below `id` in document order, `id` itself excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.child_nodes(id).collect();
        stack.reverse();

        while let Some(next) = stack.pop() {
            found.push(next);
            let start = stack.len();
            stack.extend(self.child_nodes(next));
            stack[start..].reverse();
        }

        found
    }

    /// Every node of `kind` in document order, the root included
    pub fn find_all(&self, kind: NodeKind) -> Vec<NodeId> {
        let mut found = Vec::new();
        if self.kind(self.root) == kind {
            found.push(self.root);
        }
        found.extend(
            self.descendants(self.root)
                .into_iter()
                .filter(|id| self.kind(*id) == kind),
        );
        found
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|node| node.kind == kind).count()
    }

    /// Token leaves beneath `id` in document order
    pub fn tokens_of(&self, id: NodeId) -> Vec<usize> {
        let mut tokens = Vec::new();
        let mut stack: Vec<Child> = self.children(id).iter().rev().copied().collect();

        while let Some(child) = stack.pop() {
            match child {
                Child::Token(index) => tokens.push(index),
                Child::Node(node) => stack.extend(self.children(node).iter().rev().copied()),
            }
        }

        tokens
    }

    pub fn token_text<'s>(&self, stream: &'s TokenStream, index: usize) -> &'s str {
        stream.text_at(index)
    }

    pub fn node_text<'s>(&self, id: NodeId, source: &'s str) -> &'s str {
        let node = self.node(id);
        source.get(node.start..node.end).unwrap_or("")
    }

    /// Leaves must be exactly the stream's tokens, in order
    pub fn validate_coverage(&self, stream: &TokenStream) -> Result<(), String> {
        let leaves = self.tokens_of(self.root);
        if leaves.len() != stream.len() {
            return Err(format!(
                "Tree holds {} tokens, stream has {}",
                leaves.len(),
                stream.len()
            ));
        }
        if let Some((position, index)) = leaves.iter().enumerate().find(|(i, t)| *i != **t) {
            return Err(format!(
                "Token {} found at leaf position {}",
                index, position
            ));
        }
        Ok(())
    }

    /// Indented outline with token text, one line per node or token
    pub fn dump(&self, stream: &TokenStream) -> String {
        let mut out = String::new();
        self.dump_node(stream, self.root, 0, &mut out);
        out
    }

    fn dump_node(&self, stream: &TokenStream, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        out.push_str(&format!(
            "{}{}@{}..{}\n",
            "  ".repeat(depth),
            node.kind,
            node.start,
            node.end
        ));

        for child in &node.children {
            match child {
                Child::Node(inner) => self.dump_node(stream, *inner, depth + 1, out),
                Child::Token(index) => {
                    if let Some(token) = stream.get(*index) {
                        out.push_str(&format!(
                            "{}{} {:?}\n",
                            "  ".repeat(depth + 1),
                            token,
                            stream.text_at(*index)
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyntaxTree {
        // TEMPLATE(TEXT(t0), VARIABLE(t1, REF(t2), t3))
        let nodes = vec![
            Node { kind: NodeKind::Text, children: vec![Child::Token(0)], start: 0, end: 2 },
            Node {
                kind: NodeKind::VariableReference,
                children: vec![Child::Token(2)],
                start: 4,
                end: 5,
            },
            Node {
                kind: NodeKind::Variable,
                children: vec![Child::Token(1), Child::Node(NodeId(1)), Child::Token(3)],
                start: 2,
                end: 7,
            },
            Node {
                kind: NodeKind::Template,
                children: vec![Child::Node(NodeId(0)), Child::Node(NodeId(2))],
                start: 0,
                end: 7,
            },
        ];
        SyntaxTree::from_parts(nodes, NodeId(3))
    }

    #[test]
    fn test_descendants_document_order() {
        let tree = sample();
        let kinds: Vec<NodeKind> = tree
            .descendants(tree.root())
            .into_iter()
            .map(|id| tree.kind(id))
            .collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Text, NodeKind::Variable, NodeKind::VariableReference]
        );
    }

    #[test]
    fn test_tokens_of_in_order() {
        let tree = sample();
        assert_eq!(tree.tokens_of(tree.root()), vec![0, 1, 2, 3]);
        assert_eq!(tree.tokens_of(NodeId(2)), vec![1, 2, 3]);
    }

    #[test]
    fn test_find_all_and_count() {
        let tree = sample();
        assert_eq!(tree.find_all(NodeKind::Template), vec![tree.root()]);
        assert_eq!(tree.find_all(NodeKind::VariableReference), vec![NodeId(1)]);
        assert_eq!(tree.count(NodeKind::Comment), 0);
        assert_eq!(tree.first_child_of_kind(NodeId(2), NodeKind::VariableReference), Some(NodeId(1)));
    }

    #[test]
    fn test_node_text() {
        let tree = sample();
        assert_eq!(tree.node_text(NodeId(2), "hi{{ x }}"), "{{ x ");
        assert_eq!(tree.node_text(NodeId(0), ""), "");
    }

    #[test]
    fn test_node_kind_classes() {
        assert!(NodeKind::ForBlock.is_statement());
        assert!(NodeKind::ForBlock.has_body());
        assert!(!NodeKind::SetBlock.has_body());
        assert!(NodeKind::TupleLiteral.is_expression());
        assert!(!NodeKind::Variable.is_expression());
        assert_eq!(NodeKind::FromImportBlock.to_string(), "FROM_IMPORT_BLOCK");
    }
}
