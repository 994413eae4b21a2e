//! Arena tree builder
//!
//! Nodes are opened and closed in stack order. A [`Checkpoint`] remembers how
//! many children the innermost open node had; [`TreeBuilder::start_node_at`]
//! later moves every child added since then under a new parent, which is how
//! left-associative operators and postfix chains are built without lookahead.

use super::nodes::{Child, Node, NodeId, NodeKind, SyntaxTree};
use crate::tokens::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    depth: usize,
    children: usize,
}

#[derive(Debug)]
struct OpenNode {
    kind: NodeKind,
    children: Vec<Child>,
    /// Offset used when the node ends up with no children
    offset: usize,
}

pub struct TreeBuilder<'t> {
    tokens: &'t [Token],
    nodes: Vec<Node>,
    open: Vec<OpenNode>,
    last_finished: Option<NodeId>,
}

impl<'t> TreeBuilder<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            nodes: Vec::new(),
            open: Vec::new(),
            last_finished: None,
        }
    }

    /// Number of currently open nodes
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn start_node(&mut self, kind: NodeKind, offset: usize) {
        self.open.push(OpenNode {
            kind,
            children: Vec::new(),
            offset,
        });
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            depth: self.open.len(),
            children: self.open.last().map_or(0, |node| node.children.len()),
        }
    }

    /// Open `kind` around every child added to the current node since `checkpoint`
    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: NodeKind, offset: usize) {
        let depth = self.open.len();
        let wrapped = match self.open.last_mut() {
            Some(parent) if checkpoint.depth == depth => {
                let at = checkpoint.children.min(parent.children.len());
                parent.children.split_off(at)
            }
            _ => Vec::new(),
        };
        self.open.push(OpenNode {
            kind,
            children: wrapped,
            offset,
        });
    }

    /// Attach token `index` to the innermost open node
    pub fn token(&mut self, index: usize) {
        if let Some(node) = self.open.last_mut() {
            node.children.push(Child::Token(index));
        }
    }

    pub fn finish_node(&mut self) -> Option<NodeId> {
        let open = self.open.pop()?;
        let (start, end) = self.range_of(&open.children).unwrap_or((open.offset, open.offset));

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind: open.kind,
            children: open.children,
            start,
            end,
        });

        if let Some(parent) = self.open.last_mut() {
            parent.children.push(Child::Node(id));
        }
        self.last_finished = Some(id);
        Some(id)
    }

    /// Close anything left open and hand over the tree
    pub fn finish(mut self) -> SyntaxTree {
        while !self.open.is_empty() {
            self.finish_node();
        }

        let root = match self.last_finished {
            Some(root) => root,
            None => {
                self.nodes.push(Node {
                    kind: NodeKind::Template,
                    children: Vec::new(),
                    start: 0,
                    end: 0,
                });
                NodeId(self.nodes.len() - 1)
            }
        };

        SyntaxTree::from_parts(self.nodes, root)
    }

    fn range_of(&self, children: &[Child]) -> Option<(usize, usize)> {
        let first = children.first()?;
        let last = children.last()?;
        Some((self.child_range(first).0, self.child_range(last).1))
    }

    fn child_range(&self, child: &Child) -> (usize, usize) {
        match child {
            Child::Node(id) => {
                let node = &self.nodes[id.index()];
                (node.start, node.end)
            }
            Child::Token(index) => self
                .tokens
                .get(*index)
                .map_or((0, 0), |token| (token.start, token.end)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenKind;

    fn tokens() -> Vec<Token> {
        // "a+b"
        vec![
            Token::new(TokenKind::Identifier, 0, 1),
            Token::new(TokenKind::Plus, 1, 2),
            Token::new(TokenKind::Identifier, 2, 3),
        ]
    }

    #[test]
    fn test_wrap_from_checkpoint() {
        let tokens = tokens();
        let mut builder = TreeBuilder::new(&tokens);
        builder.start_node(NodeKind::Template, 0);

        let checkpoint = builder.checkpoint();
        builder.start_node(NodeKind::VariableReference, 0);
        builder.token(0);
        builder.finish_node();

        builder.start_node_at(checkpoint, NodeKind::ArithmeticExpression, 1);
        builder.token(1);
        builder.start_node(NodeKind::VariableReference, 2);
        builder.token(2);
        builder.finish_node();
        builder.finish_node();

        let tree = builder.finish();
        let root = tree.root();
        assert_eq!(tree.kind(root), NodeKind::Template);

        let children: Vec<NodeId> = tree.child_nodes(root).collect();
        assert_eq!(children.len(), 1);
        let expression = tree.node(children[0]);
        assert_eq!(expression.kind, NodeKind::ArithmeticExpression);
        assert_eq!((expression.start, expression.end), (0, 3));
        assert_eq!(tree.tokens_of(root), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_node_uses_offset() {
        let tokens = tokens();
        let mut builder = TreeBuilder::new(&tokens);
        builder.start_node(NodeKind::Template, 0);
        builder.start_node(NodeKind::Error, 2);
        let id = builder.finish_node().unwrap();
        let tree = builder.finish();

        assert_eq!((tree.node(id).start, tree.node(id).end), (2, 2));
    }

    #[test]
    fn test_finish_closes_open_nodes() {
        let tokens = tokens();
        let mut builder = TreeBuilder::new(&tokens);
        builder.start_node(NodeKind::Template, 0);
        builder.start_node(NodeKind::Variable, 0);
        builder.token(0);
        let tree = builder.finish();

        assert_eq!(tree.kind(tree.root()), NodeKind::Template);
        assert_eq!(tree.find_all(NodeKind::Variable).len(), 1);
    }

    #[test]
    fn test_empty_builder_yields_template() {
        let builder = TreeBuilder::new(&[]);
        let tree = builder.finish();
        assert_eq!(tree.kind(tree.root()), NodeKind::Template);
        assert!(tree.node(tree.root()).is_empty());
    }
}
