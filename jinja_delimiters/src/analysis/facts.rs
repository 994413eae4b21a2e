//! Template facts collected from a syntax tree
//!
//! Names are read straight from token text. String dependencies are unquoted
//! but escapes are left as written.

use crate::analysis::AnalysisError;
use crate::config::compile_time::analysis::MAX_FACTS_PER_SET;
use crate::grammar::ast::{NodeId, NodeKind, SyntaxTree};
use crate::logging::codes;
use crate::syntax::ParsedTemplate;
use crate::tokens::{TokenKind, TokenStream};
use crate::{log_debug, log_warning};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFacts {
    /// Root names of expressions plus `for`/`set` targets
    pub variables: BTreeSet<String>,
    pub macros: BTreeSet<String>,
    pub blocks: BTreeSet<String>,
    pub filters: BTreeSet<String>,
    /// String targets of extends/include/import/from
    pub dependencies: BTreeSet<String>,
    /// Statements that open a body, plus `elif` branches
    pub complexity: usize,
}

impl TemplateFacts {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
            && self.macros.is_empty()
            && self.blocks.is_empty()
            && self.filters.is_empty()
            && self.dependencies.is_empty()
            && self.complexity == 0
    }

    pub fn total_names(&self) -> usize {
        self.variables.len()
            + self.macros.len()
            + self.blocks.len()
            + self.filters.len()
            + self.dependencies.len()
    }
}

/// Which fact set a name goes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FactSet {
    Variables,
    Macros,
    Blocks,
    Filters,
    Dependencies,
}

impl FactSet {
    fn name(self) -> &'static str {
        match self {
            Self::Variables => "variables",
            Self::Macros => "macros",
            Self::Blocks => "blocks",
            Self::Filters => "filters",
            Self::Dependencies => "dependencies",
        }
    }
}

/// Walks one tree and fills a [`TemplateFacts`]
pub struct FactsCollector<'a> {
    tree: &'a SyntaxTree,
    stream: &'a TokenStream,
    facts: TemplateFacts,
    /// Variable references that name a test or a filter instead of a value
    not_variables: HashSet<NodeId>,
    overflowed: HashSet<FactSet>,
}

impl<'a> FactsCollector<'a> {
    pub fn new(tree: &'a SyntaxTree, stream: &'a TokenStream) -> Self {
        Self {
            tree,
            stream,
            facts: TemplateFacts::default(),
            not_variables: HashSet::new(),
            overflowed: HashSet::new(),
        }
    }

    pub fn collect(mut self) -> TemplateFacts {
        let nodes = self.tree.descendants(self.tree.root());

        for id in &nodes {
            match self.tree.kind(*id) {
                NodeKind::IsExpression => {
                    if let Some(test) = self.tree.child_nodes(*id).nth(1) {
                        if let Some(base) = self.base_reference(test) {
                            self.not_variables.insert(base);
                        }
                    }
                }
                NodeKind::FilterBlock => {
                    if let Some(base) = self
                        .tree
                        .child_nodes(*id)
                        .next()
                        .and_then(|expr| self.base_reference(expr))
                    {
                        self.not_variables.insert(base);
                        let name = self.reference_name(base);
                        self.insert(FactSet::Filters, name);
                    }
                }
                _ => {}
            }
        }

        for id in nodes {
            self.visit(id);
        }

        log_debug!("Template facts collected",
            "variables" => self.facts.variables.len(),
            "macros" => self.facts.macros.len(),
            "dependencies" => self.facts.dependencies.len(),
            "complexity" => self.facts.complexity
        );

        self.facts
    }

    fn visit(&mut self, id: NodeId) {
        let kind = self.tree.kind(id);
        if kind.has_body() || kind == NodeKind::ElifBlock {
            self.facts.complexity += 1;
        }

        match kind {
            NodeKind::VariableReference if !self.not_variables.contains(&id) => {
                let name = self.reference_name(id);
                self.insert(FactSet::Variables, name);
            }
            NodeKind::TargetList => {
                for name in self.target_names(id) {
                    self.insert(FactSet::Variables, name);
                }
            }
            NodeKind::MacroBlock => {
                if let Some(name) = self.first_identifier(id) {
                    self.insert(FactSet::Macros, name);
                }
            }
            NodeKind::BlockDefinition => {
                if let Some(name) = self.first_identifier(id) {
                    self.insert(FactSet::Blocks, name);
                }
            }
            NodeKind::FilterExpression => {
                if let Some(name) = self.first_identifier(id) {
                    self.insert(FactSet::Filters, name);
                }
            }
            NodeKind::ExtendsBlock
            | NodeKind::IncludeBlock
            | NodeKind::ImportBlock
            | NodeKind::FromImportBlock => {
                for target in self.dependency_targets(id) {
                    self.insert(FactSet::Dependencies, target);
                }
            }
            _ => {}
        }
    }

    fn insert(&mut self, set: FactSet, name: String) {
        let target = match set {
            FactSet::Variables => &mut self.facts.variables,
            FactSet::Macros => &mut self.facts.macros,
            FactSet::Blocks => &mut self.facts.blocks,
            FactSet::Filters => &mut self.facts.filters,
            FactSet::Dependencies => &mut self.facts.dependencies,
        };

        if target.len() >= MAX_FACTS_PER_SET && !target.contains(&name) {
            if self.overflowed.insert(set) {
                let error = AnalysisError::FactsLimitExceeded {
                    set: set.name(),
                    limit: MAX_FACTS_PER_SET,
                };
                log_warning!(code = error.error_code(), &error.to_string(),
                    "set" => set.name()
                );
            }
            return;
        }
        target.insert(name);
    }

    /// Variable reference at the bottom of a postfix/filter chain
    fn base_reference(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.tree.kind(current) {
                NodeKind::VariableReference => return Some(current),
                NodeKind::FunctionCall | NodeKind::FilterExpression | NodeKind::AttributeAccess => {
                    current = self.tree.child_nodes(current).next()?;
                }
                _ => return None,
            }
        }
    }

    fn reference_name(&self, id: NodeId) -> String {
        self.first_identifier(id).unwrap_or_default()
    }

    /// First identifier token among the direct children
    fn first_identifier(&self, id: NodeId) -> Option<String> {
        self.tree
            .child_tokens(id)
            .find(|index| self.stream.kind_at(*index) == Some(TokenKind::Identifier))
            .map(|index| self.stream.text_at(index).to_string())
    }

    /// `a, b.c` yields `a` and `b`
    fn target_names(&self, id: NodeId) -> Vec<String> {
        let mut names = Vec::new();
        let mut after_dot = false;

        for index in self.tree.child_tokens(id) {
            match self.stream.kind_at(index) {
                Some(TokenKind::Identifier) if !after_dot => {
                    names.push(self.stream.text_at(index).to_string());
                }
                Some(TokenKind::Dot) => {
                    after_dot = true;
                    continue;
                }
                Some(TokenKind::Whitespace) => continue,
                _ => {}
            }
            after_dot = false;
        }

        names
    }

    fn dependency_targets(&self, id: NodeId) -> Vec<String> {
        let Some(target) = self.tree.child_nodes(id).next() else {
            return Vec::new();
        };

        match self.tree.kind(target) {
            NodeKind::StringLiteral => vec![self.string_value(target)],
            NodeKind::ListLiteral | NodeKind::TupleLiteral => self
                .tree
                .child_nodes(target)
                .filter(|item| self.tree.kind(*item) == NodeKind::StringLiteral)
                .map(|item| self.string_value(item))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Concatenated, unquoted parts of a string literal
    fn string_value(&self, id: NodeId) -> String {
        self.tree
            .child_tokens(id)
            .filter(|index| self.stream.kind_at(*index) == Some(TokenKind::String))
            .map(|index| unquote(self.stream.text_at(index)))
            .collect()
    }
}

fn unquote(text: &str) -> &str {
    let mut chars = text.chars();
    let Some(open) = chars.next() else {
        return text;
    };
    let inner = &text[open.len_utf8()..];
    match inner.strip_suffix(open) {
        Some(stripped) => stripped,
        // Unterminated literal
        None => inner,
    }
}

/// Facts for a parsed template
pub fn collect_facts(stream: &TokenStream, parsed: &ParsedTemplate) -> TemplateFacts {
    let facts = FactsCollector::new(&parsed.tree, stream).collect();
    if facts.total_names() > 0 {
        crate::log_success!(codes::success::FACTS_COLLECTED, "Template facts collected",
            "names" => facts.total_names(),
            "complexity" => facts.complexity
        );
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelimiterConfig;
    use crate::syntax::parse_source;

    fn facts(source: &str) -> TemplateFacts {
        let (stream, parsed) = parse_source(source, &DelimiterConfig::default()).unwrap();
        collect_facts(&stream, &parsed)
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_variables_and_targets() {
        let facts = facts(
            "{% for item in cart.items %}{{ item.price * qty }}{% endfor %}{% set total = 0 %}",
        );
        assert_eq!(facts.variables, set(&["cart", "item", "qty", "total"]));
        assert_eq!(facts.complexity, 1);
    }

    #[test]
    fn test_tests_and_filter_blocks_are_not_variables() {
        let facts = facts(
            "{% if user is defined and n is divisibleby(3) %}{% filter upper %}{{ name | title }}{% endfilter %}{% endif %}",
        );
        assert_eq!(facts.variables, set(&["n", "name", "user"]));
        assert_eq!(facts.filters, set(&["title", "upper"]));
        assert_eq!(facts.complexity, 2);
    }

    #[test]
    fn test_macros_blocks_and_dependencies() {
        let facts = facts(concat!(
            "{% extends \"base.html\" %}",
            "{% import 'forms.html' as forms %}",
            "{% from 'macros.html' import field %}",
            "{% include ['a.html', 'b.html'] ignore missing %}",
            "{% include template_name %}",
            "{% block content %}{% macro row(cells) %}{% endmacro %}{% endblock %}",
        ));
        assert_eq!(facts.macros, set(&["row"]));
        assert_eq!(facts.blocks, set(&["content"]));
        assert_eq!(
            facts.dependencies,
            set(&["a.html", "b.html", "base.html", "forms.html", "macros.html"])
        );
        assert!(facts.variables.contains("template_name"));
        assert!(!facts.variables.contains("forms"));
    }

    #[test]
    fn test_namespace_target() {
        let facts = facts("{% set ns.found = true %}");
        assert_eq!(facts.variables, set(&["ns"]));
    }

    #[test]
    fn test_empty_template() {
        let facts = facts("plain text only");
        assert!(facts.is_empty());
        assert_eq!(facts.total_names(), 0);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'a.html'"), "a.html");
        assert_eq!(unquote("\"b\""), "b");
        assert_eq!(unquote("'open"), "open");
        assert_eq!(unquote(""), "");
    }
}
