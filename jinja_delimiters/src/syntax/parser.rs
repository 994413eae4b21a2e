//! Recursive-descent template parser
//!
//! [`TemplateParser`] owns the read position, the tree builder and the
//! diagnostics; the grammar itself lives in `grammar::builders` and reaches
//! the parser only through the [`Parser`] trait.

use crate::config::compile_time::syntax::*;
use crate::grammar::ast::{Checkpoint, NodeKind, SyntaxTree, TreeBuilder};
use crate::grammar::builders::{parse_template, Parser};
use crate::syntax::error::{Diagnostic, SyntaxError};
use crate::tokens::{LexState, TokenKind, TokenStream};
use serde::Serialize;

/// Tree, diagnostics and counters for one parse
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    pub tree: SyntaxTree,
    pub diagnostics: Vec<Diagnostic>,
    pub statistics: ParseStatistics,
}

impl ParsedTemplate {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.tree.count(kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseStatistics {
    pub node_count: usize,
    pub max_depth_reached: usize,
    pub diagnostics_recorded: usize,
    /// Diagnostics dropped after `MAX_DIAGNOSTICS`
    pub diagnostics_suppressed: usize,
}

pub struct TemplateParser<'s> {
    stream: &'s TokenStream,
    /// Index of the next unconsumed token, whitespace included
    position: usize,
    builder: TreeBuilder<'s>,
    diagnostics: Vec<Diagnostic>,
    suppressed: usize,
    parse_depth: usize,
    max_depth_reached: usize,
    /// The depth diagnostic is recorded once per parse
    depth_reported: bool,
    open_bodies: Vec<TokenKind>,
}

impl<'s> TemplateParser<'s> {
    pub fn new(stream: &'s TokenStream) -> Self {
        Self {
            stream,
            position: 0,
            builder: TreeBuilder::new(stream.tokens()),
            diagnostics: Vec::new(),
            suppressed: 0,
            parse_depth: 0,
            max_depth_reached: 0,
            depth_reported: false,
            open_bodies: Vec::new(),
        }
    }

    pub fn parse(mut self) -> ParsedTemplate {
        parse_template(&mut self);

        // Builders stop at end of input; anything left means a builder bug,
        // so keep the tree complete regardless.
        while self.position < self.stream.len() {
            self.builder.token(self.position);
            self.position += 1;
        }

        let tree = self.builder.finish();
        let statistics = ParseStatistics {
            node_count: tree.len(),
            max_depth_reached: self.max_depth_reached,
            diagnostics_recorded: self.diagnostics.len(),
            diagnostics_suppressed: self.suppressed,
        };

        ParsedTemplate {
            tree,
            diagnostics: self.diagnostics,
            statistics,
        }
    }

    /// Token index of the `n`-th significant token at or after the position
    fn significant_index(&self, n: usize) -> Option<usize> {
        let tokens = self.stream.tokens();
        let mut remaining = n;
        let mut index = self.position;

        while index < tokens.len() {
            if tokens[index].kind != TokenKind::Whitespace {
                if remaining == 0 {
                    return Some(index);
                }
                remaining -= 1;
            }
            index += 1;
        }
        None
    }

    fn flush_trivia(&mut self) {
        let tokens = self.stream.tokens();
        while self.position < tokens.len() && tokens[self.position].kind == TokenKind::Whitespace {
            self.builder.token(self.position);
            self.position += 1;
        }
    }
}

impl Parser for TemplateParser<'_> {
    fn nth(&self, n: usize) -> Option<TokenKind> {
        self.significant_index(n)
            .map(|index| self.stream.tokens()[index].kind)
    }

    fn next_state(&self) -> Option<LexState> {
        self.significant_index(0)
            .and_then(|index| self.stream.state_after(index))
    }

    fn offset(&self) -> usize {
        self.significant_index(0)
            .map(|index| self.stream.tokens()[index].start)
            .unwrap_or_else(|| self.stream.source().len())
    }

    fn bump(&mut self) {
        self.flush_trivia();
        if self.position < self.stream.len() {
            self.builder.token(self.position);
            self.position += 1;
        }
    }

    fn eat_trivia(&mut self) {
        self.flush_trivia();
    }

    fn start_node(&mut self, kind: NodeKind) {
        self.flush_trivia();
        let offset = self.offset();
        self.builder.start_node(kind, offset);
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.flush_trivia();
        self.builder.checkpoint()
    }

    fn start_node_at(&mut self, checkpoint: Checkpoint, kind: NodeKind) {
        let offset = self.offset();
        self.builder.start_node_at(checkpoint, kind, offset);
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn error_at(&mut self, offset: usize, error: SyntaxError, message: &str) {
        if self.diagnostics.len() >= MAX_DIAGNOSTICS {
            self.suppressed += 1;
            return;
        }
        self.diagnostics.push(Diagnostic::new(offset, error, message));
    }

    fn enter(&mut self) -> bool {
        if self.parse_depth >= MAX_PARSE_DEPTH {
            if !self.depth_reported {
                self.depth_reported = true;
                self.error(
                    SyntaxError::MaxRecursionDepth,
                    &format!("Nesting deeper than {} levels", MAX_PARSE_DEPTH),
                );
            }
            return false;
        }
        self.parse_depth += 1;
        self.max_depth_reached = self.max_depth_reached.max(self.parse_depth);
        true
    }

    fn exit(&mut self) {
        self.parse_depth = self.parse_depth.saturating_sub(1);
    }

    fn open_body(&mut self, end: TokenKind) {
        self.open_bodies.push(end);
    }

    fn close_body(&mut self) {
        self.open_bodies.pop();
    }

    fn awaits_end(&self, end: TokenKind) -> bool {
        self.open_bodies.contains(&end)
    }
}

/// Parse a token stream into a tree; never fails
pub fn parse_stream(stream: &TokenStream) -> ParsedTemplate {
    TemplateParser::new(stream).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelimiterConfig;
    use crate::grammar::ast::NodeId;
    use crate::lexical::tokenize_source;
    use assert_matches::assert_matches;

    fn parse_with(source: &str, config: &DelimiterConfig) -> (TokenStream, ParsedTemplate) {
        let stream = tokenize_source(source, config).unwrap();
        let parsed = parse_stream(&stream);
        parsed.tree.validate_coverage(&stream).unwrap();
        (stream, parsed)
    }

    fn parse(source: &str) -> (TokenStream, ParsedTemplate) {
        parse_with(source, &DelimiterConfig::default())
    }

    fn messages(parsed: &ParsedTemplate) -> Vec<&str> {
        parsed.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    /// Kinds of the direct child nodes of `id`
    fn child_kinds(parsed: &ParsedTemplate, id: NodeId) -> Vec<NodeKind> {
        parsed
            .tree
            .child_nodes(id)
            .map(|child| parsed.tree.kind(child))
            .collect()
    }

    #[test]
    fn test_if_elif_else() {
        let (_, parsed) =
            parse("{% if x > 0 %}pos{% elif x < 0 %}neg{% else %}zero{% endif %}");
        let tree = &parsed.tree;

        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let ifs = tree.find_all(NodeKind::IfBlock);
        assert_eq!(ifs.len(), 1);
        assert_eq!(tree.count(NodeKind::ElifBlock), 1);
        assert_eq!(tree.count(NodeKind::ElseBlock), 1);
        assert_eq!(tree.count(NodeKind::ComparisonExpression), 2);

        assert_eq!(
            child_kinds(&parsed, ifs[0]),
            vec![
                NodeKind::ComparisonExpression,
                NodeKind::Text,
                NodeKind::ElifBlock,
                NodeKind::ElseBlock,
                NodeKind::EndTag,
            ]
        );
        assert_eq!(child_kinds(&parsed, tree.root()), vec![NodeKind::IfBlock]);
    }

    #[test]
    fn test_for_block_contains_variables() {
        let (stream, parsed) =
            parse("<ul>{% for item in items %}<li>{{ item.name }}: {{ item.price }}</li>{% endfor %}</ul>");
        let tree = &parsed.tree;

        assert!(parsed.diagnostics.is_empty());
        let fors = tree.find_all(NodeKind::ForBlock);
        assert_eq!(fors.len(), 1);

        let inner_variables = tree
            .descendants(fors[0])
            .into_iter()
            .filter(|id| tree.kind(*id) == NodeKind::Variable)
            .count();
        assert_eq!(inner_variables, 2);
        assert_eq!(tree.count(NodeKind::Variable), 2);

        let for_text = tree.node_text(fors[0], stream.source());
        assert!(for_text.starts_with("{% for"));
        assert!(for_text.ends_with("{% endfor %}"));
    }

    #[test]
    fn test_postfix_chain_order() {
        let (_, parsed) = parse("{{ a.b[0]().c | upper }}");
        let tree = &parsed.tree;
        assert!(parsed.diagnostics.is_empty());

        let variables = tree.find_all(NodeKind::Variable);
        assert_eq!(variables.len(), 1);

        let mut chain = Vec::new();
        let mut current = tree.child_nodes(variables[0]).next();
        while let Some(id) = current {
            chain.push(tree.kind(id));
            current = tree.child_nodes(id).next();
        }

        assert_eq!(
            chain,
            vec![
                NodeKind::FilterExpression,
                NodeKind::AttributeAccess,
                NodeKind::FunctionCall,
                NodeKind::SubscriptAccess,
                NodeKind::AttributeAccess,
                NodeKind::VariableReference,
            ]
        );
    }

    #[test]
    fn test_unclosed_variable() {
        let (_, parsed) = parse("{{ unclosed");
        assert_eq!(parsed.tree.count(NodeKind::Variable), 1);
        assert_eq!(messages(&parsed), vec!["Expected variable end delimiter"]);
        assert_matches!(parsed.diagnostics[0].error, SyntaxError::MissingVariableEnd);
        assert_eq!(parsed.diagnostics[0].offset, 11);
    }

    #[test]
    fn test_missing_block_end_resyncs() {
        let (_, parsed) = parse("{% if x y z %}ok{% endif %}");
        assert_eq!(messages(&parsed), vec!["Expected block end delimiter"]);
        assert_eq!(parsed.tree.count(NodeKind::IfBlock), 1);
        assert_eq!(parsed.tree.count(NodeKind::EndTag), 1);
        assert_eq!(parsed.tree.count(NodeKind::Error), 1);
    }

    #[test]
    fn test_unclosed_block_reports_opener() {
        let (_, parsed) = parse("a{% for x in y %}{{ x }}");
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_matches!(parsed.diagnostics[0].error, SyntaxError::UnclosedBlock);
        assert_eq!(parsed.diagnostics[0].offset, 1);
        assert_eq!(
            parsed.diagnostics[0].message,
            "Unclosed 'for' block, expected 'endfor'"
        );
        assert_eq!(parsed.tree.count(NodeKind::ForBlock), 1);
    }

    #[test]
    fn test_inner_unclosed_block_closed_by_outer_end() {
        let (_, parsed) = parse("{% if a %}{% for x in y %}{% endif %}");
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(
            parsed.diagnostics[0].message,
            "Unclosed 'for' block, expected 'endfor'"
        );

        let tree = &parsed.tree;
        let ifs = tree.find_all(NodeKind::IfBlock);
        assert_eq!(
            child_kinds(&parsed, ifs[0]),
            vec![NodeKind::VariableReference, NodeKind::ForBlock, NodeKind::EndTag]
        );
    }

    #[test]
    fn test_stray_end_tag() {
        let (_, parsed) = parse("x{% endfor %}y");
        assert_eq!(
            messages(&parsed),
            vec!["Unexpected 'endfor' without a matching opening tag"]
        );
        assert_eq!(parsed.tree.count(NodeKind::GenericBlock), 1);
        assert_eq!(parsed.tree.count(NodeKind::Text), 2);
    }

    #[test]
    fn test_raw_block() {
        let (stream, parsed) = parse("{% raw %}{{ not_a_var }}{% endraw %}");
        let tree = &parsed.tree;
        assert!(parsed.diagnostics.is_empty());

        let raws = tree.find_all(NodeKind::RawBlock);
        assert_eq!(raws.len(), 1);
        assert_eq!(tree.count(NodeKind::Variable), 0);
        let text = tree.first_child_of_kind(raws[0], NodeKind::Text).unwrap();
        assert_eq!(tree.node_text(text, stream.source()), "{{ not_a_var }}");
    }

    #[test]
    fn test_macro_with_defaults() {
        let (_, parsed) =
            parse("{% macro input(name, value='', type='text') %}<input>{% endmacro %}");
        let tree = &parsed.tree;
        assert!(parsed.diagnostics.is_empty());

        let macros = tree.find_all(NodeKind::MacroBlock);
        assert_eq!(macros.len(), 1);
        let params = tree.first_child_of_kind(macros[0], NodeKind::ParameterList).unwrap();
        assert_eq!(tree.child_nodes(params).count(), 3);
        assert_eq!(tree.count(NodeKind::StringLiteral), 2);
    }

    #[test]
    fn test_macro_parameter_errors() {
        let (_, parsed) = parse("{% macro m(a b) %}{% endmacro %}");
        assert_eq!(
            messages(&parsed),
            vec!["Expected ',' or ')'", "Expected ')'", "Expected block end delimiter"]
        );
        assert_eq!(parsed.tree.count(NodeKind::MacroBlock), 1);
    }

    #[test]
    fn test_include_modifiers() {
        let (_, parsed) = parse("{% include 'header.html' ignore missing without context %}");
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.tree.count(NodeKind::IncludeBlock), 1);

        let (_, parsed) = parse("{% include 'a.html' ignore %}");
        assert_eq!(messages(&parsed), vec!["Expected 'missing'"]);
    }

    #[test]
    fn test_imports() {
        let (_, parsed) = parse(
            "{% import 'forms.html' as forms %}{% from 'macros.html' import field as f, button with context %}",
        );
        let tree = &parsed.tree;
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(tree.count(NodeKind::ImportBlock), 1);
        assert_eq!(tree.count(NodeKind::FromImportBlock), 1);
        assert_eq!(tree.count(NodeKind::ImportName), 2);

        let (_, parsed) = parse("{% from 'macros.html' field %}");
        assert_eq!(messages(&parsed)[0], "Expected 'import'");
    }

    #[test]
    fn test_set_forms() {
        let (_, parsed) = parse("{% set a, b = 1, 2 %}{% set ns.found = true %}{% set body %}");
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(parsed.tree.count(NodeKind::SetBlock), 3);
        assert_eq!(parsed.tree.count(NodeKind::TargetList), 3);
    }

    #[test]
    fn test_for_with_filter_and_recursive() {
        let (_, parsed) =
            parse("{% for k, v in data.items() if v is not none recursive %}{{ k }}{% else %}-{% endfor %}");
        let tree = &parsed.tree;
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(tree.count(NodeKind::ConditionalExpression), 0);
        assert_eq!(tree.count(NodeKind::IsExpression), 1);
        assert_eq!(tree.count(NodeKind::NoneLiteral), 1);

        let fors = tree.find_all(NodeKind::ForBlock);
        assert_eq!(
            child_kinds(&parsed, fors[0]),
            vec![
                NodeKind::TargetList,
                NodeKind::FunctionCall,
                NodeKind::IsExpression,
                NodeKind::Variable,
                NodeKind::ElseBlock,
                NodeKind::EndTag,
            ]
        );
    }

    #[test]
    fn test_trans_pluralize() {
        let (_, parsed) = parse(
            "{% trans count=users|length %}One user{% pluralize %}{{ count }} users{% endtrans %}",
        );
        let tree = &parsed.tree;
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let trans = tree.find_all(NodeKind::TransBlock);
        assert_eq!(trans.len(), 1);
        assert!(tree.first_child_of_kind(trans[0], NodeKind::PluralizeBlock).is_some());
        assert_eq!(tree.count(NodeKind::KeywordArgument), 1);
        assert_eq!(tree.count(NodeKind::FilterExpression), 1);
    }

    #[test]
    fn test_filter_arguments_and_chain() {
        let (_, parsed) = parse("{{ items | join(', ') | truncate(10, end='...') }}");
        let tree = &parsed.tree;
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(tree.count(NodeKind::FilterExpression), 2);
        assert_eq!(tree.count(NodeKind::ArgumentList), 2);
        assert_eq!(tree.count(NodeKind::KeywordArgument), 1);

        let (_, parsed) = parse("{{ x | }}");
        assert_eq!(messages(&parsed), vec!["Expected filter name"]);
    }

    #[test]
    fn test_power_is_right_associative() {
        let (_, parsed) = parse("{{ a ** b ** c }}");
        let tree = &parsed.tree;
        let powers = tree.find_all(NodeKind::PowerExpression);
        assert_eq!(powers.len(), 2);
        // The outer power holds `a` and the inner power
        assert_eq!(
            child_kinds(&parsed, powers[0]),
            vec![NodeKind::VariableReference, NodeKind::PowerExpression]
        );
    }

    #[test]
    fn test_arithmetic_is_left_associative() {
        let (_, parsed) = parse("{{ a - b + c ~ d * e }}");
        let tree = &parsed.tree;
        let sums = tree.find_all(NodeKind::ArithmeticExpression);
        assert_eq!(sums.len(), 3);
        assert_eq!(
            child_kinds(&parsed, sums[0]),
            vec![NodeKind::ArithmeticExpression, NodeKind::TermExpression]
        );
    }

    #[test]
    fn test_literals_and_groups() {
        let (_, parsed) = parse("{{ {'a': [1, 2.5, (3,)], 'b': (x), 'c': ()} }}");
        let tree = &parsed.tree;
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(tree.count(NodeKind::DictLiteral), 1);
        assert_eq!(tree.count(NodeKind::DictEntry), 3);
        assert_eq!(tree.count(NodeKind::ListLiteral), 1);
        assert_eq!(tree.count(NodeKind::TupleLiteral), 2);
        assert_eq!(tree.count(NodeKind::ParenthesizedExpression), 1);
        assert_eq!(tree.count(NodeKind::NumberLiteral), 3);
    }

    #[test]
    fn test_group_errors() {
        let (_, parsed) = parse("{{ [1, 2 }}");
        assert_eq!(messages(&parsed), vec!["Expected ',' or ']'", "Expected ']'"]);

        let (_, parsed) = parse("{{ {'a' 1} }}");
        assert_eq!(messages(&parsed)[0], "Expected ':'");

        let (_, parsed) = parse("{{ (a }}");
        assert_eq!(messages(&parsed), vec!["Expected ')'"]);
    }

    #[test]
    fn test_logic_and_conditional() {
        let (_, parsed) =
            parse("{{ 'yes' if a and not b or c not in d else 'no' }}");
        let tree = &parsed.tree;
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(tree.count(NodeKind::ConditionalExpression), 1);
        assert_eq!(tree.count(NodeKind::OrExpression), 1);
        assert_eq!(tree.count(NodeKind::AndExpression), 1);
        assert_eq!(tree.count(NodeKind::NotExpression), 1);
        assert_eq!(tree.count(NodeKind::ComparisonExpression), 1);
    }

    #[test]
    fn test_empty_variable_and_bad_token() {
        let (_, parsed) = parse("{{ }}");
        assert_eq!(messages(&parsed), vec!["Expected expression"]);
        assert_eq!(parsed.tree.count(NodeKind::Error), 1);

        let (_, parsed) = parse("{{ a $ }}");
        assert!(parsed.diagnostics.len() >= 1);
        assert_eq!(parsed.tree.count(NodeKind::Variable), 1);
    }

    #[test]
    fn test_comments() {
        let (_, parsed) = parse("a{# note {{ x }} #}b");
        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.tree.count(NodeKind::Comment), 1);
        assert_eq!(parsed.tree.count(NodeKind::Variable), 0);

        let (_, parsed) = parse("a{# open");
        assert_eq!(messages(&parsed), vec!["Expected comment end delimiter"]);
    }

    #[test]
    fn test_custom_delimiters_and_line_forms() {
        let config = DelimiterConfig::with_tags(("<%", "%>"), ("[[", "]]"))
            .with_line_prefixes("%%", "##");
        let source = "%% for x in xs\n[[ x ]]\n## skip\n%% endfor\n<% if ok %>y<% endif %>";
        let (_, parsed) = parse_with(source, &config);
        let tree = &parsed.tree;

        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let fors = tree.find_all(NodeKind::ForBlock);
        assert_eq!(fors.len(), 1);
        assert!(tree
            .descendants(fors[0])
            .iter()
            .any(|id| tree.kind(*id) == NodeKind::Comment));
        assert_eq!(tree.count(NodeKind::IfBlock), 1);
    }

    #[test]
    fn test_line_statement_at_end_of_input() {
        let config = DelimiterConfig::default().with_line_prefixes("%%", "");
        let (_, parsed) = parse_with("%% set x = 1", &config);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        assert_eq!(parsed.tree.count(NodeKind::SetBlock), 1);
    }

    #[test]
    fn test_bare_line_prefix_at_end_of_input() {
        let config = DelimiterConfig::default().with_line_prefixes("%%", "##");

        for source in ["%%", "x\n%%"] {
            let (stream, parsed) = parse_with(source, &config);
            assert!(parsed.diagnostics.is_empty(), "{:?}: {:?}", source, messages(&parsed));
            assert_eq!(stream.end_state(), LexState::LineStatement);
            assert_eq!(parsed.tree.count(NodeKind::GenericBlock), 1);
        }

        let (_, parsed) = parse_with("##", &config);
        assert!(parsed.diagnostics.is_empty(), "{:?}", messages(&parsed));
        assert_eq!(parsed.tree.count(NodeKind::Comment), 1);

        // A block tag cut off at the same place still reports
        let (_, parsed) = parse_with("{%", &config);
        assert_eq!(messages(&parsed), vec!["Expected block end delimiter"]);
    }

    #[test]
    fn test_tree_spans_input() {
        let source = "a {{ b }} {% if c %}d{% endif %} {# e #}  ";
        let (_, parsed) = parse(source);
        let root = parsed.tree.node(parsed.tree.root());
        assert_eq!(root.kind, NodeKind::Template);
        assert_eq!((root.start, root.end), (0, source.len()));

        let (_, empty) = parse("");
        assert_eq!(empty.tree.kind(empty.tree.root()), NodeKind::Template);
        assert!(empty.diagnostics.is_empty());
    }

    #[test]
    fn test_deep_nesting_is_bounded() {
        let depth = MAX_PARSE_DEPTH + 20;
        let source = format!("{{{{ {}x{} }}}}", "(".repeat(depth), ")".repeat(depth));
        let (_, parsed) = parse(&source);

        assert!(parsed
            .diagnostics
            .iter()
            .any(|d| d.error == SyntaxError::MaxRecursionDepth));
        assert!(parsed.statistics.max_depth_reached <= MAX_PARSE_DEPTH);
    }

    #[test]
    fn test_depth_limit_reported_once() {
        let depth = MAX_PARSE_DEPTH * 4;
        let depth_errors = |parsed: &ParsedTemplate| {
            parsed
                .diagnostics
                .iter()
                .filter(|d| d.error == SyntaxError::MaxRecursionDepth)
                .count()
        };

        let parens = format!("{{{{ {}x{} }}}}", "(".repeat(depth), ")".repeat(depth));
        let (_, parsed) = parse(&parens);
        assert_eq!(depth_errors(&parsed), 1);

        let blocks = format!("{}{}", "{% if x %}".repeat(depth), "{% endif %}".repeat(depth));
        let (_, parsed) = parse(&blocks);
        assert_eq!(depth_errors(&parsed), 1);
        assert!(parsed.statistics.max_depth_reached <= MAX_PARSE_DEPTH);
    }

    #[test]
    fn test_never_panics_on_malformed_input() {
        let inputs = [
            "{%", "%}", "{{", "}}", "{#", "{% for %}", "{% for in %}", "{% if %}{% elif %}",
            "{{ a.( }}", "{{ a[ }}", "{{ f(a=, ) }}", "{% macro %}", "{% from %}",
            "{% endif %}{% else %}", "{{ (((( }}", "{{ {'a': }}", "{% raw %}", "{{ 1 ** }}",
            "{% set %}", "{% with a = %}{% endwith %}", "{{ a | b( }}", "{% trans x, %}",
            "{{ -- - + x }}", "{{ a is }}", "{{ not }}", "{% include %}",
        ];
        for input in inputs {
            let (_, parsed) = parse(input);
            let root = parsed.tree.node(parsed.tree.root());
            assert_eq!((root.start, root.end), (0, input.len()), "input {:?}", input);
        }

        // Every prefix of a well-formed template
        let full = "{% for a in b %}{{ a.c[0] | d(1, e=2) }}{% if a %}x{% else %}y{% endif %}{% endfor %}";
        for end in 0..=full.len() {
            let (_, parsed) = parse(&full[..end]);
            assert_eq!(parsed.tree.node(parsed.tree.root()).end, end);
        }
    }

    #[test]
    fn test_diagnostic_cap() {
        let source = "{{ ) }}".repeat(MAX_DIAGNOSTICS + 5);
        let (_, parsed) = parse(&source);
        assert_eq!(parsed.diagnostics.len(), MAX_DIAGNOSTICS);
        assert!(parsed.statistics.diagnostics_suppressed >= 5);
    }
}
