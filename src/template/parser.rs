//! Template markup parser.
//!
//! The grammar accepts each piece of markup on its own; block structure
//! (`if`/`endif`, `for`/`endfor`, ...) and filter names are checked
//! afterwards by walking the parsed nodes in order.

use pest::{
    error::{Error, ErrorVariant, InputLocation, LineColLocation},
    iterators::Pair,
    Parser,
};
use pest_derive::Parser;

use super::TemplateSyntaxError;

#[derive(Parser)]
#[grammar = "template/grammar.pest"]
struct TemplateParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Checks `source` for well-formed markup without evaluating it.
///
/// Files named by `include`, `extends`, `import` and `ssi` are not opened.
pub fn check_syntax(source: &str) -> Result<(), TemplateSyntaxError> {
    if source.is_empty() {
        return Ok(());
    }

    let mut pairs = TemplateParser::parse(Rule::template, source)
        .map_err(|e| convert_parse_error(e, source))?;
    let Some(template) = pairs.next() else {
        return Ok(());
    };

    let mut blocks = BlockStack::default();
    for node in template.into_inner() {
        check_filters(node.clone())?;
        if node.as_rule() == Rule::tag {
            blocks.visit(node)?;
        }
    }
    blocks.finish()
}

// ============================================================================
// BLOCK STRUCTURE
// ============================================================================

/// Block tags, with the branch tags each accepts before its closer. The
/// last branch listed for a block is final: nothing may follow it.
const BLOCKS: &[(&str, &[&str])] = &[
    ("if", &["elif", "else"]),
    ("for", &["empty"]),
    ("ifequal", &["else"]),
    ("ifnotequal", &["else"]),
    ("ifchanged", &["else"]),
    ("with", &[]),
    ("block", &[]),
    ("filter", &[]),
    ("autoescape", &[]),
    ("spaceless", &[]),
    ("comment", &[]),
    ("macro", &[]),
    ("verbatim", &[]),
];

/// Every tag name the grammar knows, for telling a malformed tag from an
/// unknown one.
const KNOWN_TAGS: &[&str] = &[
    "if", "elif", "else", "for", "empty", "with", "block", "endblock", "filter", "ifequal",
    "ifnotequal", "ifchanged", "autoescape", "spaceless", "comment", "macro", "set", "include",
    "extends", "import", "ssi", "cycle", "firstof", "now", "lorem", "templatetag",
];

fn block_named(name: &str) -> Option<(&'static str, &'static [&'static str])> {
    BLOCKS.iter().copied().find(|(block, _)| *block == name)
}

/// The block a branch tag belongs to when it appears out of place.
fn owner_of(branch: &str) -> &'static str {
    BLOCKS
        .iter()
        .find(|(_, branches)| branches.contains(&branch))
        .map_or("if", |(block, _)| *block)
}

#[derive(Debug)]
struct OpenBlock {
    name: &'static str,
    branches: &'static [&'static str],
    /// Set once the final branch (`else`, `empty`) has been seen.
    closed_branches: bool,
    line: usize,
    column: usize,
}

#[derive(Debug, Default)]
struct BlockStack {
    open: Vec<OpenBlock>,
}

impl BlockStack {
    fn visit(&mut self, tag: Pair<'_, Rule>) -> Result<(), TemplateSyntaxError> {
        let (line, column) = tag.line_col();
        let Some(body) = tag
            .into_inner()
            .find(|p| !matches!(p.as_rule(), Rule::open_tag | Rule::close_tag))
        else {
            return Ok(());
        };

        let opened = match body.as_rule() {
            Rule::if_tag => "if",
            Rule::for_tag => "for",
            Rule::with_tag => "with",
            Rule::block_tag => "block",
            Rule::filter_tag => "filter",
            Rule::ifequal_tag => "ifequal",
            Rule::ifnotequal_tag => "ifnotequal",
            Rule::ifchanged_tag => "ifchanged",
            Rule::autoescape_tag => "autoescape",
            Rule::spaceless_tag => "spaceless",
            Rule::comment_tag => "comment",
            Rule::macro_tag => "macro",
            Rule::elif_tag => return self.branch("elif", line, column),
            Rule::else_tag => return self.branch("else", line, column),
            Rule::empty_tag => return self.branch("empty", line, column),
            Rule::endblock_tag => return self.close("endblock", line, column),
            Rule::end_tag => return self.close(body.as_str(), line, column),
            Rule::unknown_tag => {
                let name = body
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::identifier)
                    .map(|p| p.as_str())
                    .unwrap_or_default();
                let message = if name == "verbatim" {
                    "'verbatim' tag is never closed".to_string()
                } else if KNOWN_TAGS.contains(&name) {
                    format!("malformed '{name}' tag")
                } else {
                    format!("Tag '{name}' does not exist")
                };
                return Err(TemplateSyntaxError::new(line, column, message));
            }
            _ => return Ok(()),
        };

        if let Some((name, branches)) = block_named(opened) {
            self.open.push(OpenBlock {
                name,
                branches,
                closed_branches: false,
                line,
                column,
            });
        }
        Ok(())
    }

    fn branch(&mut self, tag: &str, line: usize, column: usize) -> Result<(), TemplateSyntaxError> {
        match self.open.last_mut() {
            Some(open) if open.branches.contains(&tag) && !open.closed_branches => {
                open.closed_branches = open.branches.last() == Some(&tag);
                Ok(())
            }
            Some(open) if open.branches.contains(&tag) => Err(TemplateSyntaxError::new(
                line,
                column,
                format!("'{tag}' after the final branch of '{}'", open.name),
            )),
            _ => Err(TemplateSyntaxError::new(
                line,
                column,
                format!("'{tag}' without a matching '{}'", owner_of(tag)),
            )),
        }
    }

    fn close(&mut self, tag: &str, line: usize, column: usize) -> Result<(), TemplateSyntaxError> {
        let Some((block, _)) = tag.strip_prefix("end").and_then(block_named) else {
            return Err(TemplateSyntaxError::new(
                line,
                column,
                format!("Tag '{tag}' does not exist"),
            ));
        };
        match self.open.pop() {
            Some(open) if open.name == block => Ok(()),
            Some(open) => Err(TemplateSyntaxError::new(
                line,
                column,
                format!(
                    "'{tag}' closes '{}' opened at line {}, col {}",
                    open.name, open.line, open.column
                ),
            )),
            None => Err(TemplateSyntaxError::new(
                line,
                column,
                format!("'{tag}' without a matching '{block}'"),
            )),
        }
    }

    fn finish(mut self) -> Result<(), TemplateSyntaxError> {
        match self.open.pop() {
            Some(open) => Err(TemplateSyntaxError::new(
                open.line,
                open.column,
                format!("'{}' tag is never closed", open.name),
            )),
            None => Ok(()),
        }
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Filters available to step templates: the engine's built-ins plus
/// `expanduser`.
const FILTERS: &[&str] = &[
    "add", "addslashes", "capfirst", "center", "cut", "date", "default", "default_if_none",
    "divisibleby", "e", "escape", "escapejs", "expanduser", "first", "float", "floatformat",
    "get_digit", "integer", "iriencode", "join", "last", "length", "length_is", "linebreaks",
    "linebreaksbr", "linenumbers", "ljust", "lower", "make_list", "phone2numeric", "pluralize",
    "random", "removetags", "rjust", "safe", "slice", "split", "stringformat", "striptags",
    "time", "title", "truncatechars", "truncatechars_html", "truncatewords",
    "truncatewords_html", "upper", "urlencode", "urlize", "urlizetrunc", "wordcount", "wordwrap",
    "yesno",
];

fn check_filters(node: Pair<'_, Rule>) -> Result<(), TemplateSyntaxError> {
    for pair in node.into_inner().flatten() {
        if pair.as_rule() != Rule::filter_call {
            continue;
        }
        let Some(name) = pair.into_inner().find(|p| p.as_rule() == Rule::identifier) else {
            continue;
        };
        if !FILTERS.contains(&name.as_str()) {
            let (line, column) = name.line_col();
            return Err(TemplateSyntaxError::new(
                line,
                column,
                format!("Filter '{}' does not exist", name.as_str()),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// ERROR CONVERSION
// ============================================================================

fn convert_parse_error(error: Error<Rule>, source: &str) -> TemplateSyntaxError {
    let (line, column) = match error.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    let offset = match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    let expected = match &error.variant {
        ErrorVariant::ParsingError { positives, .. } => positives.as_slice(),
        ErrorVariant::CustomError { .. } => &[],
    };
    let found = describe_at(source, offset);

    let message = if expected.contains(&Rule::close_output) {
        format!("unexpected {found}, expected '}}}}'")
    } else if expected.contains(&Rule::close_tag) {
        format!("unexpected {found}, expected '%}}'")
    } else if expected.contains(&Rule::close_comment) {
        "comment is never closed, expected '#}'".to_string()
    } else if expected
        .iter()
        .any(|rule| matches!(rule, Rule::expression | Rule::primary | Rule::literal | Rule::variable | Rule::identifier))
    {
        format!("unexpected {found}, expected an expression")
    } else {
        format!("unexpected {found}")
    };

    TemplateSyntaxError::new(line, column, message)
}

/// The token at `offset`, for error messages.
fn describe_at(source: &str, offset: usize) -> String {
    let rest = source.get(offset..).unwrap_or_default();
    let word: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if !word.is_empty() {
        return format!("'{word}'");
    }
    match rest.chars().next() {
        Some(c) if !c.is_whitespace() => format!("'{c}'"),
        Some(_) => "whitespace".to_string(),
        None => "end of template".to_string(),
    }
}
