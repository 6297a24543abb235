//! Boolean/phrase full-text query parser (C3). Produces an AST from a raw
//! user query string, which `cme-storage::queries::fts_ops` compiles to an
//! FTS5 `MATCH` expression. Hand-written recursive descent — the grammar
//! is small enough that pulling in a parser-combinator crate would be
//! more ceremony than the problem warrants.

mod ast;
mod lexer;
mod parser;

pub use ast::Node;
pub use parser::parse;

use cme_core::errors::{CortexResult, SearchError};

/// A parsed query: the compiled FTS5 `MATCH` expression plus the set of
/// positive (non-`NOT`) terms, for highlighting.
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub match_expr: String,
    pub matched_terms: Vec<String>,
}

/// Parse and validate `raw` against `max_chars`, returning the compiled
/// FTS5 expression and the terms to highlight.
pub fn parse_query(raw: &str, max_chars: usize) -> CortexResult<ParsedQuery> {
    let cleaned = strip_control_chars(raw);

    if cleaned.trim().is_empty() {
        return Err(cme_core::CortexError::SearchError(SearchError::EmptyQuery));
    }
    if cleaned.chars().count() > max_chars {
        return Err(cme_core::CortexError::SearchError(SearchError::QueryTooLong {
            len: cleaned.chars().count(),
            max: max_chars,
        }));
    }

    let node = parse(&cleaned)?;
    let match_expr = ast::compile(&node);
    let matched_terms = ast::positive_terms(&node);

    Ok(ParsedQuery {
        match_expr,
        matched_terms,
    })
}

/// Remove ASCII control characters other than plain whitespace (space,
/// tab), per the parser's input-sanitization contract.
fn strip_control_chars(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() || *c == ' ' || *c == '\t')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_rejected() {
        let err = parse_query("   ", 1000);
        assert!(matches!(
            err,
            Err(cme_core::CortexError::SearchError(SearchError::EmptyQuery))
        ));
    }

    #[test]
    fn over_length_query_rejected() {
        let long = "a".repeat(2000);
        let err = parse_query(&long, 1000);
        assert!(matches!(
            err,
            Err(cme_core::CortexError::SearchError(SearchError::QueryTooLong { .. }))
        ));
    }

    #[test]
    fn implicit_and_between_bare_words() {
        let parsed = parse_query("rust sqlite", 1000).unwrap();
        assert_eq!(parsed.match_expr, "rust AND sqlite");
        assert_eq!(parsed.matched_terms, vec!["rust", "sqlite"]);
    }

    #[test]
    fn explicit_or() {
        let parsed = parse_query("rust OR sqlite", 1000).unwrap();
        assert_eq!(parsed.match_expr, "rust OR sqlite");
    }

    #[test]
    fn not_excludes_term_from_matched_terms() {
        let parsed = parse_query("rust NOT sqlite", 1000).unwrap();
        assert_eq!(parsed.match_expr, "rust NOT sqlite");
        assert_eq!(parsed.matched_terms, vec!["rust".to_string()]);
    }

    #[test]
    fn phrase_query_is_preserved() {
        let parsed = parse_query("\"cognitive memory\"", 1000).unwrap();
        assert_eq!(parsed.match_expr, "\"cognitive memory\"");
        assert_eq!(parsed.matched_terms, vec!["cognitive memory".to_string()]);
    }

    #[test]
    fn grouping_with_parens() {
        let parsed = parse_query("(rust OR go) AND sqlite", 1000).unwrap();
        assert_eq!(parsed.match_expr, "(rust OR go) AND sqlite");
    }

    #[test]
    fn unbalanced_parens_rejected() {
        let err = parse_query("(rust OR go", 1000);
        assert!(matches!(
            err,
            Err(cme_core::CortexError::SearchError(SearchError::UnbalancedParens { .. }))
        ));
    }

    #[test]
    fn unterminated_phrase_rejected() {
        let err = parse_query("\"rust", 1000);
        assert!(matches!(
            err,
            Err(cme_core::CortexError::SearchError(SearchError::UnterminatedPhrase { .. }))
        ));
    }

    #[test]
    fn identifier_escapes_cpp_and_csharp() {
        let parsed = parse_query("c++ developer", 1000).unwrap();
        assert!(parsed.match_expr.contains("cplusplus"));
        let parsed = parse_query("c# developer", 1000).unwrap();
        assert!(parsed.match_expr.contains("csharp"));
    }
}
