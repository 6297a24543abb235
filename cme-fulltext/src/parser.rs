//! Recursive-descent parser: `or_expr := and_expr (OR and_expr)*`,
//! `and_expr := not_expr (AND? not_expr)*`, `not_expr := NOT? primary`,
//! `primary := '(' or_expr ')' | word | phrase`. Implicit AND between
//! adjacent terms, explicit `AND`/`OR`/`NOT` keywords, `(...)` grouping.

use cme_core::errors::{CortexResult, SearchError};

use crate::ast::Node;
use crate::lexer::{tokenize, Spanned, Token};

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

pub fn parse(input: &str) -> CortexResult<Node> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.parse_or()?;

    if let Some(leftover) = parser.peek() {
        return Err(cme_core::CortexError::SearchError(SearchError::UnbalancedParens {
            position: leftover.position,
        }));
    }
    Ok(node)
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_or(&mut self) -> CortexResult<Node> {
        let mut terms = vec![self.parse_and()?];
        while matches!(self.peek().map(|s| &s.token), Some(Token::Or)) {
            self.advance();
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Node::Or(terms) })
    }

    fn parse_and(&mut self) -> CortexResult<Node> {
        let mut terms = vec![self.parse_not()?];
        loop {
            match self.peek().map(|s| &s.token) {
                Some(Token::And) => {
                    self.advance();
                    terms.push(self.parse_not()?);
                }
                Some(Token::Or) | Some(Token::RParen) | None => break,
                Some(_) => terms.push(self.parse_not()?),
            }
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Node::And(terms) })
    }

    fn parse_not(&mut self) -> CortexResult<Node> {
        if matches!(self.peek().map(|s| &s.token), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_primary()?;
            Ok(Node::Not(Box::new(inner)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> CortexResult<Node> {
        match self.advance() {
            Some(Spanned { token: Token::Word(w), .. }) => Ok(Node::Word(w)),
            Some(Spanned { token: Token::Phrase(p), .. }) => Ok(Node::Phrase(p)),
            Some(Spanned { token: Token::LParen, position }) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Spanned { token: Token::RParen, .. }) => Ok(inner),
                    _ => Err(cme_core::CortexError::SearchError(SearchError::UnbalancedParens {
                        position,
                    })),
                }
            }
            Some(Spanned { position, .. }) => {
                Err(cme_core::CortexError::SearchError(SearchError::UnbalancedParens { position }))
            }
            None => Err(cme_core::CortexError::SearchError(SearchError::NoCriteria)),
        }
    }
}
