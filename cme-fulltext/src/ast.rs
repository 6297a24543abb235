//! The parsed query tree, and its compilation to an FTS5 `MATCH`
//! expression plus the positive-term list used for highlighting.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Word(String),
    Phrase(String),
    Not(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
}

/// Compile the tree to an FTS5 `MATCH` expression string.
pub fn compile(node: &Node) -> String {
    match node {
        Node::Word(w) => w.clone(),
        Node::Phrase(p) => format!("\"{}\"", p.replace('"', "\"\"")),
        Node::Not(inner) => format!("NOT {}", compile_grouped(inner)),
        Node::And(terms) => compile_chain(terms, "AND"),
        Node::Or(terms) => terms.iter().map(compile_grouped).collect::<Vec<_>>().join(" OR "),
    }
}

/// FTS5's `NOT` is a binary operator (`a NOT b`), not unary, so a `Not`
/// node immediately following another term in an `AND` chain is rendered
/// as `a NOT b` rather than `a AND NOT b`.
fn compile_chain(terms: &[Node], joiner: &str) -> String {
    let mut out = String::new();
    for (idx, term) in terms.iter().enumerate() {
        if idx == 0 {
            out.push_str(&compile_grouped(term));
            continue;
        }
        if let Node::Not(inner) = term {
            out.push_str(" NOT ");
            out.push_str(&compile_grouped(inner));
        } else {
            out.push(' ');
            out.push_str(joiner);
            out.push(' ');
            out.push_str(&compile_grouped(term));
        }
    }
    out
}

fn compile_grouped(node: &Node) -> String {
    match node {
        Node::And(_) | Node::Or(_) => format!("({})", compile(node)),
        _ => compile(node),
    }
}

/// Every `Word`/`Phrase` term not under a `Not`, in left-to-right order —
/// the set a caller should highlight in result snippets.
pub fn positive_terms(node: &Node) -> Vec<String> {
    let mut out = Vec::new();
    collect_positive(node, &mut out);
    out
}

fn collect_positive(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::Word(w) => out.push(w.clone()),
        Node::Phrase(p) => out.push(p.clone()),
        Node::Not(_) => {}
        Node::And(terms) | Node::Or(terms) => {
            for t in terms {
                collect_positive(t, out);
            }
        }
    }
}
