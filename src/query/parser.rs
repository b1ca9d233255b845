//! Query parser for converting query strings into syntax trees.
//!
//! The grammar, loosely:
//!
//! ```text
//! query    := or ( "=>" "[" KNN ... "]" )?
//! or       := and ( "|" and )*
//! and      := unary unary*                      implicit AND by juxtaposition
//! unary    := "-" unary | primary
//! primary  := "(" or ")" | "*" | "@" field ":" body | term
//! body     := "(" or ")" | "[" bound bound "]" | "{" tag ( "|" tag )* "}" | "*" | term
//! ```
//!
//! Terms carrying a leading or trailing `*` become affix nodes. `$name`
//! references are substituted from the supplied parameter map during parsing.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{FalxError, Result};
use crate::query::ast::{AstNode, KnnNode, LogicOp, TagValue};
use crate::query::params::QueryParams;

/// Parse a query string into a syntax tree.
///
/// Returns an error for syntactically invalid or empty queries.
pub fn parse_query(input: &str, params: &QueryParams) -> Result<AstNode> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(FalxError::parse("empty query"));
    }
    let mut parser = QueryStringParser::new(tokens, params);
    let node = parser.parse()?;
    parser.expect_end()?;
    Ok(node)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Pipe,
    Minus,
    Arrow,
    Colon,
    Star,
    /// `@name`
    Field(String),
    /// `$name`
    Param(String),
    Word(String),
    Quoted(String),
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '*' | '.' | '+')
}

fn read_ident(chars: &mut Peekable<Chars>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || matches!(c, '_' | '.' | '$') {
            ident.push(c);
            chars.next();
        } else {
            break;
        }
    }
    ident
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '{' => {
                chars.next();
                tokens.push(Token::LBrace);
            }
            '}' => {
                chars.next();
                tokens.push(Token::RBrace);
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            ':' => {
                chars.next();
                tokens.push(Token::Colon);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token::Arrow);
                } else {
                    return Err(FalxError::parse("expected '>' after '='"));
                }
            }
            '@' => {
                chars.next();
                let ident = read_ident(&mut chars);
                if ident.is_empty() {
                    return Err(FalxError::parse("expected field name after '@'"));
                }
                tokens.push(Token::Field(ident));
            }
            '$' => {
                chars.next();
                let ident = read_ident(&mut chars);
                if ident.is_empty() {
                    return Err(FalxError::parse("expected parameter name after '$'"));
                }
                tokens.push(Token::Param(ident));
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => value.push(c),
                        None => return Err(FalxError::parse("unterminated quoted term")),
                    }
                }
                tokens.push(Token::Quoted(value));
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if is_word_char(c) {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if word == "*" {
                    tokens.push(Token::Star);
                } else {
                    tokens.push(Token::Word(word));
                }
            }
            c => {
                return Err(FalxError::parse(format!("unexpected character '{c}'")));
            }
        }
    }

    Ok(tokens)
}

/// Classify a raw word by its star affixes.
fn classify_word(word: &str) -> Result<AstNode> {
    let leading = word.starts_with('*');
    let trailing = word.len() > 1 && word.ends_with('*');
    let core = word.trim_matches('*');
    if core.is_empty() {
        return Err(FalxError::parse(format!("invalid term '{word}'")));
    }
    if core.contains('*') {
        return Err(FalxError::parse(format!(
            "'*' is only allowed at the ends of a term: '{word}'"
        )));
    }

    Ok(match (leading, trailing) {
        (true, true) => AstNode::Infix(core.to_string()),
        (true, false) => AstNode::Suffix(core.to_string()),
        (false, true) => AstNode::Prefix(core.to_string()),
        (false, false) => AstNode::Term(core.to_string()),
    })
}

fn classify_tag(word: &str) -> Result<TagValue> {
    Ok(match classify_word(word)? {
        AstNode::Term(s) => TagValue::Term(s),
        AstNode::Prefix(s) => TagValue::Prefix(s),
        AstNode::Suffix(s) => TagValue::Suffix(s),
        AstNode::Infix(s) => TagValue::Infix(s),
        _ => unreachable!(),
    })
}

struct QueryStringParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    params: &'a QueryParams,
}

impl<'a> QueryStringParser<'a> {
    fn new(tokens: Vec<Token>, params: &'a QueryParams) -> Self {
        QueryStringParser {
            tokens,
            pos: 0,
            params,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(FalxError::parse(format!(
                "expected {what}, found {token:?}"
            ))),
            None => Err(FalxError::parse(format!(
                "expected {what}, found end of query"
            ))),
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(FalxError::parse(format!(
                "trailing input after query: {token:?}"
            ))),
        }
    }

    fn resolve_text_param(&self, name: &str) -> Result<String> {
        self.params
            .text(name)
            .map(str::to_string)
            .ok_or_else(|| FalxError::parse(format!("unknown text parameter '${name}'")))
    }

    fn parse(&mut self) -> Result<AstNode> {
        let filter = self.parse_or()?;
        if self.peek() == Some(&Token::Arrow) {
            self.next();
            return self.parse_knn_clause(filter);
        }
        Ok(filter)
    }

    fn parse_or(&mut self) -> Result<AstNode> {
        let mut nodes = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Pipe) {
            self.next();
            nodes.push(self.parse_and()?);
        }
        Ok(Self::fold_logical(LogicOp::Or, nodes))
    }

    fn parse_and(&mut self) -> Result<AstNode> {
        let mut nodes = vec![self.parse_unary()?];
        while self.starts_primary() {
            nodes.push(self.parse_unary()?);
        }
        Ok(Self::fold_logical(LogicOp::And, nodes))
    }

    fn starts_primary(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::LParen
                    | Token::Star
                    | Token::Minus
                    | Token::Field(_)
                    | Token::Param(_)
                    | Token::Word(_)
                    | Token::Quoted(_)
            )
        )
    }

    fn fold_logical(op: LogicOp, mut nodes: Vec<AstNode>) -> AstNode {
        if nodes.len() == 1 {
            nodes.pop().unwrap()
        } else {
            AstNode::Logical { op, nodes }
        }
    }

    fn parse_unary(&mut self) -> Result<AstNode> {
        if self.peek() == Some(&Token::Minus) {
            self.next();
            return Ok(AstNode::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<AstNode> {
        match self.next() {
            Some(Token::LParen) => {
                let node = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(node)
            }
            Some(Token::Star) => Ok(AstNode::Star),
            Some(Token::Field(field)) => {
                self.expect(Token::Colon, "':' after field name")?;
                let node = self.parse_field_body()?;
                Ok(AstNode::Field {
                    field,
                    node: Box::new(node),
                })
            }
            Some(Token::Word(word)) => classify_word(&word),
            Some(Token::Quoted(value)) => Ok(AstNode::Term(value)),
            Some(Token::Param(name)) => {
                let value = self.resolve_text_param(&name)?;
                classify_word(&value)
            }
            Some(token) => Err(FalxError::parse(format!("unexpected token {token:?}"))),
            None => Err(FalxError::parse("unexpected end of query")),
        }
    }

    fn parse_field_body(&mut self) -> Result<AstNode> {
        match self.next() {
            Some(Token::LParen) => {
                let node = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(node)
            }
            Some(Token::LBracket) => {
                let lo = self.parse_bound()?;
                let hi = self.parse_bound()?;
                self.expect(Token::RBracket, "']' after range")?;
                Ok(AstNode::Range { lo, hi })
            }
            Some(Token::LBrace) => {
                let mut tags = vec![self.parse_tag_value()?];
                while self.peek() == Some(&Token::Pipe) {
                    self.next();
                    tags.push(self.parse_tag_value()?);
                }
                self.expect(Token::RBrace, "'}' after tag set")?;
                Ok(AstNode::Tags(tags))
            }
            Some(Token::Star) => Ok(AstNode::StarField),
            Some(Token::Word(word)) => classify_word(&word),
            Some(Token::Quoted(value)) => Ok(AstNode::Term(value)),
            Some(Token::Param(name)) => {
                let value = self.resolve_text_param(&name)?;
                classify_word(&value)
            }
            Some(token) => Err(FalxError::parse(format!(
                "unexpected token {token:?} after ':'"
            ))),
            None => Err(FalxError::parse("unexpected end of query after ':'")),
        }
    }

    fn parse_bound(&mut self) -> Result<f64> {
        let negative = if self.peek() == Some(&Token::Minus) {
            self.next();
            true
        } else {
            false
        };

        let word = match self.next() {
            Some(Token::Word(word)) => word,
            Some(token) => {
                return Err(FalxError::parse(format!(
                    "expected range bound, found {token:?}"
                )))
            }
            None => return Err(FalxError::parse("expected range bound, found end of query")),
        };

        let value = match word.as_str() {
            "inf" | "+inf" => f64::INFINITY,
            _ => word
                .parse::<f64>()
                .map_err(|_| FalxError::parse(format!("invalid range bound '{word}'")))?,
        };
        Ok(if negative { -value } else { value })
    }

    fn parse_tag_value(&mut self) -> Result<TagValue> {
        match self.next() {
            Some(Token::Word(word)) => classify_tag(&word),
            Some(Token::Quoted(value)) => Ok(TagValue::Term(value)),
            Some(Token::Param(name)) => {
                let value = self.resolve_text_param(&name)?;
                Ok(TagValue::Term(value))
            }
            Some(token) => Err(FalxError::parse(format!(
                "expected tag value, found {token:?}"
            ))),
            None => Err(FalxError::parse("expected tag value, found end of query")),
        }
    }

    /// Parse `[KNN k @field $vec (EF_RUNTIME n)? (AS alias)?]`.
    fn parse_knn_clause(&mut self, filter: AstNode) -> Result<AstNode> {
        self.expect(Token::LBracket, "'[' after '=>'")?;

        match self.next() {
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("knn") => {}
            _ => return Err(FalxError::parse("expected KNN after '=>['")),
        }

        let limit = match self.next() {
            Some(Token::Word(word)) => word
                .parse::<usize>()
                .map_err(|_| FalxError::parse(format!("invalid KNN limit '{word}'")))?,
            _ => return Err(FalxError::parse("expected KNN limit")),
        };

        let field = match self.next() {
            Some(Token::Field(field)) => field,
            _ => return Err(FalxError::parse("expected @field in KNN clause")),
        };

        let vec = match self.next() {
            Some(Token::Param(name)) => self
                .params
                .vector(&name)
                .map(<[f32]>::to_vec)
                .ok_or_else(|| {
                    FalxError::parse(format!("unknown vector parameter '${name}'"))
                })?,
            _ => return Err(FalxError::parse("expected $vector in KNN clause")),
        };

        let mut ef_runtime = None;
        let mut score_alias = String::new();
        loop {
            match self.next() {
                Some(Token::RBracket) => break,
                Some(Token::Word(word)) if word.eq_ignore_ascii_case("ef_runtime") => {
                    match self.next() {
                        Some(Token::Word(value)) => {
                            ef_runtime = Some(value.parse::<usize>().map_err(|_| {
                                FalxError::parse(format!("invalid EF_RUNTIME '{value}'"))
                            })?);
                        }
                        _ => return Err(FalxError::parse("expected EF_RUNTIME value")),
                    }
                }
                Some(Token::Word(word)) if word.eq_ignore_ascii_case("as") => match self.next() {
                    Some(Token::Word(alias)) => score_alias = alias,
                    _ => return Err(FalxError::parse("expected alias after AS")),
                },
                Some(token) => {
                    return Err(FalxError::parse(format!(
                        "unexpected token {token:?} in KNN clause"
                    )))
                }
                None => return Err(FalxError::parse("unterminated KNN clause")),
            }
        }

        Ok(AstNode::Knn(Box::new(KnnNode {
            limit,
            field,
            vec,
            ef_runtime,
            score_alias,
            filter,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<AstNode> {
        parse_query(input, &QueryParams::default())
    }

    #[test]
    fn test_parse_simple_term() {
        assert_eq!(parse("hello").unwrap(), AstNode::Term("hello".to_string()));
    }

    #[test]
    fn test_parse_implicit_and() {
        let node = parse("hello world").unwrap();
        assert_eq!(
            node,
            AstNode::Logical {
                op: LogicOp::And,
                nodes: vec![
                    AstNode::Term("hello".to_string()),
                    AstNode::Term("world".to_string()),
                ],
            }
        );
    }

    #[test]
    fn test_parse_or() {
        let node = parse("hello | world").unwrap();
        assert_eq!(
            node,
            AstNode::Logical {
                op: LogicOp::Or,
                nodes: vec![
                    AstNode::Term("hello".to_string()),
                    AstNode::Term("world".to_string()),
                ],
            }
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let node = parse("a b | c").unwrap();
        match node {
            AstNode::Logical {
                op: LogicOp::Or,
                nodes,
            } => {
                assert_eq!(nodes.len(), 2);
                assert!(matches!(
                    nodes[0],
                    AstNode::Logical {
                        op: LogicOp::And,
                        ..
                    }
                ));
                assert_eq!(nodes[1], AstNode::Term("c".to_string()));
            }
            other => panic!("expected or node, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_affixes() {
        assert_eq!(parse("pre*").unwrap(), AstNode::Prefix("pre".to_string()));
        assert_eq!(parse("*suf").unwrap(), AstNode::Suffix("suf".to_string()));
        assert_eq!(parse("*mid*").unwrap(), AstNode::Infix("mid".to_string()));
    }

    #[test]
    fn test_parse_star() {
        assert_eq!(parse("*").unwrap(), AstNode::Star);
    }

    #[test]
    fn test_parse_field_term() {
        let node = parse("@title:hello").unwrap();
        assert_eq!(
            node,
            AstNode::Field {
                field: "title".to_string(),
                node: Box::new(AstNode::Term("hello".to_string())),
            }
        );
    }

    #[test]
    fn test_parse_star_field() {
        let node = parse("@title:*").unwrap();
        assert_eq!(
            node,
            AstNode::Field {
                field: "title".to_string(),
                node: Box::new(AstNode::StarField),
            }
        );
    }

    #[test]
    fn test_parse_field_group() {
        let node = parse("@title:(hello | world)").unwrap();
        match node {
            AstNode::Field { field, node } => {
                assert_eq!(field, "title");
                assert!(matches!(
                    *node,
                    AstNode::Logical {
                        op: LogicOp::Or,
                        ..
                    }
                ));
            }
            other => panic!("expected field node, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_range() {
        let node = parse("@price:[15 35]").unwrap();
        assert_eq!(
            node,
            AstNode::Field {
                field: "price".to_string(),
                node: Box::new(AstNode::Range { lo: 15.0, hi: 35.0 }),
            }
        );
    }

    #[test]
    fn test_parse_range_with_infinities() {
        let node = parse("@price:[-inf +inf]").unwrap();
        match node {
            AstNode::Field { node, .. } => match *node {
                AstNode::Range { lo, hi } => {
                    assert_eq!(lo, f64::NEG_INFINITY);
                    assert_eq!(hi, f64::INFINITY);
                }
                other => panic!("expected range, got {other:?}"),
            },
            other => panic!("expected field node, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_negative_bounds() {
        let node = parse("@price:[-10 -2.5]").unwrap();
        match node {
            AstNode::Field { node, .. } => {
                assert_eq!(
                    *node,
                    AstNode::Range {
                        lo: -10.0,
                        hi: -2.5
                    }
                );
            }
            other => panic!("expected field node, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_tags() {
        let node = parse("@tags:{red|blue}").unwrap();
        assert_eq!(
            node,
            AstNode::Field {
                field: "tags".to_string(),
                node: Box::new(AstNode::Tags(vec![
                    TagValue::Term("red".to_string()),
                    TagValue::Term("blue".to_string()),
                ])),
            }
        );
    }

    #[test]
    fn test_parse_tag_affixes_and_quotes() {
        let node = parse("@tags:{red* | \"new york\"}").unwrap();
        match node {
            AstNode::Field { node, .. } => {
                assert_eq!(
                    *node,
                    AstNode::Tags(vec![
                        TagValue::Prefix("red".to_string()),
                        TagValue::Term("new york".to_string()),
                    ])
                );
            }
            other => panic!("expected field node, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_negation() {
        let node = parse("-@tags:{sale}").unwrap();
        assert!(matches!(node, AstNode::Negate(_)));

        let node = parse("--hello").unwrap();
        match node {
            AstNode::Negate(inner) => assert!(matches!(*inner, AstNode::Negate(_))),
            other => panic!("expected negate, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_text_param() {
        let mut params = QueryParams::new();
        params.set_text("t", "hello");
        let node = parse_query("$t", &params).unwrap();
        assert_eq!(node, AstNode::Term("hello".to_string()));
    }

    #[test]
    fn test_unknown_param_is_an_error() {
        assert!(parse("$t").is_err());
    }

    #[test]
    fn test_parse_knn() {
        let mut params = QueryParams::new();
        params.set_vector("q", vec![1.0, 0.0, 0.0]);
        let node = parse_query("*=>[KNN 2 @emb $q]", &params).unwrap();

        match node {
            AstNode::Knn(knn) => {
                assert_eq!(knn.limit, 2);
                assert_eq!(knn.field, "emb");
                assert_eq!(knn.vec, vec![1.0, 0.0, 0.0]);
                assert_eq!(knn.ef_runtime, None);
                assert_eq!(knn.score_alias, "");
                assert_eq!(knn.filter, AstNode::Star);
            }
            other => panic!("expected knn node, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_knn_with_options() {
        let mut params = QueryParams::new();
        params.set_vector("vec", vec![0.5, 0.5]);
        let node =
            parse_query("@title:hello =>[KNN 10 @emb $vec EF_RUNTIME 50 AS dist]", &params)
                .unwrap();

        match node {
            AstNode::Knn(knn) => {
                assert_eq!(knn.limit, 10);
                assert_eq!(knn.ef_runtime, Some(50));
                assert_eq!(knn.score_alias, "dist");
                assert!(matches!(knn.filter, AstNode::Field { .. }));
            }
            other => panic!("expected knn node, got {other:?}"),
        }
    }

    #[test]
    fn test_knn_requires_vector_param() {
        let mut params = QueryParams::new();
        params.set_text("q", "hello");
        assert!(parse_query("*=>[KNN 2 @emb $q]", &params).is_err());
    }

    #[test]
    fn test_parse_empty_query() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("(hello").is_err());
        assert!(parse("@title").is_err());
        assert!(parse("@price:[15").is_err());
        assert!(parse("@tags:{red").is_err());
        assert!(parse("hello )").is_err());
        assert!(parse("@title:he*llo").is_err());
    }

    #[test]
    fn test_quoted_term_keeps_stars_literal() {
        assert_eq!(
            parse("\"pre*\"").unwrap(),
            AstNode::Term("pre*".to_string())
        );
    }
}
