//! Lexer (tokenizer) for filter expressions.

use std::iter::Peekable;
use std::str::CharIndices;

use super::ast::QueryOperator;
use super::error::{FilterError, FilterResult};

/// A token in a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A bare word: field name, unquoted value or part of one.
    Word(String),

    /// A quoted string, quotes included.
    Quoted(String),

    // ==================== Comparisons ====================
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,

    /// A word operator such as `contains` or `isNull`.
    Keyword(QueryOperator),

    // ==================== Structure ====================
    /// The `AND` connective (any case).
    And,
    /// The `OR` connective (any case).
    Or,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `,`
    Comma,
}

impl TokenKind {
    /// Maps a comparison token to its operator.
    pub fn comparison(&self) -> Option<QueryOperator> {
        match self {
            TokenKind::Eq => Some(QueryOperator::Equals),
            TokenKind::NotEq => Some(QueryOperator::NotEquals),
            TokenKind::Gt => Some(QueryOperator::GreaterThan),
            TokenKind::Ge => Some(QueryOperator::GreaterOrEqual),
            TokenKind::Lt => Some(QueryOperator::LessThan),
            TokenKind::Le => Some(QueryOperator::LessOrEqual),
            TokenKind::Keyword(op) => Some(*op),
            _ => None,
        }
    }
}

/// A token with its byte span in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset just past the last character.
    pub end: usize,
}

/// Lexer for tokenizing filter expressions.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Tokenizes the whole input.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::UnterminatedQuote` for a quote without its
    /// closing partner.
    pub fn tokenize(mut self) -> FilterResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Byte offset of the next unread character.
    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn is_word_boundary(c: char) -> bool {
        c.is_whitespace() || matches!(c, '=' | '<' | '>' | '(' | ')' | ',')
    }

    /// A `!` ends a word only when it starts `!=`.
    fn at_word_end(&mut self) -> bool {
        match self.chars.peek() {
            None => true,
            Some(&(i, '!')) => self.input[i + 1..].starts_with('='),
            Some(&(_, c)) => Self::is_word_boundary(c),
        }
    }

    fn next_token(&mut self) -> FilterResult<Option<Token>> {
        self.skip_whitespace();

        let Some(&(start, c)) = self.chars.peek() else {
            return Ok(None);
        };

        let kind = match c {
            '(' => {
                self.chars.next();
                TokenKind::OpenParen
            }
            ')' => {
                self.chars.next();
                TokenKind::CloseParen
            }
            ',' => {
                self.chars.next();
                TokenKind::Comma
            }
            '=' => {
                self.chars.next();
                TokenKind::Eq
            }
            '!' if self.input[start + 1..].starts_with('=') => {
                self.chars.next();
                self.chars.next();
                TokenKind::NotEq
            }
            '>' => {
                self.chars.next();
                if self.peek_char() == Some('=') {
                    self.chars.next();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '<' => {
                self.chars.next();
                if self.peek_char() == Some('=') {
                    self.chars.next();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '\'' | '"' => self.read_quoted(start, c)?,
            _ => self.read_word(start),
        };

        let end = self.offset();
        Ok(Some(Token { kind, start, end }))
    }

    /// Reads a quoted string; backslash escapes the next character.
    fn read_quoted(&mut self, start: usize, quote: char) -> FilterResult<TokenKind> {
        self.chars.next();
        loop {
            match self.chars.next() {
                Some((_, '\\')) => {
                    self.chars.next();
                }
                Some((_, c)) if c == quote => break,
                Some(_) => {}
                None => return Err(FilterError::UnterminatedQuote { position: start }),
            }
        }
        let end = self.offset();
        Ok(TokenKind::Quoted(self.input[start..end].to_string()))
    }

    fn read_word(&mut self, start: usize) -> TokenKind {
        while !self.at_word_end() {
            self.chars.next();
        }
        let end = self.offset();
        let word = &self.input[start..end];

        match word.to_ascii_lowercase().as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "contains" => TokenKind::Keyword(QueryOperator::Contains),
            "notcontains" => TokenKind::Keyword(QueryOperator::NotContains),
            "beginswith" => TokenKind::Keyword(QueryOperator::BeginsWith),
            "endswith" => TokenKind::Keyword(QueryOperator::EndsWith),
            "in" => TokenKind::Keyword(QueryOperator::In),
            "notin" => TokenKind::Keyword(QueryOperator::NotIn),
            "isnull" => TokenKind::Keyword(QueryOperator::IsNull),
            "isnotnull" => TokenKind::Keyword(QueryOperator::IsNotNull),
            _ => TokenKind::Word(word.to_string()),
        }
    }
}
