//! Recursive descent parser for filter expressions.

use super::ast::{Filter, FilterGroup, FilterValue, LogicalOperator, QueryFilter, QueryOperator};
use super::error::{FilterError, FilterResult};
use super::lexer::{Lexer, Token, TokenKind};

/// Parser for Autotask filter expressions.
///
/// # Grammar
///
/// ```text
/// expression ::= and_expr
/// and_expr   ::= or_expr ("AND" or_expr)*
/// or_expr    ::= primary ("OR" primary)*
/// primary    ::= "(" expression ")" | condition
/// condition  ::= field comparison value
///              | field ("in" | "notIn") "(" value ("," value)* ")"
///              | field ("isNull" | "isNotNull")
/// comparison ::= "=" | "!=" | ">" | ">=" | "<" | "<="
///              | "contains" | "notContains" | "beginsWith" | "endsWith"
/// ```
///
/// `AND` is the outermost connective: `a OR b AND c` parses as
/// `and[or[a, b], c]`. Connectives and word operators match in any case;
/// field names and values keep the caller's spelling.
///
/// # Example
///
/// ```
/// use autotask::filter::{FilterParser, LogicalOperator};
///
/// let filter = FilterParser::parse("Status!=5 AND (Priority=1 OR Priority=2)")
///     .unwrap()
///     .unwrap();
/// let group = filter.as_group().unwrap();
/// assert_eq!(group.operator, LogicalOperator::And);
/// assert_eq!(group.items.len(), 2);
/// ```
pub struct FilterParser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl<'a> FilterParser<'a> {
    /// Parses a filter expression.
    ///
    /// Returns `Ok(None)` for empty or whitespace-only input, meaning
    /// "no filter".
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] describing the first problem found; a
    /// condition that cannot be understood is never turned into an empty
    /// filter.
    pub fn parse(input: &'a str) -> FilterResult<Option<Filter>> {
        if input.trim().is_empty() {
            return Ok(None);
        }

        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Self {
            input,
            tokens,
            position: 0,
        };
        let filter = parser.parse_expression()?;

        if let Some(token) = parser.peek() {
            return Err(parser.unexpected(token));
        }

        Ok(Some(filter))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Byte offset of the next token, or end of input.
    fn offset(&self) -> usize {
        self.peek().map(|t| t.start).unwrap_or(self.input.len())
    }

    fn text(&self, start: usize, end: usize) -> &'a str {
        let input: &'a str = self.input;
        &input[start..end]
    }

    fn unexpected(&self, token: &Token) -> FilterError {
        FilterError::unexpected_token(self.text(token.start, token.end), token.start)
    }

    fn parse_expression(&mut self) -> FilterResult<Filter> {
        self.parse_and_expr()
    }

    /// Parses AND expressions: `or_expr ("AND" or_expr)*`
    fn parse_and_expr(&mut self) -> FilterResult<Filter> {
        let mut items = vec![self.parse_or_expr()?];

        while self.peek_kind() == Some(&TokenKind::And) {
            self.advance();
            items.push(self.parse_or_expr()?);
        }

        Ok(collapse(items, LogicalOperator::And))
    }

    /// Parses OR expressions: `primary ("OR" primary)*`
    fn parse_or_expr(&mut self) -> FilterResult<Filter> {
        let mut items = vec![self.parse_primary()?];

        while self.peek_kind() == Some(&TokenKind::Or) {
            self.advance();
            items.push(self.parse_primary()?);
        }

        Ok(collapse(items, LogicalOperator::Or))
    }

    /// Parses a parenthesized expression or a single condition.
    fn parse_primary(&mut self) -> FilterResult<Filter> {
        match self.peek_kind() {
            Some(TokenKind::OpenParen) => {
                let open = self.advance().map(|t| t.start).unwrap_or_default();
                if self.peek_kind() == Some(&TokenKind::CloseParen) {
                    return Err(FilterError::EmptyCondition { position: self.offset() });
                }
                let inner = self.parse_expression()?;
                match self.peek_kind() {
                    Some(TokenKind::CloseParen) => {
                        self.advance();
                        Ok(inner)
                    }
                    _ => Err(FilterError::UnclosedParenthesis { position: open }),
                }
            }
            Some(TokenKind::And | TokenKind::Or | TokenKind::CloseParen) | None => {
                Err(FilterError::EmptyCondition { position: self.offset() })
            }
            Some(_) => self.parse_condition().map(Filter::Condition),
        }
    }

    /// Parses `field op value`.
    fn parse_condition(&mut self) -> FilterResult<QueryFilter> {
        let condition_start = self.offset();

        // Field: every word before the operator, as written.
        let mut field_end = None;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Word(_) | TokenKind::Quoted(_) => {
                    field_end = Some(token.end);
                    self.advance();
                }
                _ => break,
            }
        }

        let operator_token = self.peek().cloned();
        let operator = operator_token.as_ref().and_then(|t| t.kind.comparison());

        let Some(field_end) = field_end else {
            return Err(FilterError::MissingField {
                position: condition_start,
            });
        };
        let field = self.text(condition_start, field_end).to_string();

        let Some(operator) = operator else {
            let condition_end = operator_token.map(|t| t.start).unwrap_or(self.input.len());
            return Err(FilterError::missing_operator(
                self.text(condition_start, condition_end).trim(),
            ));
        };
        self.advance();

        if operator.is_unary() {
            return Ok(QueryFilter::unary(field, operator));
        }

        if matches!(operator, QueryOperator::In | QueryOperator::NotIn) {
            let values = self.parse_value_list(&field)?;
            return Ok(QueryFilter::new(field, operator, FilterValue::List(values)));
        }

        let raw = self.parse_value_text(&field)?;
        let value = if operator.is_text_match() {
            FilterValue::String(strip_quotes(raw))
        } else {
            coerce_value(raw)
        };

        Ok(QueryFilter::new(field, operator, value))
    }

    /// Collects the raw text of a value up to the next connective or
    /// unbalanced closing parenthesis.
    fn parse_value_text(&mut self, field: &str) -> FilterResult<&'a str> {
        let mut span: Option<(usize, usize)> = None;
        let mut depth = 0usize;

        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::And | TokenKind::Or => break,
                TokenKind::CloseParen if depth == 0 => break,
                TokenKind::CloseParen => depth -= 1,
                TokenKind::OpenParen => depth += 1,
                TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Gt
                | TokenKind::Ge
                | TokenKind::Lt
                | TokenKind::Le => return Err(self.unexpected(token)),
                _ => {}
            }
            span = Some((span.map_or(token.start, |(s, _)| s), token.end));
            self.advance();
        }

        match span {
            Some((start, end)) => Ok(self.text(start, end)),
            None => Err(FilterError::missing_value(field)),
        }
    }

    /// Parses `"(" value ("," value)* ")"` for `in` / `notIn`.
    fn parse_value_list(&mut self, field: &str) -> FilterResult<Vec<FilterValue>> {
        let open = match self.peek() {
            Some(token) if token.kind == TokenKind::OpenParen => token.start,
            Some(token) => return Err(self.unexpected(token)),
            None => return Err(FilterError::missing_value(field)),
        };
        self.advance();

        let mut values = Vec::new();
        let mut span: Option<(usize, usize)> = None;

        loop {
            let Some(token) = self.advance() else {
                return Err(FilterError::UnclosedParenthesis { position: open });
            };
            match token.kind {
                TokenKind::Comma | TokenKind::CloseParen => {
                    match span.take() {
                        Some((start, end)) => values.push(coerce_value(self.text(start, end))),
                        None if token.kind == TokenKind::CloseParen && values.is_empty() => {
                            return Err(FilterError::missing_value(field));
                        }
                        None => return Err(self.unexpected(&token)),
                    }
                    if token.kind == TokenKind::CloseParen {
                        return Ok(values);
                    }
                }
                TokenKind::Word(_) | TokenKind::Quoted(_) => {
                    span = Some((span.map_or(token.start, |(s, _)| s), token.end));
                }
                _ => return Err(self.unexpected(&token)),
            }
        }
    }
}

/// Parses a filter expression; shorthand for [`FilterParser::parse`].
pub fn parse_filter(input: &str) -> FilterResult<Option<Filter>> {
    FilterParser::parse(input)
}

/// A single item stands alone; several become a group.
fn collapse(mut items: Vec<Filter>, operator: LogicalOperator) -> Filter {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Filter::Group(FilterGroup { operator, items })
    }
}

/// Removes the quotes around a text-match value and resolves `\'`, `\"`
/// and `\\` inside them.
fn strip_quotes(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let quoted = bytes.len() >= 2
        && matches!(bytes[0], b'\'' | b'"')
        && bytes[bytes.len() - 1] == bytes[0];

    if quoted {
        unescape(&raw[1..raw.len() - 1])
    } else {
        raw.trim_matches(|c| c == '\'' || c == '"').to_string()
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('\'' | '"' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Infers the literal type of a value.
///
/// `true`/`false` (exact case) are booleans; numeric text is an integer
/// unless it has a decimal point; everything else is kept verbatim.
fn coerce_value(raw: &str) -> FilterValue {
    match raw {
        "true" => return FilterValue::Bool(true),
        "false" => return FilterValue::Bool(false),
        _ => {}
    }

    if is_numeric_literal(raw) {
        if !raw.contains('.') {
            if let Ok(int) = raw.parse::<i64>() {
                return FilterValue::Int(int);
            }
        }
        // Out-of-range exponents parse to infinity, which JSON cannot carry.
        if let Ok(float) = raw.parse::<f64>() {
            if float.is_finite() {
                return FilterValue::Float(float);
            }
        }
    }

    FilterValue::String(raw.to_string())
}

/// Plain decimal or exponent notation only; keeps `inf`/`NaN` as text.
fn is_numeric_literal(raw: &str) -> bool {
    raw.bytes().any(|b| b.is_ascii_digit())
        && raw
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Filter {
        parse_filter(input).unwrap().unwrap()
    }

    fn condition(input: &str) -> QueryFilter {
        parse(input).as_condition().cloned().unwrap()
    }

    #[test]
    fn test_empty_input_is_no_filter() {
        assert_eq!(parse_filter("").unwrap(), None);
        assert_eq!(parse_filter("   ").unwrap(), None);
    }

    #[test]
    fn test_equals_keeps_quotes() {
        let filter = condition("name='Test'");
        assert_eq!(filter.field, "name");
        assert_eq!(filter.operator, QueryOperator::Equals);
        assert_eq!(filter.value, Some(FilterValue::String("'Test'".to_string())));
    }

    #[test]
    fn test_not_equals_integer() {
        let filter = condition("Status!=5");
        assert_eq!(filter, QueryFilter::new("Status", QueryOperator::NotEquals, 5));
    }

    #[test]
    fn test_boolean_literal() {
        let filter = condition("active=true");
        assert_eq!(filter.value, Some(FilterValue::Bool(true)));

        let filter = condition("active = false");
        assert_eq!(filter.value, Some(FilterValue::Bool(false)));
    }

    #[test]
    fn test_boolean_is_case_sensitive() {
        let filter = condition("active=True");
        assert_eq!(filter.value, Some(FilterValue::String("True".to_string())));
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(condition("Amount>10.5").value, Some(FilterValue::Float(10.5)));
        assert_eq!(condition("Amount<-3").value, Some(FilterValue::Int(-3)));
        assert_eq!(condition("Amount=1e3").value, Some(FilterValue::Float(1000.0)));
        assert_eq!(
            condition("Code=12abc").value,
            Some(FilterValue::String("12abc".to_string()))
        );
        assert_eq!(
            condition("Code=inf").value,
            Some(FilterValue::String("inf".to_string()))
        );
    }

    #[test]
    fn test_out_of_range_float_stays_text() {
        assert_eq!(
            condition("Amount=1e400").value,
            Some(FilterValue::String("1e400".to_string()))
        );
        let value = serde_json::to_value(condition("Amount=-1e400")).unwrap();
        assert_eq!(value["value"], "-1e400");
    }

    #[test]
    fn test_value_with_bang() {
        assert_eq!(
            condition("Title = Urgent!"),
            QueryFilter::new("Title", QueryOperator::Equals, "Urgent!")
        );
        assert_eq!(
            condition("Email=foo!bar@example.com"),
            QueryFilter::new("Email", QueryOperator::Equals, "foo!bar@example.com")
        );
        assert_eq!(
            condition("Title!=!important").operator,
            QueryOperator::NotEquals
        );
    }

    #[test]
    fn test_text_match_unescapes_quoted_value() {
        assert_eq!(
            condition(r"LastName contains 'O\'Brien'").value,
            Some(FilterValue::String("O'Brien".to_string()))
        );
        assert_eq!(
            condition(r#"Title beginsWith "say \"hi\"""#).value,
            Some(FilterValue::String(r#"say "hi""#.to_string()))
        );
        assert_eq!(
            condition(r"Path endsWith 'C:\\temp\d'").value,
            Some(FilterValue::String(r"C:\temp\d".to_string()))
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(condition("a>1").operator, QueryOperator::GreaterThan);
        assert_eq!(condition("a<1").operator, QueryOperator::LessThan);
        assert_eq!(condition("a>=1").operator, QueryOperator::GreaterOrEqual);
        assert_eq!(condition("a<=1").operator, QueryOperator::LessOrEqual);
        assert_eq!(condition("a = 1").operator, QueryOperator::Equals);
    }

    #[test]
    fn test_contains_strips_quotes_and_keeps_case() {
        let filter = condition("CompanyName CONTAINS 'Acme Corp'");
        assert_eq!(filter.field, "CompanyName");
        assert_eq!(filter.operator, QueryOperator::Contains);
        assert_eq!(filter.value, Some(FilterValue::String("Acme Corp".to_string())));
    }

    #[test]
    fn test_contains_value_is_never_coerced() {
        let filter = condition("Title contains 42");
        assert_eq!(filter.value, Some(FilterValue::String("42".to_string())));
    }

    #[test]
    fn test_text_match_keywords() {
        assert_eq!(condition("Title beginsWith 'Re:'").operator, QueryOperator::BeginsWith);
        assert_eq!(
            condition("Email endswith \"@acme.com\"").value,
            Some(FilterValue::String("@acme.com".to_string()))
        );
        assert_eq!(condition("Title notContains test").operator, QueryOperator::NotContains);
    }

    #[test]
    fn test_unquoted_value_with_spaces() {
        let filter = condition("Title = Printer on fire");
        assert_eq!(
            filter.value,
            Some(FilterValue::String("Printer on fire".to_string()))
        );
    }

    #[test]
    fn test_in_list() {
        let filter = condition("Status in (1, 5, 'New')");
        assert_eq!(filter.operator, QueryOperator::In);
        assert_eq!(
            filter.value,
            Some(FilterValue::List(vec![
                FilterValue::Int(1),
                FilterValue::Int(5),
                FilterValue::String("'New'".to_string()),
            ]))
        );
    }

    #[test]
    fn test_not_in_list() {
        let filter = condition("QueueID notIn (8, 9)");
        assert_eq!(filter.operator, QueryOperator::NotIn);
        assert_eq!(filter.value, Some(FilterValue::from(vec![8, 9])));
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(
            condition("ContactID isNull"),
            QueryFilter::unary("ContactID", QueryOperator::IsNull)
        );
        assert_eq!(
            condition("ContactID ISNOTNULL"),
            QueryFilter::unary("ContactID", QueryOperator::IsNotNull)
        );
    }

    #[test]
    fn test_and_group() {
        let filter = parse("name='Test' AND active=true");
        assert_eq!(
            filter,
            Filter::Group(FilterGroup::and([
                QueryFilter::new("name", QueryOperator::Equals, "'Test'").into(),
                QueryFilter::new("active", QueryOperator::Equals, true).into(),
            ]))
        );
    }

    #[test]
    fn test_or_group() {
        let group = parse("Status=1 or Status=2 OR Status=3");
        let group = group.as_group().unwrap();
        assert_eq!(group.operator, LogicalOperator::Or);
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_field_names_keep_case_in_groups() {
        let filter = parse("AssignedResourceID=123 and QueueID=8");
        let group = filter.as_group().unwrap();
        assert_eq!(group.items[0].as_condition().unwrap().field, "AssignedResourceID");
        assert_eq!(group.items[1].as_condition().unwrap().field, "QueueID");
    }

    #[test]
    fn test_parenthesized_or_inside_and() {
        let filter = parse("(name='Test' OR name='Test2') AND active=true");
        let outer = filter.as_group().unwrap();
        assert_eq!(outer.operator, LogicalOperator::And);
        assert_eq!(outer.len(), 2);

        let inner = outer.items[0].as_group().unwrap();
        assert_eq!(inner.operator, LogicalOperator::Or);
        assert_eq!(inner.len(), 2);
        assert_eq!(
            outer.items[1],
            Filter::Condition(QueryFilter::new("active", QueryOperator::Equals, true))
        );
    }

    #[test]
    fn test_parenthesized_and_inside_or() {
        let filter = parse("Status=1 OR (Priority=1 AND QueueID=8)");
        let outer = filter.as_group().unwrap();
        assert_eq!(outer.operator, LogicalOperator::Or);
        let inner = outer.items[1].as_group().unwrap();
        assert_eq!(inner.operator, LogicalOperator::And);
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn test_parenthesized_single_condition() {
        let filter = parse("Status!=5 AND (Priority=1)");
        let outer = filter.as_group().unwrap();
        assert_eq!(
            outer.items[1],
            Filter::Condition(QueryFilter::new("Priority", QueryOperator::Equals, 1))
        );
    }

    #[test]
    fn test_deep_nesting() {
        let filter = parse("a=1 AND (b=2 OR (c=3 AND (d=4 OR e=5)))");
        let level1 = filter.as_group().unwrap();
        let level2 = level1.items[1].as_group().unwrap();
        let level3 = level2.items[1].as_group().unwrap();
        let level4 = level3.items[1].as_group().unwrap();
        assert_eq!(level4.operator, LogicalOperator::Or);
        assert_eq!(
            level4.items[1],
            Filter::Condition(QueryFilter::new("e", QueryOperator::Equals, 5))
        );
    }

    #[test]
    fn test_mixed_without_parens_keeps_and_outermost() {
        let filter = parse("a=1 OR b=2 AND c=3");
        let outer = filter.as_group().unwrap();
        assert_eq!(outer.operator, LogicalOperator::And);
        assert_eq!(outer.len(), 2);
        assert_eq!(outer.items[0].as_group().unwrap().operator, LogicalOperator::Or);
    }

    #[test]
    fn test_parenthesized_value_text() {
        let filter = condition("Title = Fix (urgent)");
        assert_eq!(filter.value, Some(FilterValue::String("Fix (urgent)".to_string())));
    }

    #[test]
    fn test_quoted_connective_is_part_of_value() {
        let filter = condition("CompanyName='Smith AND Sons'");
        assert_eq!(
            filter.value,
            Some(FilterValue::String("'Smith AND Sons'".to_string()))
        );
    }

    #[test]
    fn test_missing_operator_is_an_error() {
        let err = parse_filter("Status").unwrap_err();
        assert_eq!(err, FilterError::missing_operator("Status"));

        let err = parse_filter("Status AND Priority=1").unwrap_err();
        assert_eq!(err, FilterError::missing_operator("Status"));
    }

    #[test]
    fn test_missing_field_and_value() {
        assert_eq!(
            parse_filter("=5").unwrap_err(),
            FilterError::MissingField { position: 0 }
        );
        assert_eq!(
            parse_filter("Status=").unwrap_err(),
            FilterError::missing_value("Status")
        );
        assert_eq!(
            parse_filter("Status in ()").unwrap_err(),
            FilterError::missing_value("Status")
        );
    }

    #[test]
    fn test_dangling_connective() {
        assert_eq!(
            parse_filter("Status=1 AND").unwrap_err(),
            FilterError::EmptyCondition { position: 12 }
        );
        assert_eq!(
            parse_filter("OR Status=1").unwrap_err(),
            FilterError::EmptyCondition { position: 0 }
        );
    }

    #[test]
    fn test_parenthesis_errors() {
        assert_eq!(
            parse_filter("(a=1 OR b=2").unwrap_err(),
            FilterError::UnclosedParenthesis { position: 0 }
        );
        assert_eq!(
            parse_filter("a=1)").unwrap_err(),
            FilterError::unexpected_token(")", 3)
        );
        assert_eq!(
            parse_filter("()").unwrap_err(),
            FilterError::EmptyCondition { position: 1 }
        );
    }

    #[test]
    fn test_second_comparison_in_value_is_rejected() {
        assert_eq!(
            parse_filter("a=1 b=2").unwrap_err(),
            FilterError::unexpected_token("=", 5)
        );
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let input = "Status!=5 AND (Priority=1 OR AssignedResourceID=123)";
        assert_eq!(parse_filter(input).unwrap(), parse_filter(input).unwrap());
    }
}
