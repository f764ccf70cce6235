use crate::ast::*;
use crate::error::{Position, SyntaxError};
use crate::value::Value;

/// Deepest allowed nesting of brackets, parentheses, unary and operator chains.
const MAX_NESTING: usize = 256;

/// Parser state: tracks position in the input string.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Open `(`, `[`, `{` and format holes. Newlines only end an
    /// expression when this is zero.
    delimiters: usize,
    /// Recursion depth, bounded by `MAX_NESTING`.
    depth: usize,
}

/// Parse OML source into a list of statements.
///
/// A source whose first token is `{` is an inline document: one map literal
/// whose entries become top-level assignments. Anything else is a sequence of
/// `[table]`, `[[array.table]]` and `key = expr` lines.
pub fn parse(input: &str) -> Result<Vec<Statement>, SyntaxError> {
    let mut parser = Parser {
        input,
        pos: 0,
        delimiters: 0,
        depth: 0,
    };

    parser.skip_ws();
    if parser.peek_char() == Some('{') {
        let entries = parser.parse_map_entries()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error_point("Unexpected content after the closing '}'"));
        }
        return Ok(entries
            .into_iter()
            .map(|entry| Statement::Assign {
                key: entry.key,
                value: entry.value,
                span: entry.span,
            })
            .collect());
    }

    let mut statements = Vec::new();
    while !parser.at_end() {
        statements.push(parser.parse_statement()?);
        parser.expect_line_end()?;
        parser.skip_ws();
    }
    Ok(statements)
}

impl<'a> Parser<'a> {
    // ── Helpers ──────────────────────────────────────────────────────

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_char_at(&self, n: usize) -> Option<char> {
        self.remaining().chars().nth(n)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    fn eat_char(&mut self, ch: char) -> bool {
        if self.peek_char() == Some(ch) {
            self.advance(ch.len_utf8());
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, ch: char) -> Result<(), SyntaxError> {
        if self.eat_char(ch) {
            Ok(())
        } else {
            Err(self.error_point(format!("Expected '{}'", ch)))
        }
    }

    /// Current position in the source.
    fn position(&self) -> Position {
        let consumed = &self.input[..self.pos];
        let line = consumed.matches('\n').count();
        let last_newline = consumed.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = self.pos - last_newline;
        Position {
            line,
            column,
            offset: self.pos,
        }
    }

    fn span_from(&self, begin: Position) -> Span {
        Span {
            begin,
            end: self.position(),
        }
    }

    fn error_point(&self, message: impl Into<String>) -> SyntaxError {
        let pos = self.position();
        SyntaxError::new(message, pos, pos)
    }

    /// Create an error spanning from `begin` to the current position.
    fn error_span(&self, message: impl Into<String>, begin: Position) -> SyntaxError {
        SyntaxError::new(message, begin, self.position())
    }

    /// Run `f` one level deeper, failing instead of recursing without bound.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_point("Expression is nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Like `nested`, for the inside of a bracketing construct.
    fn delimited<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        self.delimiters += 1;
        let result = self.nested(f);
        self.delimiters -= 1;
        result
    }

    // ── Whitespace & Comments ───────────────────────────────────────

    fn skip_ws(&mut self) {
        loop {
            while let Some(ch) = self.peek_char() {
                if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n' {
                    self.advance(ch.len_utf8());
                } else {
                    break;
                }
            }
            // Line comments: # to end of line
            if self.peek_char() == Some('#') {
                while let Some(ch) = self.peek_char() {
                    if ch == '\r' || ch == '\n' {
                        break;
                    }
                    self.advance(ch.len_utf8());
                }
            } else {
                break;
            }
        }
    }

    fn skip_inline_ws(&mut self) {
        while let Some(ch @ (' ' | '\t')) = self.peek_char() {
            self.advance(ch.len_utf8());
        }
    }

    /// Like `skip_ws`, but also eats commas. Used between map entries so
    /// that commas and newlines both work as separators.
    fn skip_ws_and_commas(&mut self) {
        self.skip_ws();
        while self.peek_char() == Some(',') {
            self.advance(1);
            self.skip_ws();
        }
    }

    /// Whitespace between the parts of an expression.
    fn skip_expr_ws(&mut self) {
        if self.delimiters > 0 {
            self.skip_ws();
        } else {
            self.skip_inline_ws();
        }
    }

    fn expect_line_end(&mut self) -> Result<(), SyntaxError> {
        self.skip_inline_ws();
        match self.peek_char() {
            None | Some('\r') | Some('\n') | Some('#') => Ok(()),
            Some(_) => Err(self.error_point("Expected end of line after statement")),
        }
    }

    // ── Statements ──────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let begin = self.position();

        if self.starts_with("[[") {
            self.advance(2);
            let path = self.parse_header_path()?;
            if !self.starts_with("]]") {
                return Err(self.error_span("Expected ']]' to close array table header", begin));
            }
            self.advance(2);
            return Ok(Statement::ArrayTable {
                path,
                span: self.span_from(begin),
            });
        }

        if self.eat_char('[') {
            let path = self.parse_header_path()?;
            if !self.eat_char(']') {
                return Err(self.error_span("Expected ']' to close table header", begin));
            }
            return Ok(Statement::Table {
                path,
                span: self.span_from(begin),
            });
        }

        let key = self.parse_key_path()?;
        self.skip_inline_ws();
        if !self.eat_char('=') {
            return Err(self.error_point("Expected '=' after key"));
        }
        self.skip_inline_ws();
        let value = self.parse_expr()?;
        Ok(Statement::Assign {
            key,
            value,
            span: self.span_from(begin),
        })
    }

    fn parse_header_path(&mut self) -> Result<Vec<String>, SyntaxError> {
        self.skip_inline_ws();
        let path = self.parse_key_path()?;
        self.skip_inline_ws();
        Ok(path)
    }

    // ── Keys (dotted path) ──────────────────────────────────────────

    fn parse_key_path(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut path = vec![self.parse_key()?];
        while self.peek_char() == Some('.') {
            self.advance(1);
            path.push(self.parse_key()?);
        }
        Ok(path)
    }

    fn parse_key(&mut self) -> Result<String, SyntaxError> {
        match self.peek_char() {
            Some('"') => self.parse_double_quoted_string(),
            Some('\'') => self.parse_single_quoted_string(),
            _ => self.parse_identifier(),
        }
    }

    fn parse_identifier(&mut self) -> Result<String, SyntaxError> {
        match self.peek_char() {
            Some(ch) if is_ident_start(ch) => {}
            _ => return Err(self.error_point("Expected an identifier")),
        }
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if is_ident_char(ch) {
                self.advance(ch.len_utf8());
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    // ── Expressions ─────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(|p| p.parse_conditional())
    }

    /// `condition ? then : otherwise`, right associative.
    fn parse_conditional(&mut self) -> Result<Expr, SyntaxError> {
        let condition = self.parse_binary(1)?;
        let saved = self.pos;
        self.skip_expr_ws();
        if !self.eat_char('?') {
            self.pos = saved;
            return Ok(condition);
        }
        self.skip_ws();
        let then = self.parse_expr()?;
        self.skip_ws();
        self.expect_char(':')?;
        self.skip_ws();
        let otherwise = self.parse_expr()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Precedence climbing over every binary operator except `**`.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        let mut chain = 0;
        loop {
            let saved = self.pos;
            self.skip_expr_ws();
            let op = match self.peek_binary_op() {
                Some((op, len)) if op != BinaryOp::Pow && op.precedence() >= min_precedence => {
                    self.advance(len);
                    op
                }
                _ => {
                    self.pos = saved;
                    return Ok(left);
                }
            };
            chain += 1;
            if self.depth + chain > MAX_NESTING {
                return Err(self.error_point("Expression is nested too deeply"));
            }
            self.skip_ws();
            let right = self.parse_binary(op.precedence() + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn peek_binary_op(&self) -> Option<(BinaryOp, usize)> {
        const TWO_CHAR: [(&str, BinaryOp); 9] = [
            ("||", BinaryOp::Or),
            ("&&", BinaryOp::And),
            ("==", BinaryOp::Eq),
            ("!=", BinaryOp::Ne),
            ("<=", BinaryOp::Le),
            (">=", BinaryOp::Ge),
            ("<<", BinaryOp::Shl),
            (">>", BinaryOp::Shr),
            ("**", BinaryOp::Pow),
        ];
        for (symbol, op) in TWO_CHAR {
            if self.starts_with(symbol) {
                return Some((op, 2));
            }
        }
        let op = match self.peek_char()? {
            '<' => BinaryOp::Lt,
            '>' => BinaryOp::Gt,
            '|' => BinaryOp::BitOr,
            '^' => BinaryOp::BitXor,
            '&' => BinaryOp::BitAnd,
            '+' => BinaryOp::Add,
            '-' => BinaryOp::Sub,
            '*' => BinaryOp::Mul,
            '/' => BinaryOp::Div,
            '%' => BinaryOp::Rem,
            _ => return None,
        };
        Some((op, 1))
    }

    /// Prefix `-`, `!` and `~`. Binds looser than `**`, so `-2 ** 2` is `-4`.
    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let mut ops = Vec::new();
        let operand = loop {
            let op = match self.peek_char() {
                Some('-') => UnaryOp::Neg,
                Some('!') => UnaryOp::Not,
                Some('~') => UnaryOp::BitNot,
                _ => break self.parse_power()?,
            };
            if op == UnaryOp::Neg && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()) {
                if let Some(literal) = self.parse_negative_literal()? {
                    break literal;
                }
            }
            if self.depth + ops.len() >= MAX_NESTING {
                return Err(self.error_point("Expression is nested too deeply"));
            }
            self.advance(1);
            self.skip_inline_ws();
            ops.push(op);
        };
        Ok(ops
            .into_iter()
            .rev()
            .fold(operand, |operand, op| Expr::Unary {
                op,
                operand: Box::new(operand),
            }))
    }

    /// Read `-123` / `-1.5` as one literal so `i64::MIN` is expressible.
    /// Gives up (restoring the position) when `**` follows.
    fn parse_negative_literal(&mut self) -> Result<Option<Expr>, SyntaxError> {
        let saved = self.pos;
        let literal = self.parse_number()?;
        let after = self.pos;
        self.skip_expr_ws();
        let followed_by_power = self.starts_with("**");
        if followed_by_power {
            self.pos = saved;
            return Ok(None);
        }
        self.pos = after;
        Ok(Some(literal))
    }

    /// `base ** exponent`, right associative.
    fn parse_power(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.parse_postfix()?;
        let saved = self.pos;
        self.skip_expr_ws();
        if !self.starts_with("**") {
            self.pos = saved;
            return Ok(base);
        }
        self.advance(2);
        self.skip_ws();
        let exponent = self.nested(|p| p.parse_unary())?;
        Ok(Expr::Binary {
            op: BinaryOp::Pow,
            left: Box::new(base),
            right: Box::new(exponent),
        })
    }

    /// Member access and indexing directly attached to a primary: `a.b`, `a.0`, `a[i]`.
    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            let segment = match self.peek_char() {
                Some('.')
                    if self
                        .peek_char_at(1)
                        .map_or(false, |c| is_ident_start(c) || c.is_ascii_digit()) =>
                {
                    self.advance(1);
                    self.parse_member_segment()?
                }
                Some('[') => self.parse_index_segment()?,
                _ => return Ok(expr),
            };
            expr = match expr {
                Expr::Reference { name, mut path } => {
                    path.push(segment);
                    Expr::Reference { name, path }
                }
                Expr::Access { target, mut path } => {
                    path.push(segment);
                    Expr::Access { target, path }
                }
                other => Expr::Access {
                    target: Box::new(other),
                    path: vec![segment],
                },
            };
        }
    }

    fn parse_member_segment(&mut self) -> Result<RefSegment, SyntaxError> {
        match self.peek_char() {
            Some(ch) if ch.is_ascii_digit() => {
                let begin = self.position();
                let start = self.pos;
                while let Some(ch) = self.peek_char() {
                    if ch.is_ascii_digit() {
                        self.advance(1);
                    } else {
                        break;
                    }
                }
                self.input[start..self.pos]
                    .parse::<usize>()
                    .map(RefSegment::Index)
                    .map_err(|_| self.error_span("Invalid array index", begin))
            }
            _ => self.parse_identifier().map(RefSegment::Field),
        }
    }

    fn parse_index_segment(&mut self) -> Result<RefSegment, SyntaxError> {
        let begin = self.position();
        self.expect_char('[')?;
        let index = self.delimited(|p| {
            p.skip_ws();
            let index = p.parse_expr()?;
            p.skip_ws();
            Ok(index)
        })?;
        if !self.eat_char(']') {
            return Err(self.error_span("Expected ']' after index", begin));
        }
        Ok(match index {
            Expr::Literal(Value::Int(i)) if i >= 0 => match usize::try_from(i) {
                Ok(i) => RefSegment::Index(i),
                Err(_) => RefSegment::Dynamic(Box::new(Expr::Literal(Value::Int(i)))),
            },
            Expr::Literal(Value::String(key)) => RefSegment::Field(key),
            other => RefSegment::Dynamic(Box::new(other)),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_char() {
            Some('(') => self.parse_parenthesized(),
            Some('[') => self.parse_array(),
            Some('{') => self.parse_map_entries().map(Expr::Map),
            Some('"') => self
                .parse_double_quoted_string()
                .map(|s| Expr::Literal(Value::String(s))),
            Some('\'') => self
                .parse_single_quoted_string()
                .map(|s| Expr::Literal(Value::String(s))),
            Some('$') if self.peek_char_at(1) == Some('"') => self.parse_format_string(),
            Some(ch) if ch.is_ascii_digit() => self.parse_number(),
            Some(ch) if is_ident_start(ch) => self.parse_word(),
            _ => Err(self.error_point("Expected a value")),
        }
    }

    /// A keyword literal or the head of a reference.
    fn parse_word(&mut self) -> Result<Expr, SyntaxError> {
        let word = self.parse_identifier()?;
        Ok(match word.as_str() {
            "true" => Expr::Literal(Value::Bool(true)),
            "false" => Expr::Literal(Value::Bool(false)),
            "none" | "null" => Expr::Literal(Value::None),
            _ => Expr::Reference {
                name: word,
                path: Vec::new(),
            },
        })
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, SyntaxError> {
        let begin = self.position();
        self.expect_char('(')?;
        self.delimited(|p| {
            p.skip_ws();
            let inner = p.parse_expr()?;
            p.skip_ws();
            if p.eat_char(')') {
                Ok(inner)
            } else if p.at_end() {
                Err(p.error_span("Unclosed '('", begin))
            } else {
                Err(p.error_point("Expected ')'"))
            }
        })
    }

    // ── Numbers ─────────────────────────────────────────────────────

    /// Integers (`42`, `-7`, `1_000`, `0x1F`) and floats (`1.5`, `2e10`).
    fn parse_number(&mut self) -> Result<Expr, SyntaxError> {
        let begin = self.position();
        let start = self.pos;
        let negative = self.eat_char('-');

        if self.starts_with("0x") || self.starts_with("0X") {
            self.advance(2);
            let digits_start = self.pos;
            while let Some(ch) = self.peek_char() {
                if ch.is_ascii_hexdigit() || ch == '_' {
                    self.advance(1);
                } else {
                    break;
                }
            }
            let digits: String = self.input[digits_start..self.pos]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            if digits.is_empty() {
                return Err(self.error_span("Expected hex digits", begin));
            }
            self.reject_trailing_word(begin)?;
            let text = if negative {
                format!("-{}", digits)
            } else {
                digits
            };
            return i64::from_str_radix(&text, 16)
                .map(|n| Expr::Literal(Value::Int(n)))
                .map_err(|_| self.error_span("Integer literal out of range", begin));
        }

        self.consume_digits();
        let mut is_float = false;

        if self.peek_char() == Some('.') && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            is_float = true;
            self.advance(1);
            self.consume_digits();
        }

        if let Some('e' | 'E') = self.peek_char() {
            self.advance(1);
            if let Some('+' | '-') = self.peek_char() {
                self.advance(1);
            }
            if !self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                return Err(self.error_span("Expected exponent digits", begin));
            }
            is_float = true;
            self.consume_digits();
        }

        self.reject_trailing_word(begin)?;

        let text: String = self.input[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if is_float {
            text.parse::<f64>()
                .map(|x| Expr::Literal(Value::Float(x)))
                .map_err(|_| self.error_span(format!("Invalid number: {}", text), begin))
        } else {
            text.parse::<i64>()
                .map(|n| Expr::Literal(Value::Int(n)))
                .map_err(|_| self.error_span("Integer literal out of range", begin))
        }
    }

    fn consume_digits(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() || ch == '_' {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    /// `12abc` is neither a number nor an identifier.
    fn reject_trailing_word(&mut self, begin: Position) -> Result<(), SyntaxError> {
        match self.peek_char() {
            Some(ch) if is_ident_char(ch) => {
                while let Some(ch) = self.peek_char() {
                    if is_ident_char(ch) {
                        self.advance(ch.len_utf8());
                    } else {
                        break;
                    }
                }
                Err(self.error_span("Invalid number", begin))
            }
            _ => Ok(()),
        }
    }

    // ── Strings ─────────────────────────────────────────────────────

    fn parse_double_quoted_string(&mut self) -> Result<String, SyntaxError> {
        let begin = self.position();
        self.expect_char('"')?;
        let mut result = String::new();
        loop {
            match self.peek_char() {
                None | Some('\r') | Some('\n') => {
                    return Err(self.error_span("Unterminated string", begin));
                }
                Some('"') => {
                    self.advance(1);
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance(1);
                    result.push(self.parse_escape_char()?);
                }
                Some(ch) => {
                    self.advance(ch.len_utf8());
                    result.push(ch);
                }
            }
        }
    }

    /// Parse a raw single-quoted string.
    /// Backslash is literal in the output but pairs with the next character
    /// for delimiter purposes (so `\'` does not end the string).
    fn parse_single_quoted_string(&mut self) -> Result<String, SyntaxError> {
        let begin = self.position();
        self.expect_char('\'')?;
        let mut result = String::new();
        loop {
            match self.peek_char() {
                None | Some('\r') | Some('\n') => {
                    return Err(self.error_span("Unterminated string", begin));
                }
                Some('\'') => {
                    self.advance(1);
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance(1);
                    result.push('\\');
                    match self.peek_char() {
                        None | Some('\r') | Some('\n') => {
                            return Err(self.error_span("Unterminated string", begin));
                        }
                        Some(ch) => {
                            self.advance(ch.len_utf8());
                            result.push(ch);
                        }
                    }
                }
                Some(ch) => {
                    self.advance(ch.len_utf8());
                    result.push(ch);
                }
            }
        }
    }

    /// `$"text {expr} text"`; `{{` and `}}` are literal braces.
    fn parse_format_string(&mut self) -> Result<Expr, SyntaxError> {
        let begin = self.position();
        self.advance(2);
        let mut parts = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek_char() {
                None | Some('\r') | Some('\n') => {
                    return Err(self.error_span("Unterminated format string", begin));
                }
                Some('"') => {
                    self.advance(1);
                    break;
                }
                Some('\\') => {
                    self.advance(1);
                    text.push(self.parse_escape_char()?);
                }
                Some('{') if self.starts_with("{{") => {
                    self.advance(2);
                    text.push('{');
                }
                Some('}') if self.starts_with("}}") => {
                    self.advance(2);
                    text.push('}');
                }
                Some('}') => {
                    return Err(self.error_point("Unmatched '}' in format string (use '}}')"));
                }
                Some('{') => {
                    let hole = self.position();
                    self.advance(1);
                    if !text.is_empty() {
                        parts.push(FormatPart::Text(std::mem::take(&mut text)));
                    }
                    let expr = self.delimited(|p| {
                        p.skip_ws();
                        let expr = p.parse_expr()?;
                        p.skip_ws();
                        Ok(expr)
                    })?;
                    if !self.eat_char('}') {
                        return Err(self.error_span("Expected '}' to close format hole", hole));
                    }
                    parts.push(FormatPart::Expr(expr));
                }
                Some(ch) => {
                    self.advance(ch.len_utf8());
                    text.push(ch);
                }
            }
        }
        if !text.is_empty() {
            parts.push(FormatPart::Text(text));
        }
        Ok(match parts.as_slice() {
            [] => Expr::Literal(Value::String(String::new())),
            [FormatPart::Text(only)] => Expr::Literal(Value::String(only.clone())),
            _ => Expr::Format(parts),
        })
    }

    fn parse_escape_char(&mut self) -> Result<char, SyntaxError> {
        match self.peek_char() {
            None => Err(self.error_point("Unterminated escape sequence")),
            Some('b') => {
                self.advance(1);
                Ok('\u{0008}')
            }
            Some('f') => {
                self.advance(1);
                Ok('\u{000C}')
            }
            Some('n') => {
                self.advance(1);
                Ok('\n')
            }
            Some('r') => {
                self.advance(1);
                Ok('\r')
            }
            Some('t') => {
                self.advance(1);
                Ok('\t')
            }
            Some('u') => {
                let begin = self.position();
                self.advance(1);
                let high = self.parse_hex4(begin)?;
                let code_point = if (0xD800..0xDC00).contains(&high) {
                    if !self.starts_with("\\u") {
                        return Err(self.error_span("Expected a low surrogate escape", begin));
                    }
                    self.advance(2);
                    let low = self.parse_hex4(begin)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(self.error_span("Invalid low surrogate escape", begin));
                    }
                    0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                } else {
                    high
                };
                char::from_u32(code_point).ok_or_else(|| {
                    self.error_span(
                        format!("Invalid unicode code point: \\u{:04X}", code_point),
                        begin,
                    )
                })
            }
            Some(ch) => {
                // Passthrough: \x -> x
                self.advance(ch.len_utf8());
                Ok(ch)
            }
        }
    }

    fn parse_hex4(&mut self, begin: Position) -> Result<u32, SyntaxError> {
        let start = self.pos;
        for _ in 0..4 {
            match self.peek_char() {
                Some(ch) if ch.is_ascii_hexdigit() => self.advance(1),
                _ => return Err(self.error_span("Expected 4 hex digits in \\uXXXX", begin)),
            }
        }
        let hex = &self.input[start..self.pos];
        u32::from_str_radix(hex, 16)
            .map_err(|_| self.error_span(format!("Invalid hex in \\u escape: {}", hex), begin))
    }

    // ── Arrays ──────────────────────────────────────────────────────

    fn parse_array(&mut self) -> Result<Expr, SyntaxError> {
        let begin = self.position();
        self.expect_char('[')?;
        self.delimited(|p| {
            p.skip_ws();
            let mut elements = Vec::new();
            if p.eat_char(']') {
                return Ok(Expr::Array(elements));
            }
            if p.at_end() {
                return Err(p.error_span("Unclosed '['", begin));
            }
            elements.push(p.parse_expr()?);

            loop {
                p.skip_ws();
                if p.eat_char(']') {
                    return Ok(Expr::Array(elements));
                }
                if p.eat_char(',') {
                    p.skip_ws();
                    // Allow trailing comma
                    if p.eat_char(']') {
                        return Ok(Expr::Array(elements));
                    }
                    if p.at_end() {
                        return Err(p.error_span("Unclosed '['", begin));
                    }
                    elements.push(p.parse_expr()?);
                } else if p.at_end() {
                    return Err(p.error_span("Unclosed '['", begin));
                } else {
                    return Err(p.error_point("Expected ',' or ']' in array"));
                }
            }
        })
    }

    // ── Maps ────────────────────────────────────────────────────────

    fn parse_map_entries(&mut self) -> Result<Vec<MapEntry>, SyntaxError> {
        let begin = self.position();
        self.expect_char('{')?;
        self.delimited(|p| {
            let mut entries = Vec::new();
            loop {
                p.skip_ws_and_commas();
                if p.eat_char('}') {
                    return Ok(entries);
                }
                if p.at_end() {
                    return Err(p.error_span("Unclosed '{'", begin));
                }
                entries.push(p.parse_map_entry()?);
                p.skip_inline_ws();
                match p.peek_char() {
                    None | Some(',' | '}' | '\r' | '\n' | '#') => {}
                    Some(_) => return Err(p.error_point("Expected ',' or '}' in map")),
                }
            }
        })
    }

    fn parse_map_entry(&mut self) -> Result<MapEntry, SyntaxError> {
        let begin = self.position();
        let key = self.parse_key_path()?;
        self.skip_ws();
        if !(self.eat_char(':') || self.eat_char('=')) {
            return Err(self.error_point("Expected ':' or '=' after key"));
        }
        self.skip_ws();
        let value = self.parse_expr()?;
        Ok(MapEntry {
            key,
            value,
            span: self.span_from(begin),
        })
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic()
        || ch == '_'
        || ('\u{00C0}'..='\u{024F}').contains(&ch)
        || ('\u{1E00}'..='\u{1EFF}').contains(&ch)
}

fn is_ident_char(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}
