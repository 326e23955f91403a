//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into an AST.
//! CONTEXT: This is the second stage of the parsing pipeline. It takes the
//! tokens of a whole document from the Lexer and builds one Expression per
//! non-blank line.
//!
//! GRAMMAR:
//!   program        --> (statement? NEWLINE)* statement? EOF
//!   statement      --> frontmatter | assignment | expression
//!   frontmatter    --> "@" IDENTIFIER "." IDENTIFIER "=" expression
//!   assignment     --> IDENTIFIER "=" expression
//!   expression     --> additive ( ("==" | "!=" | "<" | ">" | "<=" | ">=") additive )?
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "%") unary | "/" TIMEUNIT | "/" unary )* natural?
//!   natural        --> "in" UNIT | "as" "napkin" | "per" TIMEUNIT | "over" unary
//!                    | "at" capacity ("per" | "/") UNIT ("with" unary "buffer")?
//!                    | "with" capacity ("and" unary)?
//!                    | "downtime" "per" TIMEUNIT
//!   capacity       --> unary ( "*" unary | "/" TIMEUNIT | "/" unary )*   // stops at "/" UNIT
//!   unary          --> ("-" | "+") unary | power
//!   power          --> primary ( "^" unary )?
//!   primary        --> literal | PERCENT "of" unary | IDENTIFIER
//!                    | function_call | "average of" arguments | "square root of" unary
//!                    | "(" expression ")"
//!   function_call  --> IDENTIFIER "(" arguments? ")"
//!   arguments      --> expression ("," expression)*
//!
//! The natural-language suffixes are tried once, after the multiplicative
//! chain, in the order listed; the first keyword that matches wins.

use crate::ast::{
    BinaryOperator, BuiltinFunction, ComparisonOperator, Expression, ExpressionKind, TimeUnit,
    UnaryOperator,
};
use crate::config::ParserConfig;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{boolean_keyword, lex};
use crate::token::{Span, Token, TokenKind};
use crate::units::{canonicalize, is_currency_code, is_valid_unit, multi_word_unit};

/// The Parser holds the token buffer, the cursor, and the running nesting depth.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    config: ParserConfig,
}

impl Parser {
    /// Creates a parser over a token buffer produced by `lex`.
    pub fn new(mut tokens: Vec<Token>, config: ParserConfig) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::EOF) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::EOF, "", span));
        }
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            config,
        }
    }

    /// Parses every statement in the buffer. The token budget is checked once,
    /// before any parsing work.
    pub fn parse_program(&mut self) -> ParseResult<Vec<Expression>> {
        self.check_token_count()?;

        let mut statements = Vec::new();
        loop {
            while self.current().kind == TokenKind::Newline {
                self.advance();
            }
            if self.current().kind == TokenKind::EOF {
                break;
            }

            statements.push(self.parse_statement()?);

            match &self.current().kind {
                TokenKind::Newline | TokenKind::EOF => {}
                TokenKind::Assign => {
                    return Err(self.error_here(
                        "'=' is only allowed at the start of an assignment; use '==' to compare",
                    ));
                }
                TokenKind::RParen => return Err(self.error_here("unmatched closing parenthesis")),
                other => {
                    return Err(self.error_here(format!(
                        "unexpected '{}' after expression",
                        other
                    )));
                }
            }
        }

        log::debug!(
            "parsed {} statement(s) from {} token(s)",
            statements.len(),
            self.tokens.len()
        );
        Ok(statements)
    }

    // ==================== Cursor ====================

    fn current(&self) -> &Token {
        // The buffer always ends with EOF and the cursor never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn snapshot(&self) -> usize {
        self.pos
    }

    fn restore(&mut self, snapshot: usize) {
        self.pos = snapshot;
    }

    fn expect(&mut self, expected: TokenKind, message: &str) -> ParseResult<Token> {
        if self.current().kind == expected {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(message, self.current().span)
    }

    /// A time unit identifier `offset` tokens ahead, if there is one.
    fn time_unit_at(&self, offset: usize) -> Option<TimeUnit> {
        self.peek_kind(offset).identifier().and_then(TimeUnit::parse)
    }

    fn at_end_of_statement(&self, offset: usize) -> bool {
        matches!(self.peek_kind(offset), TokenKind::Newline | TokenKind::EOF)
    }

    // ==================== Security limits ====================

    fn check_token_count(&self) -> ParseResult<()> {
        let count = self
            .tokens
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::EOF))
            .count();
        if count > self.config.max_token_count {
            log::warn!(
                "rejecting input: token count {} exceeds limit {}",
                count,
                self.config.max_token_count
            );
            return Err(ParseError::security(
                format!(
                    "token count {} exceeds the maximum of {}",
                    count, self.config.max_token_count
                ),
                self.current().span,
            ));
        }
        Ok(())
    }

    fn enter_nesting(&mut self, span: Span) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > self.config.max_nesting_depth {
            log::warn!(
                "rejecting input: nesting depth exceeds limit {} at {}:{}",
                self.config.max_nesting_depth,
                span.line,
                span.column
            );
            return Err(ParseError::security(
                format!(
                    "maximum nesting depth of {} exceeded",
                    self.config.max_nesting_depth
                ),
                span,
            ));
        }
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Runs `parse` one nesting level deeper. Every grammar rule that
    /// recurses into a sub-expression goes through here or through
    /// `enter_nesting` directly.
    fn nested<T>(
        &mut self,
        span: Span,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.enter_nesting(span)?;
        let result = parse(self);
        self.exit_nesting();
        result
    }

    // ==================== Statements ====================

    fn parse_statement(&mut self) -> ParseResult<Expression> {
        let start = self.current().span;

        match (&self.current().kind, self.peek_kind(1)) {
            (TokenKind::At, _) => self.parse_frontmatter(),

            (TokenKind::Identifier(name), TokenKind::Assign) => {
                if boolean_keyword(name).is_some() {
                    return Err(self.error_here(format!(
                        "cannot assign to boolean keyword '{}'",
                        name
                    )));
                }
                let name = name.clone();
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                let span = start.to(value.span);
                Ok(Expression::new(
                    ExpressionKind::Assignment {
                        name,
                        value: Box::new(value),
                    },
                    span,
                ))
            }

            (TokenKind::Boolean(_), TokenKind::Assign) => {
                let lexeme = self.current().lexeme.clone();
                Err(self.error_here(format!(
                    "cannot assign to boolean keyword '{}'",
                    lexeme
                )))
            }

            _ => self.parse_expression(),
        }
    }

    /// `@globals.tax = 8%`
    fn parse_frontmatter(&mut self) -> ParseResult<Expression> {
        let start = self.advance().span;

        let namespace = match &self.current().kind {
            TokenKind::Identifier(name) => name.clone(),
            _ => return Err(self.error_here("expected namespace after '@'")),
        };
        self.advance();
        self.expect(TokenKind::Dot, "expected '.' after frontmatter namespace")?;

        let key = match &self.current().kind {
            TokenKind::Identifier(name) => name.clone(),
            _ => return Err(self.error_here("expected key after '.'")),
        };
        self.advance();
        self.expect(TokenKind::Assign, "expected '=' in frontmatter assignment")?;

        let value = self.parse_expression()?;
        let span = start.to(value.span);
        Ok(Expression::new(
            ExpressionKind::FrontmatterAssignment {
                namespace,
                key,
                value: Box::new(value),
            },
            span,
        ))
    }

    // ==================== Expressions ====================

    /// Entry point for expression parsing. Comparison is non-associative.
    fn parse_expression(&mut self) -> ParseResult<Expression> {
        let left = self.parse_additive()?;

        let Some(op) = comparison_operator(&self.current().kind) else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_additive()?;

        if comparison_operator(&self.current().kind).is_some() {
            return Err(self.error_here("comparison operators cannot be chained"));
        }

        let span = left.span.to(right.span);
        Ok(Expression::new(
            ExpressionKind::Comparison {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        ))
    }

    /// Parses additive expressions (+ and -).
    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    /// Parses multiplicative expressions (*, /, %) including rate formation,
    /// then the trailing natural-language constructs.
    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;

        loop {
            match &self.current().kind {
                TokenKind::Asterisk => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = binary(left, BinaryOperator::Multiply, right);
                }
                TokenKind::Modulo => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = binary(left, BinaryOperator::Modulo, right);
                }
                TokenKind::Slash => {
                    if let Some(per) = self.time_unit_at(1) {
                        self.advance();
                        let unit = self.advance();
                        left = rate(left, per, unit.span);
                    } else {
                        self.advance();
                        let right = self.parse_unary()?;
                        left = binary(left, BinaryOperator::Divide, right);
                    }
                }
                _ => break,
            }
        }

        self.parse_natural_suffix(left)
    }

    /// Checks the trailing keywords in fixed priority order. Each branch
    /// validates the tokens it needs before consuming anything.
    fn parse_natural_suffix(&mut self, base: Expression) -> ParseResult<Expression> {
        let kind = &self.current().kind;
        if kind.is_word("in") {
            self.parse_unit_conversion(base)
        } else if kind.is_word("as") {
            self.parse_napkin(base)
        } else if kind.is_word("per") {
            self.parse_per(base)
        } else if kind.is_word("over") {
            self.parse_over(base)
        } else if kind.is_word("at") {
            self.parse_capacity(base)
        } else if kind.is_word("with") {
            self.parse_requires(base)
        } else if kind.is_word("downtime") {
            self.parse_downtime(base)
        } else {
            Ok(base)
        }
    }

    /// `x in cm`, `x in nautical miles`, `x in hours`, `x in EUR`
    fn parse_unit_conversion(&mut self, base: Expression) -> ParseResult<Expression> {
        let Some(word) = self.peek_kind(1).identifier().map(str::to_string) else {
            self.advance();
            return Err(self.error_here("expected a unit after 'in'"));
        };
        self.advance();
        let mut end = self.advance().span;

        let fused = self
            .current()
            .kind
            .identifier()
            .and_then(|second| multi_word_unit(&word, second));
        let target = match fused {
            Some(canonical) => {
                end = self.advance().span;
                canonical.to_string()
            }
            None => conversion_target(&word),
        };

        let span = base.span.to(end);
        Ok(Expression::new(
            ExpressionKind::UnitConversion {
                value: Box::new(base),
                target,
            },
            span,
        ))
    }

    /// `x as napkin`
    fn parse_napkin(&mut self, base: Expression) -> ParseResult<Expression> {
        if !self.peek_kind(1).is_word("napkin") {
            self.advance();
            return Err(self.error_here("expected 'napkin' after 'as'"));
        }
        self.advance();
        let end = self.advance().span;
        let span = base.span.to(end);
        Ok(Expression::new(
            ExpressionKind::NapkinConversion {
                value: Box::new(base),
            },
            span,
        ))
    }

    /// `100 MB per second` forms a rate; `(rate) per hour` converts one.
    fn parse_per(&mut self, base: Expression) -> ParseResult<Expression> {
        let Some(per) = self.time_unit_at(1) else {
            self.advance();
            return Err(self.error_here("expected a time unit after 'per'"));
        };
        self.advance();
        let unit = self.advance();

        if matches!(base.kind, ExpressionKind::Rate { .. }) {
            let span = base.span.to(unit.span);
            let unit_arg = Expression::new(
                ExpressionKind::Identifier(per.name().to_string()),
                unit.span,
            );
            return Ok(call(BuiltinFunction::ConvertRate, vec![base, unit_arg], span));
        }
        Ok(rate(base, per, unit.span))
    }

    /// `100 MB/s over 1 day`
    fn parse_over(&mut self, base: Expression) -> ParseResult<Expression> {
        if self.at_end_of_statement(1) {
            self.advance();
            return Err(self.error_here("expected a duration after 'over'"));
        }
        self.advance();
        let duration = self.parse_unary()?;
        let span = base.span.to(duration.span);
        Ok(call(BuiltinFunction::Accumulate, vec![base, duration], span))
    }

    /// `10000 req/s at 500 req/s per server [with 20% buffer]`
    fn parse_capacity(&mut self, demand: Expression) -> ParseResult<Expression> {
        if self.at_end_of_statement(1) {
            self.advance();
            return Err(self.error_here("expected a capacity after 'at'"));
        }
        self.advance();
        let capacity = self.parse_capacity_operand()?;

        let has_separator =
            self.current().kind.is_word("per") || self.current().kind == TokenKind::Slash;
        let unit_name = match self.peek_kind(1).identifier() {
            Some(name) if has_separator => name.to_string(),
            _ => return Err(self.error_here("expected 'per <unit>' after capacity")),
        };
        self.advance();
        let unit_token = self.advance();
        let unit = Expression::new(ExpressionKind::Identifier(unit_name), unit_token.span);

        let mut end = unit_token.span;
        let mut args = vec![demand, capacity, unit];

        if self.current().kind.is_word("with") {
            let snapshot = self.snapshot();
            self.advance();
            let buffer = self.parse_unary()?;
            if !self.current().kind.is_word("buffer") {
                self.restore(snapshot);
                return Err(self.error_here("expected '<percent> buffer' after 'with'"));
            }
            end = self.advance().span;
            args.push(buffer);
        }

        let span = args[0].span.to(end);
        Ok(call(BuiltinFunction::Capacity, args, span))
    }

    /// The capacity operand of `at ... per <unit>`. A `/` followed by a time
    /// unit forms a rate; a `/` followed by any other identifier belongs to
    /// the enclosing clause and ends the operand. `per` is never consumed here.
    fn parse_capacity_operand(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;

        loop {
            match &self.current().kind {
                TokenKind::Asterisk => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = binary(left, BinaryOperator::Multiply, right);
                }
                TokenKind::Slash => {
                    if let Some(per) = self.time_unit_at(1) {
                        self.advance();
                        let unit = self.advance();
                        left = rate(left, per, unit.span);
                    } else if self.peek_kind(1).identifier().is_some() {
                        break;
                    } else {
                        self.advance();
                        let right = self.parse_unary()?;
                        left = binary(left, BinaryOperator::Divide, right);
                    }
                }
                _ => break,
            }
        }

        Ok(left)
    }

    /// `10000 req/s with 500 req/s [and 20%]`
    fn parse_requires(&mut self, load: Expression) -> ParseResult<Expression> {
        if self.at_end_of_statement(1) {
            self.advance();
            return Err(self.error_here("expected a capacity after 'with'"));
        }
        self.advance();
        let capacity = self.parse_capacity_operand()?;
        let mut end = capacity.span;
        let mut args = vec![load, capacity];

        if self.current().kind.is_word("and") {
            if self.at_end_of_statement(1) {
                self.advance();
                return Err(self.error_here("expected a buffer percentage after 'and'"));
            }
            self.advance();
            let buffer = self.parse_unary()?;
            end = buffer.span;
            args.push(buffer);
        }

        let span = args[0].span.to(end);
        Ok(call(BuiltinFunction::Requires, args, span))
    }

    /// `99.9% downtime per month`
    fn parse_downtime(&mut self, availability: Expression) -> ParseResult<Expression> {
        let Some(per) = self
            .time_unit_at(2)
            .filter(|_| self.peek_kind(1).is_word("per"))
        else {
            self.advance();
            return Err(self.error_here("expected 'per <time unit>' after 'downtime'"));
        };
        self.advance();
        self.advance();
        let unit_token = self.advance();
        let unit = Expression::new(
            ExpressionKind::Identifier(per.name().to_string()),
            unit_token.span,
        );
        let span = availability.span.to(unit_token.span);
        Ok(call(BuiltinFunction::Downtime, vec![availability, unit], span))
    }

    /// Parses prefix + and -. Each level counts toward the nesting limit.
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Plus => UnaryOperator::Plus,
            _ => return self.parse_power(),
        };

        let token = self.advance();
        self.enter_nesting(token.span)?;
        let operand = self.parse_unary();
        self.exit_nesting();
        let operand = operand?;

        let span = token.span.to(operand.span);
        Ok(Expression::new(
            ExpressionKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// Parses power/exponentiation expressions (^), right-associative.
    fn parse_power(&mut self) -> ParseResult<Expression> {
        let left = self.parse_primary()?;

        if self.current().kind == TokenKind::Caret {
            let caret = self.advance();
            let right = self.nested(caret.span, Self::parse_unary)?;
            return Ok(binary(left, BinaryOperator::Power, right));
        }

        Ok(left)
    }

    /// Parses primary expressions (literals, identifiers, function calls, parentheses).
    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let token = self.current().clone();
        let span = token.span;

        let kind = match token.kind {
            TokenKind::Number(amount) => {
                self.advance();
                // `100cm`: a registered unit written directly against the number.
                let next = self.current();
                if let TokenKind::Identifier(word) = &next.kind {
                    if next.span.line == span.line
                        && next.span.column == span.end_column
                        && is_valid_unit(word)
                    {
                        let unit = canonicalize(word);
                        let end = self.advance().span;
                        return Ok(Expression::new(
                            ExpressionKind::Quantity { amount, unit },
                            span.to(end),
                        ));
                    }
                }
                ExpressionKind::Number(amount)
            }

            TokenKind::Percent(fraction) => {
                self.advance();
                let percent = Expression::new(ExpressionKind::Number(fraction), span);
                if self.current().kind.is_word("of") && !self.at_end_of_statement(1) {
                    self.advance();
                    let base = self.nested(span, Self::parse_unary)?;
                    let full = span.to(base.span);
                    return Ok(Expression::new(
                        ExpressionKind::PercentageOf {
                            percent: Box::new(percent),
                            base: Box::new(base),
                        },
                        full,
                    ));
                }
                return Ok(percent);
            }

            TokenKind::Currency {
                amount,
                symbol,
                code,
            } => {
                self.advance();
                ExpressionKind::Currency {
                    amount,
                    symbol,
                    code,
                }
            }

            TokenKind::Quantity { amount, unit } => {
                self.advance();
                ExpressionKind::Quantity { amount, unit }
            }

            TokenKind::Duration { amount, unit } => {
                self.advance();
                ExpressionKind::Duration { amount, unit }
            }

            TokenKind::Date { month, day, year } => {
                self.advance();
                ExpressionKind::Date { month, day, year }
            }

            TokenKind::Time {
                hour,
                minute,
                second,
            } => {
                self.advance();
                ExpressionKind::Time {
                    hour,
                    minute,
                    second,
                }
            }

            TokenKind::RelativeDate(relative) => {
                self.advance();
                ExpressionKind::RelativeDate(relative)
            }

            TokenKind::Boolean(value) => {
                self.advance();
                ExpressionKind::Boolean(value)
            }

            TokenKind::Identifier(name) => {
                self.advance();
                if self.current().kind == TokenKind::LParen {
                    return self.parse_function_call(name, span);
                }
                ExpressionKind::Identifier(name)
            }

            TokenKind::FuncAverageOf => {
                self.advance();
                let args = self.nested(span, |parser| {
                    let mut args = vec![parser.parse_additive()?];
                    while parser.current().kind == TokenKind::Comma {
                        parser.advance();
                        args.push(parser.parse_additive()?);
                    }
                    Ok(args)
                })?;
                let end = args.last().map_or(span, |a| a.span);
                return Ok(call(BuiltinFunction::Avg, args, span.to(end)));
            }

            TokenKind::FuncSquareRootOf => {
                self.advance();
                let arg = self.nested(span, Self::parse_unary)?;
                let end = arg.span;
                return Ok(call(BuiltinFunction::Sqrt, vec![arg], span.to(end)));
            }

            TokenKind::LParen => {
                self.advance();
                self.enter_nesting(span)?;
                let expr = self.parse_expression();
                self.exit_nesting();
                let expr = expr?;
                self.expect(TokenKind::RParen, "expected ')' to close '('")?;
                return Ok(expr);
            }

            TokenKind::EOF | TokenKind::Newline => {
                return Err(ParseError::syntax("unexpected end of expression", span));
            }

            TokenKind::RParen => {
                return Err(ParseError::syntax("unmatched closing parenthesis", span));
            }

            other => {
                return Err(ParseError::syntax(
                    format!("unexpected '{}'", other),
                    span,
                ));
            }
        };

        Ok(Expression::new(kind, span))
    }

    /// Parses a function call like avg(1, 2, 10). Arity is checked here.
    fn parse_function_call(&mut self, name: String, start: Span) -> ParseResult<Expression> {
        let Some(func) = BuiltinFunction::from_name(&name) else {
            return Err(ParseError::syntax(
                format!("unknown function '{}'", name),
                start,
            ));
        };

        // Consume the '('
        let open = self.advance();
        self.enter_nesting(open.span)?;
        let args = self.parse_arguments();
        self.exit_nesting();
        let args = args?;

        let close = self.expect(TokenKind::RParen, "expected ')' to close function call")?;

        if !func.accepts(args.len()) {
            return Err(ParseError::syntax(arity_message(func, args.len()), start));
        }

        Ok(call(func, args, start.to(close.span)))
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut args = Vec::new();

        // Handle empty argument list
        if self.current().kind == TokenKind::RParen {
            return Ok(args);
        }

        args.push(self.parse_expression()?);
        while self.current().kind == TokenKind::Comma {
            self.advance();
            args.push(self.parse_expression()?);
        }

        Ok(args)
    }
}

fn comparison_operator(kind: &TokenKind) -> Option<ComparisonOperator> {
    let op = match kind {
        TokenKind::Equal => ComparisonOperator::Equal,
        TokenKind::NotEqual => ComparisonOperator::NotEqual,
        TokenKind::LessThan => ComparisonOperator::LessThan,
        TokenKind::GreaterThan => ComparisonOperator::GreaterThan,
        TokenKind::LessEqual => ComparisonOperator::LessEqual,
        TokenKind::GreaterEqual => ComparisonOperator::GreaterEqual,
        _ => return None,
    };
    Some(op)
}

/// Canonical form of a conversion target: time unit name, currency code, or
/// registry unit.
fn conversion_target(word: &str) -> String {
    if let Some(unit) = TimeUnit::parse(word) {
        return unit.name().to_string();
    }
    if is_currency_code(word) {
        return word.to_string();
    }
    canonicalize(word)
}

fn arity_message(func: BuiltinFunction, got: usize) -> String {
    let expected = match func.arity() {
        (min, None) => format!("at least {}", plural_arguments(min)),
        (min, Some(max)) if min == max => format!("exactly {}", plural_arguments(min)),
        (min, Some(max)) => format!("{} to {} arguments", min, max),
    };
    format!("{}() requires {}, got {}", func.name(), expected, got)
}

fn plural_arguments(n: usize) -> String {
    if n == 1 {
        "1 argument".to_string()
    } else {
        format!("{} arguments", n)
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    let span = left.span.to(right.span);
    Expression::new(
        ExpressionKind::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn rate(amount: Expression, per: TimeUnit, unit_span: Span) -> Expression {
    let span = amount.span.to(unit_span);
    Expression::new(
        ExpressionKind::Rate {
            amount: Box::new(amount),
            per,
        },
        span,
    )
}

fn call(func: BuiltinFunction, args: Vec<Expression>, span: Span) -> Expression {
    Expression::new(ExpressionKind::FunctionCall { func, args }, span)
}

/// Convenience function to parse a document with the default limits.
pub fn parse(input: &str) -> ParseResult<Vec<Expression>> {
    parse_with_config(input, &ParserConfig::default())
}

pub fn parse_with_config(input: &str, config: &ParserConfig) -> ParseResult<Vec<Expression>> {
    let tokens = lex(input)?;
    let mut parser = Parser::new(tokens, *config);
    parser.parse_program()
}
