//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans CalcMark source text and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. Each line is
//! lexed independently. Literal recognition is context-sensitive: the lexer
//! decides here whether `1.5k` is a scaled number, whether `100 MB` is a
//! quantity, whether `2 hours and 30 minutes` is one duration, and whether
//! `average of` is a function phrase. All lookahead is bounded and stays on
//! the current line.
//!
//! SUPPORTED LITERALS:
//! - Numbers: 1234, 1,234, 1_234, 1.5, 1.5k, 2M, 3B, 1T, 1.23e10, 5%
//! - Currency: $100, € 50, 100 USD
//! - Quantities: 5 kg, 1 nautical mile, 3 apples
//! - Durations: 5 days, 1 hour and 30 minutes
//! - Dates and times: March 15, Jan 1 2025, 10:30, 3pm, today, next week
//! - Operators: + - * / % ^ = == != < > <= >= ( ) , @ .

use crate::ast::{Period, RelativeDate, TimeUnit};
use crate::error::{ParseError, ParseResult};
use crate::token::{Span, Token, TokenKind};
use crate::units::{
    canonicalize, currency_code_for_symbol, is_currency_code, is_reserved_word, is_user_unit,
    multi_word_unit,
};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Lexes a whole document. Lines are separated by `Newline` tokens and the
/// stream always ends with `EOF`. A leading byte-order mark is ignored.
pub fn lex(text: &str) -> ParseResult<Vec<Token>> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let mut tokens = Vec::new();
    let mut last_span = Span::new(1, 1, 1);

    for (index, line) in text.split('\n').enumerate() {
        let line_number = index + 1;
        let line = line.strip_suffix('\r').unwrap_or(line);
        if index > 0 {
            tokens.push(Token::new(TokenKind::Newline, "\n", last_span));
        }
        tokens.extend(Lexer::new(line, line_number).tokenize()?);
        let end = line.chars().count() + 1;
        last_span = Span::new(line_number, end, end);
    }

    tokens.push(Token::new(TokenKind::EOF, "", last_span));
    Ok(tokens)
}

/// Lexes raw bytes, rejecting invalid UTF-8 with the position of the first
/// offending byte.
pub fn lex_bytes(bytes: &[u8]) -> ParseResult<Vec<Token>> {
    match std::str::from_utf8(bytes) {
        Ok(text) => lex(text),
        Err(e) => {
            // The prefix up to valid_up_to() is valid UTF-8 by definition.
            let valid = String::from_utf8_lossy(&bytes[..e.valid_up_to()]);
            let line = valid.matches('\n').count() + 1;
            let column = valid.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
            Err(ParseError::syntax(
                "invalid UTF-8 sequence",
                Span::new(line, column, column + 1),
            ))
        }
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Lexer {
    pub fn new(input: &str, line: usize) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
            line,
        }
    }

    /// Lexes the whole line. Either every token is produced or an error is
    /// returned; there is no partial result.
    pub fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token.kind == TokenKind::EOF {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Advances the lexer and returns the next token (`EOF` at end of line).
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::EOF, "", self.span_from(start)));
        };

        let kind = match ch {
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Asterisk),
            '/' => self.single(TokenKind::Slash),
            '%' => self.single(TokenKind::Modulo),
            '^' => self.single(TokenKind::Caret),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            ',' => self.single(TokenKind::Comma),
            '@' => self.single(TokenKind::At),
            '.' => self.single(TokenKind::Dot),
            '=' => self.read_with_equals(TokenKind::Assign, TokenKind::Equal),
            '<' => self.read_with_equals(TokenKind::LessThan, TokenKind::LessEqual),
            '>' => self.read_with_equals(TokenKind::GreaterThan, TokenKind::GreaterEqual),
            '!' if self.char_at(self.pos + 1) == Some('=') => {
                self.pos += 2;
                TokenKind::NotEqual
            }
            c if currency_code_for_symbol(c).is_some() => self.read_currency()?,
            c if c.is_ascii_digit() => self.read_numeric()?,
            c if is_ident_start(c) => self.read_word()?,
            c => return Err(self.error_at(format!("unexpected character '{}'", c), start)),
        };

        Ok(Token::new(kind, self.lexeme_from(start), self.span_from(start)))
    }

    // ==================== Cursor helpers ====================

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn char_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    fn is_digit_at(&self, index: usize) -> bool {
        self.char_at(index).is_some_and(|c| c.is_ascii_digit())
    }

    /// True when `index` is past the end or not inside a word.
    fn is_boundary_at(&self, index: usize) -> bool {
        !self.char_at(index).is_some_and(is_ident_continue)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn read_with_equals(&mut self, plain: TokenKind, with_equals: TokenKind) -> TokenKind {
        if self.char_at(self.pos + 1) == Some('=') {
            self.pos += 2;
            with_equals
        } else {
            self.pos += 1;
            plain
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.line, start + 1, self.pos + 1)
    }

    fn lexeme_from(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn error_at(&self, message: impl Into<String>, index: usize) -> ParseError {
        ParseError::syntax(message, Span::new(self.line, index + 1, index + 2))
    }

    /// Reads the word starting at `index`, returning it with its end index.
    fn word_at(&self, index: usize) -> Option<(String, usize)> {
        if !self.char_at(index).is_some_and(is_ident_start) {
            return None;
        }
        let mut end = index;
        while self.char_at(end).is_some_and(is_ident_continue) {
            end += 1;
        }
        Some((self.chars[index..end].iter().collect(), end))
    }

    /// Reads the word after exactly one space at `index`.
    fn word_after_space(&self, index: usize) -> Option<(String, usize)> {
        if self.char_at(index) != Some(' ') {
            return None;
        }
        self.word_at(index + 1)
    }

    /// Matches a fixed phrase of words following `index`, each preceded by
    /// one or more spaces. Returns the end index of the last word.
    fn phrase_after(&self, index: usize, words: &[&str]) -> Option<usize> {
        let mut i = index;
        for expected in words {
            let gap_start = i;
            while self.char_at(i) == Some(' ') {
                i += 1;
            }
            if i == gap_start {
                return None;
            }
            let (word, end) = self.word_at(i)?;
            if !word.eq_ignore_ascii_case(expected) {
                return None;
            }
            i = end;
        }
        Some(i)
    }

    // ==================== Literals ====================

    /// `$100`, `€ 50`, `£1.5k`: zero or one space between symbol and number.
    fn read_currency(&mut self) -> ParseResult<TokenKind> {
        let symbol_index = self.pos;
        let symbol = self.chars[symbol_index];
        let code = currency_code_for_symbol(symbol).unwrap_or("USD");
        self.pos += 1;

        if self.peek() == Some(' ') && self.is_digit_at(self.pos + 1) {
            self.pos += 1;
        }
        if !self.is_digit_at(self.pos) {
            return Err(self.error_at(
                format!("currency symbol '{}' must be followed by a number", symbol),
                symbol_index,
            ));
        }

        let amount = self.scan_number()?;
        Ok(TokenKind::Currency {
            amount,
            symbol: symbol.to_string(),
            code: code.to_string(),
        })
    }

    fn read_numeric(&mut self) -> ParseResult<TokenKind> {
        if let Some(time) = self.try_time()? {
            return Ok(time);
        }

        let amount = self.scan_number()?;

        if self.peek() == Some('%') {
            self.pos += 1;
            return Ok(TokenKind::Percent(amount / Decimal::ONE_HUNDRED));
        }

        if let Some(kind) = self.try_unit_suffix(amount)? {
            return Ok(kind);
        }

        Ok(TokenKind::Number(amount))
    }

    /// Scans digits with optional grouping, fraction, exponent, and magnitude
    /// suffix, returning the expanded value.
    fn scan_number(&mut self) -> ParseResult<Decimal> {
        let start = self.pos;
        let mut text = String::new();

        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            text.push(c);
            self.pos += 1;
        }
        let leading_group = self.pos - start;

        // Thousands separators: groups of exactly three digits, one separator kind.
        // A comma is grouping whenever three digits follow it, so `avg(100,200,300)`
        // reads as the single number 100200300. Argument lists need `, ` between
        // three-digit values.
        let mut separator: Option<char> = None;
        while let Some(c) = self.peek().filter(|c| *c == ',' || *c == '_') {
            let valid_group = self.is_digit_group(self.pos + 1);
            let consistent = separator.is_none_or(|s| s == c);
            if valid_group && consistent && leading_group <= 3 {
                separator = Some(c);
                self.pos += 1;
                for _ in 0..3 {
                    text.push(self.chars[self.pos]);
                    self.pos += 1;
                }
            } else if c == '_' {
                return Err(self.error_at(
                    "invalid digit grouping: '_' must separate groups of three digits",
                    self.pos,
                ));
            } else {
                break;
            }
        }

        if self.peek() == Some('.') && self.is_digit_at(self.pos + 1) {
            text.push('.');
            self.pos += 1;
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                text.push(c);
                self.pos += 1;
            }
        }

        // Scientific notation only directly after the digits.
        let mut has_exponent = false;
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut i = self.pos + 1;
            if matches!(self.char_at(i), Some('+' | '-')) {
                i += 1;
            }
            if self.is_digit_at(i) {
                text.push('e');
                text.extend(self.chars[self.pos + 1..i].iter());
                self.pos = i;
                while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                    text.push(c);
                    self.pos += 1;
                }
                has_exponent = true;
            }
        }

        let parsed = if has_exponent {
            Decimal::from_scientific(&text)
        } else {
            Decimal::from_str(&text)
        };
        let value = parsed.map_err(|_| {
            self.error_at(format!("number '{}' is out of range", text), start)
        })?;

        if has_exponent {
            return Ok(value);
        }

        let multiplier: i64 = match self.peek() {
            Some('k' | 'K') => 1_000,
            Some('M') => 1_000_000,
            Some('B') => 1_000_000_000,
            Some('T') => 1_000_000_000_000,
            _ => return Ok(value),
        };
        // A suffix only counts at a word boundary: `5kg` is NUMBER + IDENTIFIER.
        if !self.is_boundary_at(self.pos + 1) {
            return Ok(value);
        }
        self.pos += 1;
        value
            .checked_mul(Decimal::from(multiplier))
            .ok_or_else(|| self.error_at(format!("number '{}' is out of range", text), start))
    }

    /// Three digits at `index` not followed by a fourth.
    fn is_digit_group(&self, index: usize) -> bool {
        (index..index + 3).all(|i| self.is_digit_at(i)) && !self.is_digit_at(index + 3)
    }

    /// `10:30`, `10:30:15`, `3pm`, `3:30 pm`.
    fn try_time(&mut self) -> ParseResult<Option<TokenKind>> {
        let start = self.pos;
        let mut i = start;
        while self.is_digit_at(i) {
            i += 1;
        }
        let digits = i - start;
        if digits == 0 || digits > 2 {
            return Ok(None);
        }
        let hour = self.two_digit_value(start, digits);

        let mut minute = 0;
        let mut second = 0;
        let mut has_clock = false;
        if self.char_at(i) == Some(':') && self.is_two_digits(i + 1) {
            minute = self.two_digit_value(i + 1, 2);
            i += 3;
            has_clock = true;
            if self.char_at(i) == Some(':') && self.is_two_digits(i + 1) {
                second = self.two_digit_value(i + 1, 2);
                i += 3;
            }
        }

        let meridiem = self
            .meridiem_at(i)
            .map(|pm| (pm, i + 2))
            .or_else(|| match self.char_at(i) {
                Some(' ') => self.meridiem_at(i + 1).map(|pm| (pm, i + 3)),
                _ => None,
            });

        if !has_clock && meridiem.is_none() {
            return Ok(None);
        }

        let hour = match meridiem {
            Some((is_pm, end)) => {
                if hour == 0 || hour > 12 {
                    return Err(self.error_at("hour must be between 1 and 12 with am/pm", start));
                }
                i = end;
                match (is_pm, hour) {
                    (true, 12) => 12,
                    (true, h) => h + 12,
                    (false, 12) => 0,
                    (false, h) => h,
                }
            }
            None => hour,
        };

        if hour > 23 || minute > 59 || second > 59 {
            return Err(self.error_at("invalid time of day", start));
        }

        self.pos = i;
        Ok(Some(TokenKind::Time {
            hour,
            minute,
            second,
        }))
    }

    fn is_two_digits(&self, index: usize) -> bool {
        self.is_digit_at(index) && self.is_digit_at(index + 1) && !self.is_digit_at(index + 2)
    }

    fn two_digit_value(&self, index: usize, len: usize) -> u32 {
        self.chars[index..index + len]
            .iter()
            .filter_map(|c| c.to_digit(10))
            .fold(0, |acc, d| acc * 10 + d)
    }

    /// Returns Some(true) for `pm`, Some(false) for `am` at `index`.
    fn meridiem_at(&self, index: usize) -> Option<bool> {
        let (word, _) = self.word_at(index)?;
        match word.to_ascii_lowercase().as_str() {
            "am" => Some(false),
            "pm" => Some(true),
            _ => None,
        }
    }

    /// A number followed by exactly one space and a word: currency code,
    /// duration, multi-word unit, or unit. Anything else leaves the cursor
    /// after the number so the word lexes as its own token.
    fn try_unit_suffix(&mut self, amount: Decimal) -> ParseResult<Option<TokenKind>> {
        let Some((word, word_end)) = self.word_after_space(self.pos) else {
            return Ok(None);
        };
        if is_reserved_word(&word) {
            return Ok(None);
        }

        if is_currency_code(&word) {
            self.pos = word_end;
            return Ok(Some(TokenKind::Currency {
                amount,
                symbol: word.clone(),
                code: word,
            }));
        }

        if let Some(unit) = TimeUnit::parse(&word) {
            self.pos = word_end;
            let (amount, unit) = self.extend_duration_chain(amount, unit)?;
            return Ok(Some(TokenKind::Duration { amount, unit }));
        }

        if let Some((second, second_end)) = self.word_after_space(word_end) {
            if let Some(canonical) = multi_word_unit(&word, &second) {
                self.pos = second_end;
                return Ok(Some(TokenKind::Quantity {
                    amount,
                    unit: canonical.to_string(),
                }));
            }
        }

        if is_user_unit(&word) {
            self.pos = word_end;
            return Ok(Some(TokenKind::Quantity {
                amount,
                unit: canonicalize(&word),
            }));
        }

        Ok(None)
    }

    /// Fuses `N unit and M unit [and ...]` into one duration expressed in the
    /// smallest unit that represents the total exactly.
    fn extend_duration_chain(
        &mut self,
        mut amount: Decimal,
        mut unit: TimeUnit,
    ) -> ParseResult<(Decimal, TimeUnit)> {
        loop {
            let saved = self.pos;
            let Some(number_start) = self.phrase_after(self.pos, &["and"]).map(|i| i + 1) else {
                break;
            };
            if self.char_at(number_start - 1) != Some(' ') || !self.is_digit_at(number_start) {
                break;
            }

            self.pos = number_start;
            let next_amount = match self.scan_number() {
                Ok(value) => value,
                Err(_) => {
                    self.pos = saved;
                    break;
                }
            };
            let next_unit = match self.word_after_space(self.pos) {
                Some((word, end)) => match TimeUnit::parse(&word) {
                    Some(u) => {
                        self.pos = end;
                        u
                    }
                    None => {
                        self.pos = saved;
                        break;
                    }
                },
                None => {
                    self.pos = saved;
                    break;
                }
            };

            let total = amount
                .checked_mul(unit.seconds())
                .zip(next_amount.checked_mul(next_unit.seconds()))
                .and_then(|(a, b)| a.checked_add(b))
                .ok_or_else(|| self.error_at("duration is out of range", number_start))?;
            let mut target = unit.min(next_unit);
            while target != TimeUnit::Second && !(total % target.seconds()).is_zero() {
                target = TimeUnit::ALL
                    .iter()
                    .rev()
                    .copied()
                    .find(|u| *u < target)
                    .unwrap_or(TimeUnit::Second);
            }
            amount = (total / target.seconds()).normalize();
            unit = target;
        }
        Ok((amount, unit))
    }

    // ==================== Words ====================

    fn read_word(&mut self) -> ParseResult<TokenKind> {
        let start = self.pos;
        let Some((word, end)) = self.word_at(start) else {
            return Err(self.error_at("expected identifier", start));
        };
        let lower = word.to_lowercase();

        match lower.as_str() {
            "average" => {
                if let Some(phrase_end) = self.phrase_after(end, &["of"]) {
                    self.pos = phrase_end;
                    return Ok(TokenKind::FuncAverageOf);
                }
            }
            "square" => {
                if let Some(phrase_end) = self.phrase_after(end, &["root", "of"]) {
                    self.pos = phrase_end;
                    return Ok(TokenKind::FuncSquareRootOf);
                }
            }
            "this" | "next" | "last" => {
                if let Some((period_word, period_end)) = self.word_after_space(end) {
                    if let Some(period) = Period::parse(&period_word) {
                        self.pos = period_end;
                        let relative = match lower.as_str() {
                            "this" => RelativeDate::This(period),
                            "next" => RelativeDate::Next(period),
                            _ => RelativeDate::Last(period),
                        };
                        return Ok(TokenKind::RelativeDate(relative));
                    }
                }
            }
            "true" | "yes" => {
                self.pos = end;
                return Ok(TokenKind::Boolean(true));
            }
            "false" | "no" => {
                self.pos = end;
                return Ok(TokenKind::Boolean(false));
            }
            _ => {}
        }

        if let Some(relative) = RelativeDate::keyword(&lower) {
            self.pos = end;
            return Ok(TokenKind::RelativeDate(relative));
        }

        if let Some(month) = month_number(&lower) {
            if let Some(date) = self.try_date(month, end)? {
                return Ok(date);
            }
        }

        self.pos = end;
        Ok(TokenKind::Identifier(word))
    }

    /// `March 15`, `Mar 15th`, `March 15 2025`, `March 15, 2025`.
    fn try_date(&mut self, month: u32, month_end: usize) -> ParseResult<Option<TokenKind>> {
        if self.char_at(month_end) != Some(' ') {
            return Ok(None);
        }
        let day_start = month_end + 1;
        let mut i = day_start;
        while self.is_digit_at(i) {
            i += 1;
        }
        let digits = i - day_start;
        if digits == 0 || digits > 2 {
            return Ok(None);
        }
        let day = self.two_digit_value(day_start, digits);

        if let Some((suffix, suffix_end)) = self.word_at(i) {
            if matches!(suffix.to_ascii_lowercase().as_str(), "st" | "nd" | "rd" | "th") {
                i = suffix_end;
            } else {
                return Ok(None);
            }
        }
        if !self.is_boundary_at(i) {
            return Ok(None);
        }
        if day == 0 || day > 31 {
            return Err(self.error_at(format!("invalid day of month: {}", day), day_start));
        }

        let year_start = match (self.char_at(i), self.char_at(i + 1)) {
            (Some(','), Some(' ')) => Some(i + 2),
            (Some(' '), _) => Some(i + 1),
            _ => None,
        };
        let mut year = None;
        if let Some(ys) = year_start {
            let four_digits = (ys..ys + 4).all(|j| self.is_digit_at(j)) && self.is_boundary_at(ys + 4);
            if four_digits {
                let value = self.chars[ys..ys + 4]
                    .iter()
                    .filter_map(|c| c.to_digit(10))
                    .fold(0i32, |acc, d| acc * 10 + d as i32);
                year = Some(value);
                i = ys + 4;
            }
        }

        self.pos = i;
        Ok(Some(TokenKind::Date { month, day, year }))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn month_number(word: &str) -> Option<u32> {
    let month = match word {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Resolves the boolean keywords `true false yes no t f y n` (case-insensitive).
pub fn boolean_keyword(word: &str) -> Option<bool> {
    match word.to_ascii_lowercase().as_str() {
        "true" | "yes" | "t" | "y" => Some(true),
        "false" | "no" | "f" | "n" => Some(false),
        _ => None,
    }
}
