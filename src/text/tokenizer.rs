use crate::error::ParseError;

/// Tokenizer for protocol-buffer text-format input.
///
/// Splits the input into lines on `\n` (a trailing CR stays on its line;
/// quoted strings never span lines) and scans them head-first with a single
/// token of look-ahead. Positions are 0-based internally and surfaced
/// 1-based through [`parse_error`](Tokenizer::parse_error) and
/// [`parse_error_previous_token`](Tokenizer::parse_error_previous_token).
pub struct Tokenizer {
    lines: Vec<Vec<char>>,
    line: usize,
    column: usize,
    /// The current token; empty means end of input.
    token: String,
    token_line: usize,
    token_column: usize,
    previous_line: usize,
    previous_column: usize,
}

impl Tokenizer {
    pub fn new(text: &str) -> Self {
        let lines = text.split('\n').map(|l| l.chars().collect()).collect();
        let mut tok = Tokenizer {
            lines,
            line: 0,
            column: 0,
            token: String::new(),
            token_line: 0,
            token_column: 0,
            previous_line: 0,
            previous_column: 0,
        };
        tok.next_token();
        tok
    }

    /// True exactly when the input is exhausted.
    pub fn at_end(&self) -> bool {
        self.token.is_empty()
    }

    /// The current token's text.
    pub fn current(&self) -> &str {
        &self.token
    }

    /// True iff the current token equals `text`.
    pub fn looking_at(&self, text: &str) -> bool {
        self.token == text
    }

    /// If the current token equals `text`, advance past it and return true;
    /// otherwise leave the state unchanged and return false.
    pub fn try_consume(&mut self, text: &str) -> bool {
        if self.token == text {
            self.next_token();
            true
        } else {
            false
        }
    }

    /// Like [`try_consume`](Tokenizer::try_consume) but an error if the
    /// current token does not match.
    pub fn consume(&mut self, text: &str) -> Result<(), ParseError> {
        if !self.try_consume(text) {
            return Err(self.parse_error(format!("Expected \"{}\".", text)));
        }
        Ok(())
    }

    /// Consume an identifier token (`[A-Za-z_][A-Za-z0-9_]*`).
    pub fn consume_identifier(&mut self) -> Result<String, ParseError> {
        if !is_identifier(&self.token) {
            return Err(self.parse_error("Expected identifier."));
        }
        let token = self.token.clone();
        self.advance_returning(token)
    }

    /// Consume a token made of word characters (`\w+`): a plain field name
    /// or a bare field number.
    pub fn consume_identifier_or_number(&mut self) -> Result<String, ParseError> {
        let ok = !self.token.is_empty()
            && self
                .token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !ok {
            return Err(self.parse_error(format!(
                "Expected identifier or number, got \"{}\".",
                self.token
            )));
        }
        let token = self.token.clone();
        self.advance_returning(token)
    }

    /// Consume a signed 32-bit integer literal.
    pub fn consume_int32(&mut self) -> Result<i32, ParseError> {
        let token = self.token.clone();
        self.next_token();
        match parse_integer(&token) {
            Some(v) if v >= i32::MIN as i128 && v <= i32::MAX as i128 => Ok(v as i32),
            _ => Err(self.integer_error(&token)),
        }
    }

    /// Consume an unsigned 32-bit integer literal.
    pub fn consume_uint32(&mut self) -> Result<u32, ParseError> {
        let token = self.token.clone();
        self.next_token();
        match parse_integer(&token) {
            Some(v) if v >= 0 && v <= u32::MAX as i128 => Ok(v as u32),
            _ => Err(self.integer_error(&token)),
        }
    }

    /// Consume a signed 64-bit integer literal.
    pub fn consume_int64(&mut self) -> Result<i64, ParseError> {
        let token = self.token.clone();
        self.next_token();
        match parse_integer(&token) {
            Some(v) if v >= i64::MIN as i128 && v <= i64::MAX as i128 => Ok(v as i64),
            _ => Err(self.integer_error(&token)),
        }
    }

    /// Consume an unsigned 64-bit integer literal.
    pub fn consume_uint64(&mut self) -> Result<u64, ParseError> {
        let token = self.token.clone();
        self.next_token();
        match parse_integer(&token) {
            Some(v) if v >= 0 && v <= u64::MAX as i128 => Ok(v as u64),
            _ => Err(self.integer_error(&token)),
        }
    }

    /// Consume a floating-point literal, including `inf`/`infinity`/`nan`
    /// identifiers and a trailing `f`/`F` suffix.
    pub fn consume_float(&mut self) -> Result<f64, ParseError> {
        let token = self.token.clone();
        self.next_token();
        match parse_float(&token) {
            Some(v) => Ok(v),
            None => Err(self.parse_error_previous_token(format!(
                "Couldn't parse float: {}",
                token
            ))),
        }
    }

    /// Consume a boolean literal.
    pub fn consume_bool(&mut self) -> Result<bool, ParseError> {
        let token = self.token.clone();
        self.next_token();
        match token.as_str() {
            "true" | "True" | "t" | "1" => Ok(true),
            "false" | "False" | "f" | "0" => Ok(false),
            _ => Err(self.parse_error_previous_token(format!(
                "Expected \"true\" or \"false\", found \"{}\".",
                token
            ))),
        }
    }

    /// Consume one or more adjacent quoted literals and return their decoded
    /// payloads concatenated as text.
    pub fn consume_string(&mut self) -> Result<String, ParseError> {
        let mut out = String::new();
        loop {
            out.push_str(&self.consume_quoted_literal()?);
            if !self.looking_at_string() {
                return Ok(out);
            }
        }
    }

    /// Like [`consume_string`](Tokenizer::consume_string) but yields an octet
    /// sequence: each decoded code point is truncated modulo 256.
    pub fn consume_byte_string(&mut self) -> Result<Vec<u8>, ParseError> {
        let mut out = Vec::new();
        loop {
            let chunk = self.consume_quoted_literal()?;
            out.extend(chunk.chars().map(|c| (c as u32 % 256) as u8));
            if !self.looking_at_string() {
                return Ok(out);
            }
        }
    }

    /// If the current token looks like a scalar (string, number, or
    /// identifier), advance past it and return true. Adjacent quoted
    /// literals are consumed as one string. Used by unknown-field skipping.
    pub fn try_consume_any_scalar(&mut self) -> bool {
        if self.looking_at_string() {
            while self.looking_at_string() {
                self.next_token();
            }
            return true;
        }
        match self.token.chars().next() {
            Some(c)
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+' || c == '.' =>
            {
                self.next_token();
                true
            }
            _ => false,
        }
    }

    /// Construct an error at the current token's position.
    pub fn parse_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.token_line + 1, self.token_column + 1)
    }

    /// Construct an error at the previous token's position.
    pub fn parse_error_previous_token(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.previous_line + 1, self.previous_column + 1)
    }

    /// 0-based position of the current token.
    pub fn position(&self) -> (usize, usize) {
        (self.token_line, self.token_column)
    }

    fn integer_error(&self, token: &str) -> ParseError {
        self.parse_error_previous_token(format!("Couldn't parse integer: {}", token))
    }

    fn advance_returning(&mut self, token: String) -> Result<String, ParseError> {
        self.next_token();
        Ok(token)
    }

    fn looking_at_string(&self) -> bool {
        self.token.starts_with('"') || self.token.starts_with('\'')
    }

    fn consume_quoted_literal(&mut self) -> Result<String, ParseError> {
        let token = self.token.clone();
        let quote = match token.chars().next() {
            Some(q @ '"') | Some(q @ '\'') => q,
            _ => {
                return Err(self.parse_error(format!("Expected string, got \"{}\".", token)));
            }
        };
        let chars: Vec<char> = token.chars().collect();
        if chars.len() < 2 || chars[chars.len() - 1] != quote {
            return Err(self.parse_error(format!("String missing ending quote: {}", token)));
        }
        let payload: String = chars[1..chars.len() - 1].iter().collect();
        self.next_token();
        Ok(unescape(&payload))
    }

    /// Skip whitespace and `#` line comments, crossing line boundaries.
    /// Returns false when the input is exhausted.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        loop {
            let line = match self.lines.get(self.line) {
                Some(l) => l,
                None => return false,
            };
            if self.column >= line.len() {
                self.line += 1;
                self.column = 0;
                continue;
            }
            match line[self.column] {
                c if c.is_whitespace() => self.column += 1,
                '#' => {
                    // Comment runs to end of line
                    self.column = line.len();
                }
                _ => return true,
            }
        }
    }

    /// Advance to the next token. The previous token's position is retained
    /// for error reporting.
    pub fn next_token(&mut self) {
        self.previous_line = self.token_line;
        self.previous_column = self.token_column;

        if !self.skip_whitespace_and_comments() {
            self.token.clear();
            self.token_line = self.line;
            self.token_column = self.column;
            return;
        }

        self.token_line = self.line;
        self.token_column = self.column;

        let line = &self.lines[self.line];
        let start = self.column;
        let c = line[start];

        let end = if c.is_ascii_alphabetic() || c == '_' {
            // Identifier; '+' and '-' are permitted inside so signed numeric
            // forms like 1e+10 lex as one token.
            scan(line, start + 1, |c| {
                c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-'
            })
        } else if c.is_ascii_digit()
            || c == '+'
            || c == '-'
            || (c == '.'
                && line
                    .get(start + 1)
                    .is_some_and(|c2| c2.is_ascii_digit()))
        {
            scan(line, start + 1, |c| {
                c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '+' || c == '-'
            })
        } else if c == '"' || c == '\'' {
            scan_quoted(line, start, c)
        } else {
            start + 1
        };

        self.token = line[start..end].iter().collect();
        self.column = end;
    }
}

fn scan(line: &[char], mut pos: usize, pred: impl Fn(char) -> bool) -> usize {
    while pos < line.len() && pred(line[pos]) {
        pos += 1;
    }
    pos
}

/// Scan a quoted literal starting at `start`. Backslash pairs with the
/// following character; a bare closing quote ends the token. If the line
/// ends first the token is left unterminated for `consume_string` to reject.
fn scan_quoted(line: &[char], start: usize, quote: char) -> usize {
    let mut pos = start + 1;
    while pos < line.len() {
        match line[pos] {
            '\\' => pos = (pos + 2).min(line.len()),
            c if c == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    pos
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse an integer literal with C-style base detection: `0x` prefix is
/// hexadecimal, a leading `0` over octal digits is octal, anything else is
/// signed decimal. Returns `None` on malformed input; the i128 result holds
/// the full u64 and i64 domains for the callers' range checks.
fn parse_integer(text: &str) -> Option<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() {
        return None;
    }

    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i128::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1
        && digits.starts_with('0')
        && digits.chars().all(|c| ('0'..='7').contains(&c))
    {
        i128::from_str_radix(digits, 8).ok()?
    } else {
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i128>().ok()?
    };

    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a float literal: usual decimal/exponent forms with an optional
/// trailing `f`/`F`, plus the case-insensitive `inf`/`infinity`/`nan`
/// identifiers.
fn parse_float(text: &str) -> Option<f64> {
    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        "inf" | "infinity" => return Some(f64::INFINITY),
        "-inf" | "-infinity" => return Some(f64::NEG_INFINITY),
        "nan" => return Some(f64::NAN),
        _ => {}
    }

    let trimmed = lower.strip_suffix('f').unwrap_or(&lower);
    if trimmed.is_empty() {
        return None;
    }
    // Reject forms Rust accepts but the text format does not.
    if trimmed.contains("inf") || trimmed.contains("nan") {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Expand escape sequences in a quoted literal's payload.
fn unescape(payload: &str) -> String {
    let chars: Vec<char> = payload.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c != '\\' {
            out.push(c);
            continue;
        }
        if i >= chars.len() {
            out.push('\\');
            break;
        }
        let esc = chars[i];
        i += 1;
        match esc {
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0B}'),
            '0'..='7' => {
                // 1-3 octal digits, greedy
                let mut value = esc.to_digit(8).unwrap();
                let mut taken = 1;
                while taken < 3 && i < chars.len() {
                    match chars[i].to_digit(8) {
                        Some(d) => {
                            value = value * 8 + d;
                            i += 1;
                            taken += 1;
                        }
                        None => break,
                    }
                }
                out.push(char_or_replacement(value));
            }
            'x' => {
                // 1-2 hex digits; a bare \x is a literal x
                let (value, taken) = hex_digits(&chars, i, 2);
                if taken == 0 {
                    out.push('x');
                } else {
                    i += taken;
                    out.push(char_or_replacement(value));
                }
            }
            'u' => {
                let (value, taken) = hex_digits(&chars, i, 4);
                if taken == 0 {
                    out.push('u');
                } else {
                    i += taken;
                    out.push(char_or_replacement(value));
                }
            }
            'U' => {
                let (value, taken) = hex_digits(&chars, i, 8);
                if taken == 0 {
                    out.push('U');
                } else {
                    i += taken;
                    out.push(char_or_replacement(value));
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn hex_digits(chars: &[char], start: usize, max: usize) -> (u32, usize) {
    let mut value: u32 = 0;
    let mut taken = 0;
    while taken < max && start + taken < chars.len() {
        match chars[start + taken].to_digit(16) {
            Some(d) => {
                value = value.wrapping_mul(16).wrapping_add(d);
                taken += 1;
            }
            None => break,
        }
    }
    (value, taken)
}

fn char_or_replacement(value: u32) -> char {
    char::from_u32(value).unwrap_or('\u{FFFD}')
}
