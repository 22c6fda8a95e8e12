use crate::{
    conversions::{is_js_whitespace, parse_radix_digits},
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Finally,
    For,
    Function,
    If,
    In,
    InstanceOf,
    Let,
    New,
    Return,
    Switch,
    This,
    Throw,
    Try,
    TypeOf,
    Var,
    Void,
    While,
    With,
    True,
    False,
    Null,
    /// `class`, `enum`, `extends`, `super`, `export`, `import`.
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Question,
    FatArrow,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    UnsignedShiftRightAssign,
    AmpersandAssign,
    PipeAssign,
    CaretAssign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    DoubleAmpersand,
    DoublePipe,
    Bang,
    BangEqual,
    BangEqualEqual,
    EqualEqual,
    EqualEqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw text for identifiers, numbers and punctuators; the cooked value
    /// for string literals.
    pub lexeme: String,
    pub span: SourceSpan,
    /// A line terminator precedes this token.
    pub newline_before: bool,
    /// Legacy octal number (`017`) or octal escape in a string (`"\07"`).
    pub legacy_octal: bool,
}

pub fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '\u{200C}' || ch == '\u{200D}'
}

/// Numeric value of a number token's raw text.
pub fn number_value(lexeme: &str) -> f64 {
    let bytes = lexeme.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        match bytes[1] {
            b'x' | b'X' => return parse_radix_digits(&lexeme[2..], 16).unwrap_or(f64::NAN),
            b'o' | b'O' => return parse_radix_digits(&lexeme[2..], 8).unwrap_or(f64::NAN),
            b'b' | b'B' => return parse_radix_digits(&lexeme[2..], 2).unwrap_or(f64::NAN),
            b'0'..=b'7' if lexeme.bytes().all(|b| (b'0'..=b'7').contains(&b)) => {
                return parse_radix_digits(lexeme, 8).unwrap_or(f64::NAN)
            }
            _ => {}
        }
    }
    lexeme.parse().unwrap_or(f64::NAN)
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = if let Some((idx, ch)) = self.peeked.take() {
            Some((idx, ch))
        } else {
            self.chars.next()
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            Some((idx, ch))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    /// The character after the peeked one.
    fn peek_second(&mut self) -> Option<char> {
        self.peek();
        self.chars.clone().next().map(|(_, ch)| ch)
    }

    fn match_next(&mut self, expected: char) -> bool {
        if let Some((idx, ch)) = self.peek() {
            if ch == expected {
                self.peeked = None;
                self.current = idx + ch.len_utf8();
                true
            } else {
                false
            }
        } else {
            false
        }
    }

    fn collect_while<F>(&mut self, mut predicate: F)
    where
        F: FnMut(char) -> bool,
    {
        while let Some((_, ch)) = self.peek() {
            if predicate(ch) {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>, start: usize) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Lexer, message).with_span(SourceSpan::new(start, self.current))
    }

    /// Skips trivia, reporting whether a line terminator was crossed.
    fn skip_whitespace_and_comments(&mut self) -> Result<bool, Diagnostic> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some((_, ch)) if is_line_terminator(ch) => {
                    newline = true;
                    self.bump();
                }
                Some((_, ch)) if is_js_whitespace(ch) => {
                    self.bump();
                }
                Some((start, '/')) => match self.peek_second() {
                    Some('/') => {
                        self.bump();
                        self.bump();
                        self.collect_while(|ch| !is_line_terminator(ch));
                    }
                    Some('*') => {
                        self.bump();
                        self.bump();
                        let mut closed = false;
                        while let Some((_, ch)) = self.bump() {
                            if is_line_terminator(ch) {
                                newline = true;
                            } else if ch == '*' && self.match_next('/') {
                                closed = true;
                                break;
                            }
                        }
                        if !closed {
                            return Err(self.error("unterminated comment", start));
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        Ok(newline)
    }

    fn identifier_or_keyword(&mut self, start: usize) -> (TokenKind, String) {
        self.collect_while(is_identifier_part);
        let lexeme = self.source[start..self.current].to_string();
        let kind = keyword_for(&lexeme).unwrap_or(TokenKind::Identifier);
        (kind, lexeme)
    }

    fn number_literal(&mut self, start: usize, first: char) -> Result<(String, bool), Diagnostic> {
        let mut legacy_octal = false;
        if first == '0' {
            if let Some((_, marker)) = self.peek() {
                let radix = match marker {
                    'x' | 'X' => Some(16),
                    'o' | 'O' => Some(8),
                    'b' | 'B' => Some(2),
                    _ => None,
                };
                if let Some(radix) = radix {
                    self.bump();
                    let digits_start = self.current;
                    self.collect_while(|ch| ch.is_digit(radix));
                    if self.current == digits_start {
                        return Err(self.error("missing digits after numeric prefix", start));
                    }
                    return self.finish_number(start, false);
                }
                if marker.is_ascii_digit() {
                    legacy_octal = true;
                    self.collect_while(|ch| ch.is_ascii_digit());
                    return self.finish_number(start, legacy_octal);
                }
            }
        }

        if first != '.' {
            self.collect_while(|ch| ch.is_ascii_digit());
            if self.match_next('.') {
                self.collect_while(|ch| ch.is_ascii_digit());
            }
        } else {
            self.collect_while(|ch| ch.is_ascii_digit());
        }
        if let Some((_, 'e' | 'E')) = self.peek() {
            self.bump();
            if let Some((_, '+' | '-')) = self.peek() {
                self.bump();
            }
            let exponent_start = self.current;
            self.collect_while(|ch| ch.is_ascii_digit());
            if self.current == exponent_start {
                return Err(self.error("missing exponent digits", start));
            }
        }
        self.finish_number(start, legacy_octal)
    }

    fn finish_number(&mut self, start: usize, legacy_octal: bool) -> Result<(String, bool), Diagnostic> {
        if let Some((_, ch)) = self.peek() {
            if is_identifier_start(ch) || ch.is_ascii_digit() {
                self.bump();
                return Err(self.error(
                    "identifier starts immediately after numeric literal",
                    start,
                ));
            }
        }
        Ok((self.source[start..self.current].to_string(), legacy_octal))
    }

    fn hex_escape(&mut self, digits: usize, start: usize) -> Result<u16, Diagnostic> {
        let mut value: u32 = 0;
        for _ in 0..digits {
            match self.bump() {
                Some((_, ch)) if ch.is_ascii_hexdigit() => {
                    value = value * 16 + ch.to_digit(16).unwrap_or(0);
                }
                _ => return Err(self.error("invalid hexadecimal escape sequence", start)),
            }
        }
        Ok(value as u16)
    }

    fn string_literal(&mut self, start: usize, quote: char) -> Result<(String, bool), Diagnostic> {
        let mut units: Vec<u16> = Vec::new();
        let mut legacy_octal = false;
        let mut buffer = [0u16; 2];
        while let Some((_, ch)) = self.bump() {
            if ch == quote {
                return Ok((String::from_utf16_lossy(&units), legacy_octal));
            }
            if is_line_terminator(ch) {
                break;
            }
            if ch != '\\' {
                units.extend_from_slice(ch.encode_utf16(&mut buffer));
                continue;
            }
            let Some((_, escape)) = self.bump() else {
                break;
            };
            let cooked: Option<u16> = match escape {
                'n' => Some(0x0A),
                'r' => Some(0x0D),
                't' => Some(0x09),
                'b' => Some(0x08),
                'f' => Some(0x0C),
                'v' => Some(0x0B),
                'x' => Some(self.hex_escape(2, start)?),
                'u' => Some(self.hex_escape(4, start)?),
                '\r' => {
                    self.match_next('\n');
                    None
                }
                ch if is_line_terminator(ch) => None,
                '0'..='7' => {
                    let mut value = escape.to_digit(8).unwrap_or(0);
                    let max_digits = if escape <= '3' { 3 } else { 2 };
                    let mut count = 1;
                    while count < max_digits {
                        match self.peek() {
                            Some((_, next @ '0'..='7')) => {
                                self.bump();
                                value = value * 8 + next.to_digit(8).unwrap_or(0);
                                count += 1;
                            }
                            _ => break,
                        }
                    }
                    if !(escape == '0' && count == 1 && !matches!(self.peek(), Some((_, '8' | '9')))) {
                        legacy_octal = true;
                    }
                    Some(value as u16)
                }
                other => {
                    units.extend_from_slice(other.encode_utf16(&mut buffer));
                    None
                }
            };
            if let Some(unit) = cooked {
                units.push(unit);
            }
        }
        Err(self.error("unterminated string literal", start))
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            let newline_before = self.skip_whitespace_and_comments()?;
            let (start, ch) = match self.bump() {
                Some(pair) => pair,
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        lexeme: String::new(),
                        span: SourceSpan::new(self.current, self.current),
                        newline_before: true,
                        legacy_octal: false,
                    });
                    break;
                }
            };

            let mut legacy_octal = false;
            let mut cooked: Option<String> = None;
            let kind = match ch {
                c if is_identifier_start(c) => {
                    let (kind, lexeme) = self.identifier_or_keyword(start);
                    cooked = Some(lexeme);
                    kind
                }
                '0'..='9' => {
                    let (lexeme, octal) = self.number_literal(start, ch)?;
                    legacy_octal = octal;
                    cooked = Some(lexeme);
                    TokenKind::Number
                }
                '.' if matches!(self.peek(), Some((_, '0'..='9'))) => {
                    let (lexeme, _) = self.number_literal(start, ch)?;
                    cooked = Some(lexeme);
                    TokenKind::Number
                }
                '"' | '\'' => {
                    let (value, octal) = self.string_literal(start, ch)?;
                    legacy_octal = octal;
                    cooked = Some(value);
                    TokenKind::String
                }
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                ';' => TokenKind::Semicolon,
                ':' => TokenKind::Colon,
                '?' => TokenKind::Question,
                '~' => TokenKind::Tilde,
                '+' => {
                    if self.match_next('+') {
                        TokenKind::PlusPlus
                    } else if self.match_next('=') {
                        TokenKind::PlusAssign
                    } else {
                        TokenKind::Plus
                    }
                }
                '-' => {
                    if self.match_next('-') {
                        TokenKind::MinusMinus
                    } else if self.match_next('=') {
                        TokenKind::MinusAssign
                    } else {
                        TokenKind::Minus
                    }
                }
                '*' => {
                    if self.match_next('=') {
                        TokenKind::StarAssign
                    } else {
                        TokenKind::Star
                    }
                }
                '/' => {
                    if self.match_next('=') {
                        TokenKind::SlashAssign
                    } else {
                        TokenKind::Slash
                    }
                }
                '%' => {
                    if self.match_next('=') {
                        TokenKind::PercentAssign
                    } else {
                        TokenKind::Percent
                    }
                }
                '=' => {
                    if self.match_next('>') {
                        TokenKind::FatArrow
                    } else if self.match_next('=') {
                        if self.match_next('=') {
                            TokenKind::EqualEqualEqual
                        } else {
                            TokenKind::EqualEqual
                        }
                    } else {
                        TokenKind::Assign
                    }
                }
                '!' => {
                    if self.match_next('=') {
                        if self.match_next('=') {
                            TokenKind::BangEqualEqual
                        } else {
                            TokenKind::BangEqual
                        }
                    } else {
                        TokenKind::Bang
                    }
                }
                '&' => {
                    if self.match_next('&') {
                        TokenKind::DoubleAmpersand
                    } else if self.match_next('=') {
                        TokenKind::AmpersandAssign
                    } else {
                        TokenKind::Ampersand
                    }
                }
                '|' => {
                    if self.match_next('|') {
                        TokenKind::DoublePipe
                    } else if self.match_next('=') {
                        TokenKind::PipeAssign
                    } else {
                        TokenKind::Pipe
                    }
                }
                '^' => {
                    if self.match_next('=') {
                        TokenKind::CaretAssign
                    } else {
                        TokenKind::Caret
                    }
                }
                '<' => {
                    if self.match_next('<') {
                        if self.match_next('=') {
                            TokenKind::ShiftLeftAssign
                        } else {
                            TokenKind::ShiftLeft
                        }
                    } else if self.match_next('=') {
                        TokenKind::LessEqual
                    } else {
                        TokenKind::Less
                    }
                }
                '>' => {
                    if self.match_next('>') {
                        if self.match_next('>') {
                            if self.match_next('=') {
                                TokenKind::UnsignedShiftRightAssign
                            } else {
                                TokenKind::UnsignedShiftRight
                            }
                        } else if self.match_next('=') {
                            TokenKind::ShiftRightAssign
                        } else {
                            TokenKind::ShiftRight
                        }
                    } else if self.match_next('=') {
                        TokenKind::GreaterEqual
                    } else {
                        TokenKind::Greater
                    }
                }
                other => {
                    return Err(self.error(format!("unexpected character `{other}`"), start));
                }
            };
            let end = self.current;
            tokens.push(Token {
                kind,
                lexeme: cooked.unwrap_or_else(|| self.source[start..end].to_string()),
                span: SourceSpan::new(start, end),
                newline_before,
                legacy_octal,
            });
        }
        Ok(tokens)
    }
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "break" => Kw::Break,
        "case" => Kw::Case,
        "catch" => Kw::Catch,
        "const" => Kw::Const,
        "continue" => Kw::Continue,
        "debugger" => Kw::Debugger,
        "default" => Kw::Default,
        "delete" => Kw::Delete,
        "do" => Kw::Do,
        "else" => Kw::Else,
        "finally" => Kw::Finally,
        "for" => Kw::For,
        "function" => Kw::Function,
        "if" => Kw::If,
        "in" => Kw::In,
        "instanceof" => Kw::InstanceOf,
        "let" => Kw::Let,
        "new" => Kw::New,
        "return" => Kw::Return,
        "switch" => Kw::Switch,
        "this" => Kw::This,
        "throw" => Kw::Throw,
        "try" => Kw::Try,
        "typeof" => Kw::TypeOf,
        "var" => Kw::Var,
        "void" => Kw::Void,
        "while" => Kw::While,
        "with" => Kw::With,
        "true" => Kw::True,
        "false" => Kw::False,
        "null" => Kw::Null,
        "class" | "enum" | "extends" | "super" | "export" | "import" => Kw::Reserved,
        _ => return None,
    };
    Some(TokenKind::Keyword(keyword))
}
