use std::fmt;

/// Represents the different kinds of tokens that the lexer can produce.
/// Each token is a meaningful unit of the BRACE language syntax.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    // == Special Tokens ==
    /// Represents a byte the lexer could not recognize. The token literal
    /// carries a diagnostic description of the offending byte.
    Illegal,
    /// Represents the end of the input. Returned forever once reached.
    Eof,
    /// Represents a comment, either `// ...` to end of line or `/* ... */`.
    /// Comments are emitted as tokens so the parser decides where they are legal.
    Comment,

    // == Literals ==
    /// An identifier such as `app_version` or a directive name.
    Ident,
    /// A string literal: `"..."`, `'...'`, or `"""..."""` (multiline).
    String,
    /// A number literal: `123`, `-456`, `78.9`.
    Number,
    /// A backtick-quoted template string. Interpolation markers `${ ... }`
    /// are left uninterpreted; the parser extracts them.
    TemplateString,

    // == Keywords ==
    True,
    False,
    Null,

    // == Operators ==
    /// `=`
    Assign,
    /// `:` (references)
    Colon,

    // == Delimiters ==
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,

    // == Special symbols ==
    /// `@` (directives)
    At,
    /// `#` (tables)
    Hash,
    /// `.` (namespace / table path separator)
    Dot,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Eof => "EOF",
            TokenKind::Comment => "COMMENT",
            TokenKind::Ident => "IDENT",
            TokenKind::String => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::TemplateString => "TEMPLATE_STRING",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Null => "NULL",
            TokenKind::Assign => "=",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::At => "@",
            TokenKind::Hash => "#",
            TokenKind::Dot => ".",
        };
        f.write_str(s)
    }
}

/// A token with its literal text and position information.
/// `position` and `length` are byte offsets into the source, suitable for
/// building diagnostic spans; `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
    pub column: usize,
    pub position: usize,
    pub length: usize,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        literal: impl Into<String>,
        line: usize,
        column: usize,
        position: usize,
        length: usize,
    ) -> Token {
        Token {
            kind,
            literal: literal.into(),
            line,
            column,
            position,
            length,
        }
    }

    /// The byte span of this token, as miette expects it.
    pub fn span(&self) -> miette::SourceSpan {
        (self.position, self.length).into()
    }
}

/// A pull-based lexer over BRACE source text.
///
/// Tokens are produced one at a time via [`Lexer::next_token`]; the lexer
/// keeps a single byte of lookahead and no token buffer. Whitespace is
/// insignificant and skipped before every token.
pub struct Lexer<'a> {
    input: &'a [u8],
    /// Byte offset of the character under examination.
    position: usize,
    /// Byte offset of the next character to read.
    read_position: usize,
    /// Current byte, or `None` at end of input.
    ch: Option<u8>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input: input.as_bytes(),
            position: 0,
            read_position: 0,
            ch: None,
            line: 1,
            column: 0,
        };
        lexer.read_char();
        lexer
    }

    /// Scans and returns the next token. Once the input is exhausted this
    /// returns an `Eof` token on every subsequent call.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let line = self.line;
        let column = self.column;
        let position = self.position;

        match self.ch {
            None => Token::new(TokenKind::Eof, "", line, column, position, 0),
            Some(b'=') => self.single(TokenKind::Assign, line, column, position),
            Some(b':') => self.single(TokenKind::Colon, line, column, position),
            Some(b',') => self.single(TokenKind::Comma, line, column, position),
            Some(b';') => self.single(TokenKind::Semicolon, line, column, position),
            Some(b'(') => self.single(TokenKind::LParen, line, column, position),
            Some(b')') => self.single(TokenKind::RParen, line, column, position),
            Some(b'{') => self.single(TokenKind::LBrace, line, column, position),
            Some(b'}') => self.single(TokenKind::RBrace, line, column, position),
            Some(b'[') => self.single(TokenKind::LBracket, line, column, position),
            Some(b']') => self.single(TokenKind::RBracket, line, column, position),
            Some(b'@') => self.single(TokenKind::At, line, column, position),
            Some(b'#') => self.single(TokenKind::Hash, line, column, position),
            Some(b'.') => self.single(TokenKind::Dot, line, column, position),
            Some(b'"') => self.read_double_quoted(line, column, position),
            Some(b'\'') => self.read_quoted(b'\'', line, column, position),
            Some(b'`') => self.read_template_string(line, column, position),
            Some(b'/') => self.read_slash(line, column, position),
            Some(ch) => self.read_default(ch, line, column, position),
        }
    }

    /// Collects every remaining token including the final `Eof`.
    /// Convenience for tests and benchmarks.
    pub fn lex(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn read_char(&mut self) {
        self.ch = self.input.get(self.read_position).copied();
        self.position = self.read_position;
        if self.ch.is_some() {
            self.read_position += 1;
        }
        match self.ch {
            Some(b'\n') => {
                self.line += 1;
                self.column = 0;
            }
            Some(_) => self.column += 1,
            None => {}
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.input.get(self.read_position).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.read_position + offset - 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.read_char();
        }
    }

    fn single(&mut self, kind: TokenKind, line: usize, column: usize, position: usize) -> Token {
        let literal = match self.ch {
            Some(ch) => (ch as char).to_string(),
            None => String::new(),
        };
        self.read_char();
        Token::new(kind, literal, line, column, position, 1)
    }

    fn read_double_quoted(&mut self, line: usize, column: usize, position: usize) -> Token {
        if self.peek_char() == Some(b'"') && self.peek_char_at(2) == Some(b'"') {
            let literal = self.read_triple_quoted();
            let length = self.position - position;
            return Token::new(TokenKind::String, literal, line, column, position, length);
        }
        self.read_quoted(b'"', line, column, position)
    }

    /// Reads a `"..."` or `'...'` string. No escape processing; an
    /// unterminated string runs to end of input.
    fn read_quoted(&mut self, quote: u8, line: usize, column: usize, position: usize) -> Token {
        let start = self.position + 1;
        loop {
            self.read_char();
            match self.ch {
                Some(ch) if ch == quote => break,
                None => break,
                _ => {}
            }
        }
        let literal = self.slice(start, self.position.min(self.input.len()));
        self.read_char(); // consume closing quote (no-op at EOF)
        let length = self.position - position;
        Token::new(TokenKind::String, literal, line, column, position, length)
    }

    /// Reads a `"""..."""` string; content is copied verbatim including newlines.
    fn read_triple_quoted(&mut self) -> String {
        self.read_char(); // second "
        self.read_char(); // third "
        self.read_char(); // first content byte

        let start = self.position;
        loop {
            match self.ch {
                None => break,
                Some(b'"')
                    if self.peek_char() == Some(b'"') && self.peek_char_at(2) == Some(b'"') =>
                {
                    break
                }
                _ => self.read_char(),
            }
        }
        let literal = self.slice(start, self.position);

        // Skip closing """
        self.read_char();
        self.read_char();
        self.read_char();

        literal
    }

    /// Reads a backtick-quoted template string. `${ ... }` windows are not
    /// interpreted here; the parser extracts them from the raw literal.
    fn read_template_string(&mut self, line: usize, column: usize, position: usize) -> Token {
        let start = self.position + 1;
        loop {
            self.read_char();
            match self.ch {
                Some(b'`') | None => break,
                _ => {}
            }
        }
        let literal = self.slice(start, self.position.min(self.input.len()));
        self.read_char(); // consume closing backtick
        let length = self.position - position;
        Token::new(
            TokenKind::TemplateString,
            literal,
            line,
            column,
            position,
            length,
        )
    }

    fn read_slash(&mut self, line: usize, column: usize, position: usize) -> Token {
        match self.peek_char() {
            Some(b'/') => {
                let literal = self.read_line_comment();
                let length = self.position - position;
                Token::new(TokenKind::Comment, literal, line, column, position, length)
            }
            Some(b'*') => {
                let literal = self.read_block_comment();
                let length = self.position - position;
                Token::new(TokenKind::Comment, literal, line, column, position, length)
            }
            _ => {
                self.read_char();
                Token::new(
                    TokenKind::Illegal,
                    describe_byte(b'/'),
                    line,
                    column,
                    position,
                    1,
                )
            }
        }
    }

    fn read_line_comment(&mut self) -> String {
        let start = self.position;
        while !matches!(self.ch, Some(b'\n') | None) {
            self.read_char();
        }
        self.slice(start, self.position)
    }

    /// Reads a `/* ... */` comment, non-nesting, greedy to the first `*/`.
    fn read_block_comment(&mut self) -> String {
        let start = self.position;
        self.read_char(); // consume /
        self.read_char(); // consume *
        loop {
            match self.ch {
                None => break,
                Some(b'*') if self.peek_char() == Some(b'/') => {
                    self.read_char(); // consume *
                    self.read_char(); // consume /
                    break;
                }
                _ => self.read_char(),
            }
        }
        self.slice(start, self.position.min(self.input.len()))
    }

    fn read_default(&mut self, ch: u8, line: usize, column: usize, position: usize) -> Token {
        if is_letter(ch) {
            let literal = self.read_identifier();
            let length = literal.len();
            let kind = lookup_ident(&literal);
            return Token::new(kind, literal, line, column, position, length);
        }
        if ch.is_ascii_digit()
            || (ch == b'-' && self.peek_char().is_some_and(|c| c.is_ascii_digit()))
        {
            let literal = self.read_number();
            let length = literal.len();
            return Token::new(TokenKind::Number, literal, line, column, position, length);
        }
        self.read_char();
        Token::new(
            TokenKind::Illegal,
            describe_byte(ch),
            line,
            column,
            position,
            1,
        )
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while self
            .ch
            .is_some_and(|c| is_letter(c) || c.is_ascii_digit() || c == b'_')
        {
            self.read_char();
        }
        self.slice(start, self.position)
    }

    /// Reads a number: optional leading `-`, digits, and an optional decimal
    /// part. The `.` is only consumed when a digit follows, so `a.b` table
    /// paths still lex as DOT tokens.
    fn read_number(&mut self) -> String {
        let start = self.position;
        if self.ch == Some(b'-') {
            self.read_char();
        }
        while self.ch.is_some_and(|c| c.is_ascii_digit()) {
            self.read_char();
        }
        if self.ch == Some(b'.') && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.read_char(); // consume '.'
            while self.ch.is_some_and(|c| c.is_ascii_digit()) {
                self.read_char();
            }
        }
        self.slice(start, self.position)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.input.len());
        String::from_utf8_lossy(&self.input[start..end]).into_owned()
    }
}

fn is_letter(ch: u8) -> bool {
    ch.is_ascii_alphabetic()
}

fn lookup_ident(ident: &str) -> TokenKind {
    match ident {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        _ => TokenKind::Ident,
    }
}

/// Formats a byte for an illegal-character diagnostic: printable bytes as
/// `'c' (0xhh)`, everything else as a hex escape.
fn describe_byte(ch: u8) -> String {
    if (32..=126).contains(&ch) {
        format!("'{}' (0x{:02x})", ch as char, ch)
    } else {
        format!("\\x{ch:02x}")
    }
}
