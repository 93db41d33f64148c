//! Function source validation.
//!
//! Two gates run without executing anything: the source is compiled (parse
//! only) by the sandbox engine, then a small lexer checks that the whole
//! source is exactly one function expression taking at most
//! `(params, context)`.

use crate::sandbox::{self, strip_source};

use super::super::codes::ErrorCode;
use super::super::result::ValidationResult;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Maximum number of declared parameters.
const MAX_ARITY: usize = 2;

/// Bytes after which a `/` starts a regex literal rather than a division.
const REGEX_PRECEDERS: &[u8] = b"(,=:[!&|?{};+-*%<>~^";

/// Keywords after which a `/` starts a regex literal.
const REGEX_KEYWORDS: &[&str] = &["return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do", "else", "yield", "await"];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Coarse token used for shape analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Arrow,
    Punct(u8),
    Literal,
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Validate function source for a `function` executor.
pub fn validate_function(code: &str) -> ValidationResult {
    let mut result = ValidationResult::default();
    let code = strip_source(code);

    if code.is_empty() {
        result.error(
            ErrorCode::NotAFunction,
            "empty function",
            "executor.code",
            "function source is empty",
            Some("write a function such as `(params, context) => params`"),
        );
        return result;
    }

    if let Err(message) = sandbox::check_syntax(code) {
        result.error(
            ErrorCode::FunctionParse,
            "syntax error",
            "executor.code",
            message,
            None,
        );
        return result;
    }

    match function_arity(code) {
        Ok(arity) if arity > MAX_ARITY => result.error(
            ErrorCode::FunctionArity,
            "too many parameters",
            "executor.code",
            format!(
                "function declares {} parameters, at most {} (`params`, `context`) are passed",
                arity, MAX_ARITY
            ),
            None,
        ),
        Ok(_) => {}
        Err(message) => result.error(
            ErrorCode::NotAFunction,
            "not a function expression",
            "executor.code",
            message,
            Some("the source must be a single function, e.g. `async (params, context) => { ... }`"),
        ),
    }

    result
}

/// Count the declared parameters of a single function expression.
///
/// Fails if the source is anything other than exactly one function or arrow
/// function expression.
pub fn function_arity(code: &str) -> Result<usize, String> {
    let tokens = Lexer::tokenize(strip_source(code))?;
    let mut i = 0;

    if matches!(tokens.first(), Some(Token::Ident(kw)) if kw == "async")
        && tokens.get(1).is_some_and(|t| *t != Token::Arrow)
    {
        i = 1;
    }

    match tokens.get(i) {
        Some(Token::Ident(kw)) if kw == "function" => {
            i += 1;
            if tokens.get(i) == Some(&Token::Punct(b'*')) {
                i += 1;
            }
            if matches!(tokens.get(i), Some(Token::Ident(_))) {
                i += 1;
            }
            if tokens.get(i) != Some(&Token::Punct(b'(')) {
                return Err("expected `(` after `function`".into());
            }
            let close = find_close(&tokens, i)?;
            let arity = count_params(&tokens[i + 1..close]);
            let body = close + 1;
            if tokens.get(body) != Some(&Token::Punct(b'{')) {
                return Err("expected a function body".into());
            }
            let end = find_close(&tokens, body)?;
            if end + 1 != tokens.len() {
                return Err("unexpected code after the function body".into());
            }
            Ok(arity)
        }
        Some(Token::Punct(b'(')) => {
            let close = find_close(&tokens, i)?;
            let arity = count_params(&tokens[i + 1..close]);
            if tokens.get(close + 1) != Some(&Token::Arrow) {
                return Err("expected `=>` after the parameter list".into());
            }
            check_arrow_body(&tokens, close + 2)?;
            Ok(arity)
        }
        Some(Token::Ident(_)) => {
            if tokens.get(i + 1) != Some(&Token::Arrow) {
                return Err("source is not a function expression".into());
            }
            check_arrow_body(&tokens, i + 2)?;
            Ok(1)
        }
        _ => Err("source is not a function expression".into()),
    }
}

/// Check an arrow body starting at `start` runs to the end of the source.
fn check_arrow_body(tokens: &[Token], start: usize) -> Result<(), String> {
    match tokens.get(start) {
        None => Err("arrow function has no body".into()),
        Some(Token::Punct(b'{')) => {
            let end = find_close(tokens, start)?;
            if end + 1 != tokens.len() {
                return Err("unexpected code after the function body".into());
            }
            Ok(())
        }
        Some(_) => {
            let mut stack = Vec::new();
            for token in &tokens[start..] {
                match token {
                    Token::Punct(b @ (b'(' | b'[' | b'{')) => stack.push(*b),
                    Token::Punct(b @ (b')' | b']' | b'}')) => {
                        if stack.pop() != Some(opener_for(*b)) {
                            return Err("unbalanced brackets in function body".into());
                        }
                    }
                    Token::Punct(b',' | b';') if stack.is_empty() => {
                        return Err("source contains more than one expression".into());
                    }
                    _ => {}
                }
            }
            if !stack.is_empty() {
                return Err("unbalanced brackets in function body".into());
            }
            Ok(())
        }
    }
}

/// Find the index of the bracket closing the one at `open`.
fn find_close(tokens: &[Token], open: usize) -> Result<usize, String> {
    let mut stack = Vec::new();
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::Punct(b @ (b'(' | b'[' | b'{')) => stack.push(*b),
            Token::Punct(b @ (b')' | b']' | b'}')) => {
                if stack.pop() != Some(opener_for(*b)) {
                    return Err("unbalanced brackets".into());
                }
                if stack.is_empty() {
                    return Ok(idx);
                }
            }
            _ => {}
        }
    }
    Err("unbalanced brackets".into())
}

fn opener_for(close: u8) -> u8 {
    match close {
        b')' => b'(',
        b']' => b'[',
        _ => b'{',
    }
}

/// Count top-level parameters in a parameter list (without its parens).
fn count_params(params: &[Token]) -> usize {
    if params.is_empty() {
        return 0;
    }
    let mut depth = 0usize;
    let mut commas = 0;
    for token in params {
        match token {
            Token::Punct(b'(' | b'[' | b'{') => depth += 1,
            Token::Punct(b')' | b']' | b'}') => depth = depth.saturating_sub(1),
            Token::Punct(b',') if depth == 0 => commas += 1,
            _ => {}
        }
    }
    if params.last() == Some(&Token::Punct(b',')) {
        commas
    } else {
        commas + 1
    }
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<'a> Lexer<'a> {
    fn tokenize(src: &'a str) -> Result<Vec<Token>, String> {
        let mut lexer = Lexer {
            src: src.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        };
        while lexer.next_token()? {}
        Ok(lexer.tokens)
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    /// Lex one token. Returns `false` at end of input.
    fn next_token(&mut self) -> Result<bool, String> {
        self.skip_trivia()?;
        let Some(b) = self.peek(0) else {
            return Ok(false);
        };

        match b {
            b'\'' | b'"' => {
                self.skip_string(b)?;
                self.tokens.push(Token::Literal);
            }
            b'`' => {
                self.skip_template()?;
                self.tokens.push(Token::Literal);
            }
            b'/' if self.regex_allowed() => {
                self.skip_regex()?;
                self.tokens.push(Token::Literal);
            }
            b'=' if self.peek(1) == Some(b'>') => {
                self.pos += 2;
                self.tokens.push(Token::Arrow);
            }
            b'0'..=b'9' => {
                while self
                    .peek(0)
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'.' || c == b'_')
                {
                    self.pos += 1;
                }
                self.tokens.push(Token::Literal);
            }
            c if is_ident_byte(c) => {
                let start = self.pos;
                while self.peek(0).is_some_and(|c| is_ident_byte(c) || c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let ident = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                self.tokens.push(Token::Ident(ident));
            }
            c => {
                self.pos += 1;
                self.tokens.push(Token::Punct(c));
            }
        }
        Ok(true)
    }

    fn skip_trivia(&mut self) -> Result<(), String> {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(c), _) if c.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => {
                    while self.peek(0).is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    self.pos += 2;
                    loop {
                        match (self.peek(0), self.peek(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => return Err("unterminated comment".into()),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_string(&mut self, quote: u8) -> Result<(), String> {
        self.pos += 1;
        loop {
            match self.peek(0) {
                Some(b'\\') => self.pos += 2,
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'\n') | None => return Err("unterminated string literal".into()),
                Some(_) => self.pos += 1,
            }
        }
    }

    fn skip_template(&mut self) -> Result<(), String> {
        self.pos += 1;
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(b'\\'), _) => self.pos += 2,
                (Some(b'`'), _) => {
                    self.pos += 1;
                    return Ok(());
                }
                (Some(b'$'), Some(b'{')) => {
                    self.pos += 2;
                    self.skip_interpolation()?;
                }
                (Some(_), _) => self.pos += 1,
                (None, _) => return Err("unterminated template literal".into()),
            }
        }
    }

    /// Skip a `${ ... }` body, whose tokens are discarded.
    fn skip_interpolation(&mut self) -> Result<(), String> {
        let mark = self.tokens.len();
        let mut depth = 0usize;
        loop {
            if !self.next_token()? {
                return Err("unterminated template literal".into());
            }
            match self.tokens.last() {
                Some(Token::Punct(b'{')) => depth += 1,
                Some(Token::Punct(b'}')) if depth == 0 => break,
                Some(Token::Punct(b'}')) => depth -= 1,
                _ => {}
            }
        }
        self.tokens.truncate(mark);
        Ok(())
    }

    fn regex_allowed(&self) -> bool {
        match self.tokens.last() {
            None | Some(Token::Arrow) => true,
            Some(Token::Punct(c)) => REGEX_PRECEDERS.contains(c),
            Some(Token::Ident(kw)) => REGEX_KEYWORDS.contains(&kw.as_str()),
            Some(Token::Literal) => false,
        }
    }

    fn skip_regex(&mut self) -> Result<(), String> {
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.peek(0) {
                Some(b'\\') => self.pos += 2,
                Some(b'[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some(b'/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(b'\n') | None => return Err("unterminated regular expression".into()),
                Some(_) => self.pos += 1,
            }
        }
        while self.peek(0).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        Ok(())
    }
}

fn is_ident_byte(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c >= 0x80
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
