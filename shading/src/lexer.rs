//! Tokenizer for the shading language.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::SourcePosition;

/// A lexical error: an unterminated string or an invalid character.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LexError {
  pub position: SourcePosition,
  pub message: String,
}

impl fmt::Display for LexError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.position, self.message)
  }
}

impl std::error::Error for LexError {}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Keyword {
  Surface,
  Displacement,
  Light,
  Volume,
  Uniform,
  Varying,
  Void,
  Float,
  Integer,
  Point,
  Vector,
  Normal,
  Color,
  Matrix,
  String,
  If,
  Else,
  While,
  For,
  Break,
  Continue,
  Return,
  Illuminate,
  Solar,
  Illuminance,
}

impl Keyword {
  fn lookup(word: &str) -> Option<Keyword> {
    use Keyword::*;
    Some(match word {
      "surface" => Surface,
      "displacement" => Displacement,
      "light" => Light,
      "volume" => Volume,
      "uniform" => Uniform,
      "varying" => Varying,
      "void" => Void,
      "float" => Float,
      "integer" => Integer,
      "point" => Point,
      "vector" => Vector,
      "normal" => Normal,
      "color" => Color,
      "matrix" => Matrix,
      "string" => String,
      "if" => If,
      "else" => Else,
      "while" => While,
      "for" => For,
      "break" => Break,
      "continue" => Continue,
      "return" => Return,
      "illuminate" => Illuminate,
      "solar" => Solar,
      "illuminance" => Illuminance,
      _ => return None,
    })
  }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operator {
  Plus,
  Minus,
  Star,
  Slash,
  Assign,
  PlusAssign,
  MinusAssign,
  StarAssign,
  SlashAssign,
  Equal,
  NotEqual,
  LessEqual,
  GreaterEqual,
  Less,
  Greater,
  AndAnd,
  OrOr,
  Not,
  Semicolon,
  Comma,
  LeftParen,
  RightParen,
  LeftBrace,
  RightBrace,
  LeftBracket,
  RightBracket,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
  Identifier(std::string::String),
  Number(f64),
  StringLiteral(std::string::String),
  Keyword(Keyword),
  Operator(Operator),
  Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub position: SourcePosition,
}

/// Tokenizes `source`, skipping whitespace and `// ...` line comments.
///
/// Fails on the first unterminated string or invalid character; the caller
/// decides whether that is fatal (it is, for the lexer — there is no
/// restartable mid-token recovery, only the parser recovers to statement
/// boundaries).
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
  let mut scanner = Scanner::new(source);
  let mut tokens = Vec::new();
  loop {
    let token = scanner.next_token()?;
    let at_eof = token.kind == TokenKind::Eof;
    tokens.push(token);
    if at_eof {
      break;
    }
  }
  Ok(tokens)
}

struct Scanner<'a> {
  chars: Peekable<Chars<'a>>,
  line: u32,
  column: u32,
}

impl<'a> Scanner<'a> {
  fn new(source: &'a str) -> Self {
    Self { chars: source.chars().peekable(), line: 1, column: 1 }
  }

  fn position(&self) -> SourcePosition {
    SourcePosition::new(self.line, self.column)
  }

  fn advance(&mut self) -> Option<char> {
    let next = self.chars.next();
    match next {
      Some('\n') => {
        self.line += 1;
        self.column = 1;
      }
      Some(_) => self.column += 1,
      None => {}
    }
    next
  }

  fn peek(&mut self) -> Option<char> {
    self.chars.peek().copied()
  }

  fn skip_whitespace_and_comments(&mut self) {
    loop {
      match self.peek() {
        Some(c) if c.is_whitespace() => {
          self.advance();
        }
        Some('/') => {
          let mut lookahead = self.chars.clone();
          lookahead.next();
          if lookahead.peek() == Some(&'/') {
            while let Some(c) = self.peek() {
              if c == '\n' {
                break;
              }
              self.advance();
            }
          } else {
            break;
          }
        }
        _ => break,
      }
    }
  }

  fn next_token(&mut self) -> Result<Token, LexError> {
    self.skip_whitespace_and_comments();
    let position = self.position();

    let Some(c) = self.peek() else {
      return Ok(Token { kind: TokenKind::Eof, position });
    };

    if c.is_ascii_digit() || (c == '.' && self.peeks_digit_after_dot()) {
      return self.scan_number(position);
    }
    if c.is_alphabetic() || c == '_' {
      return Ok(self.scan_identifier_or_keyword(position));
    }
    if c == '"' {
      return self.scan_string(position);
    }
    self.scan_operator(position)
  }

  fn peeks_digit_after_dot(&self) -> bool {
    let mut lookahead = self.chars.clone();
    lookahead.next();
    matches!(lookahead.peek(), Some(c) if c.is_ascii_digit())
  }

  fn scan_number(&mut self, position: SourcePosition) -> Result<Token, LexError> {
    let mut text = std::string::String::new();
    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
      text.push(self.advance().unwrap());
    }
    if self.peek() == Some('.') {
      text.push(self.advance().unwrap());
      while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
        text.push(self.advance().unwrap());
      }
    }
    if matches!(self.peek(), Some('e') | Some('E')) {
      text.push(self.advance().unwrap());
      if matches!(self.peek(), Some('+') | Some('-')) {
        text.push(self.advance().unwrap());
      }
      while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
        text.push(self.advance().unwrap());
      }
    }
    let value: f64 = text.parse().map_err(|_| LexError {
      position,
      message: format!("invalid numeric literal `{text}`"),
    })?;
    Ok(Token { kind: TokenKind::Number(value), position })
  }

  fn scan_identifier_or_keyword(&mut self, position: SourcePosition) -> Token {
    let mut text = std::string::String::new();
    while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
      text.push(self.advance().unwrap());
    }
    let kind = match Keyword::lookup(&text) {
      Some(keyword) => TokenKind::Keyword(keyword),
      None => TokenKind::Identifier(text),
    };
    Token { kind, position }
  }

  fn scan_string(&mut self, position: SourcePosition) -> Result<Token, LexError> {
    self.advance(); // opening quote
    let mut text = std::string::String::new();
    loop {
      match self.advance() {
        Some('"') => break,
        Some('\\') => match self.advance() {
          Some('n') => text.push('\n'),
          Some('t') => text.push('\t'),
          Some('"') => text.push('"'),
          Some('\\') => text.push('\\'),
          Some(other) => text.push(other),
          None => {
            return Err(LexError { position, message: "unterminated string literal".into() });
          }
        },
        Some(c) => text.push(c),
        None => return Err(LexError { position, message: "unterminated string literal".into() }),
      }
    }
    Ok(Token { kind: TokenKind::StringLiteral(text), position })
  }

  fn scan_operator(&mut self, position: SourcePosition) -> Result<Token, LexError> {
    use Operator::*;

    let c = self.advance().unwrap();
    let operator = match c {
      '+' => {
        if self.peek() == Some('=') {
          self.advance();
          PlusAssign
        } else {
          Plus
        }
      }
      '-' => {
        if self.peek() == Some('=') {
          self.advance();
          MinusAssign
        } else {
          Minus
        }
      }
      '*' => {
        if self.peek() == Some('=') {
          self.advance();
          StarAssign
        } else {
          Star
        }
      }
      '/' => {
        if self.peek() == Some('=') {
          self.advance();
          SlashAssign
        } else {
          Slash
        }
      }
      '=' => {
        if self.peek() == Some('=') {
          self.advance();
          Equal
        } else {
          Assign
        }
      }
      '!' => {
        if self.peek() == Some('=') {
          self.advance();
          NotEqual
        } else {
          Not
        }
      }
      '<' => {
        if self.peek() == Some('=') {
          self.advance();
          LessEqual
        } else {
          Less
        }
      }
      '>' => {
        if self.peek() == Some('=') {
          self.advance();
          GreaterEqual
        } else {
          Greater
        }
      }
      '&' if self.peek() == Some('&') => {
        self.advance();
        AndAnd
      }
      '|' if self.peek() == Some('|') => {
        self.advance();
        OrOr
      }
      ';' => Semicolon,
      ',' => Comma,
      '(' => LeftParen,
      ')' => RightParen,
      '{' => LeftBrace,
      '}' => RightBrace,
      '[' => LeftBracket,
      ']' => RightBracket,
      other => {
        return Err(LexError { position, message: format!("unexpected character `{other}`") });
      }
    };
    Ok(Token { kind: TokenKind::Operator(operator), position })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
  }

  #[test]
  fn tokenizes_a_parameter_declaration() {
    let kinds = kinds("uniform float ka = 1;");
    assert_eq!(
      kinds,
      vec![
        TokenKind::Keyword(Keyword::Uniform),
        TokenKind::Keyword(Keyword::Float),
        TokenKind::Identifier("ka".into()),
        TokenKind::Operator(Operator::Assign),
        TokenKind::Number(1.0),
        TokenKind::Operator(Operator::Semicolon),
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn skips_line_comments() {
    let kinds = kinds("x = 1; // trailing comment\ny = 2;");
    assert!(kinds.iter().all(|k| !matches!(k, TokenKind::Identifier(s) if s == "trailing")));
  }

  #[test]
  fn scans_the_color_space_prefix_form() {
    let kinds = kinds(r#"color"hsv"(1,0,0)"#);
    assert_eq!(kinds[0], TokenKind::Keyword(Keyword::Color));
    assert_eq!(kinds[1], TokenKind::StringLiteral("hsv".into()));
  }

  #[test]
  fn reports_unterminated_strings() {
    let result = tokenize(r#"x = "unterminated"#);
    assert!(result.is_err());
  }

  #[test]
  fn reports_invalid_characters_with_position() {
    let error = tokenize("x = 1 $ 2;").unwrap_err();
    assert_eq!(error.position, SourcePosition::new(1, 7));
  }
}
