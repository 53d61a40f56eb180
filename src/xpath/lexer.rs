//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens. Operator names (`and`, `or`,
//! `mod`, `div`) and `*` are disambiguated from name tests by the previous
//! token.

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // * as a name test
    Multiply,    // * as an operator
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),     // NCName
    NameTest(String), // prefix:* or prefix:local
    NodeType(String), // node(), text(), comment(), processing-instruction()

    // Axis
    Axis(String), // child::, descendant::, etc.

    // Special
    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    // End of input
    Eof,
}

impl Token {
    /// True when a following `*` or NCName must be read as an operator
    fn forces_operator(&self) -> bool {
        !matches!(
            self,
            Token::At
                | Token::DoubleColon
                | Token::LeftParen
                | Token::LeftBracket
                | Token::Comma
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Multiply
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
                | Token::Dollar
                | Token::Axis(_)
        )
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    prev: Option<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            prev: None,
        }
    }

    /// Get the remaining input
    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Peek at current character
    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Peek at character at offset
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    /// Advance by n bytes
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip whitespace
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    fn operator_expected(&self) -> bool {
        self.prev.as_ref().is_some_and(Token::forces_operator)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, String> {
        let token = self.scan_token()?;
        self.prev = Some(token.clone());
        Ok(token)
    }

    fn scan_token(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };

        let single = |lexer: &mut Self, token: Token| {
            lexer.advance(1);
            Ok(token)
        };

        match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Ok(Token::DoubleSlash)
                } else {
                    Ok(Token::Slash)
                }
            }
            '.' => {
                if self.peek_at(1) == Some('.') {
                    self.advance(2);
                    Ok(Token::DoubleDot)
                } else if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    Ok(self.read_number())
                } else {
                    single(self, Token::Dot)
                }
            }
            '@' => single(self, Token::At),
            '|' => single(self, Token::Pipe),
            '+' => single(self, Token::Plus),
            '-' => single(self, Token::Minus),
            '*' => {
                let token = if self.operator_expected() {
                    Token::Multiply
                } else {
                    Token::Star
                };
                single(self, token)
            }
            '=' => single(self, Token::Eq),
            '!' => {
                if self.peek_at(1) == Some('=') {
                    self.advance(2);
                    Ok(Token::NotEq)
                } else {
                    Err(format!("Unexpected character '!' at offset {}", self.pos))
                }
            }
            '<' | '>' => {
                self.advance(1);
                let or_equal = self.peek() == Some('=');
                if or_equal {
                    self.advance(1);
                }
                Ok(match (c, or_equal) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::LtEq,
                    (_, false) => Token::Gt,
                    (_, true) => Token::GtEq,
                })
            }
            '(' => single(self, Token::LeftParen),
            ')' => single(self, Token::RightParen),
            '[' => single(self, Token::LeftBracket),
            ']' => single(self, Token::RightBracket),
            ',' => single(self, Token::Comma),
            '$' => single(self, Token::Dollar),
            ':' => {
                if self.peek_at(1) == Some(':') {
                    self.advance(2);
                    Ok(Token::DoubleColon)
                } else {
                    Err(format!("Unexpected ':' at offset {}", self.pos))
                }
            }
            '"' | '\'' => self.read_string(c),
            '0'..='9' => Ok(self.read_number()),
            _ if is_name_start_char(c) => Ok(self.read_name_or_keyword()),
            _ => Err(format!("Unexpected character '{}' at offset {}", c, self.pos)),
        }
    }

    /// Read a number literal
    fn read_number(&mut self) -> Token {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
        if self.peek() == Some('.') {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
        }

        let num_str = &self.input[start..self.pos];
        Token::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    /// Read a string literal delimited by `quote`
    fn read_string(&mut self, quote: char) -> Result<Token, String> {
        let opening = self.pos;
        self.advance(1);
        let start = self.pos;

        let Some(len) = self.remaining().find(quote) else {
            return Err(format!("Unterminated string literal at offset {}", opening));
        };
        let value = self.input[start..start + len].to_string();
        self.advance(len + 1);
        Ok(Token::String(value))
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Read a name, keyword, axis, node type or qualified name test
    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        if self.operator_expected() {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        // prefix:local or prefix:*
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            if self.peek_at(1) == Some('*') {
                self.advance(2);
                return Token::NameTest(format!("{}:*", name));
            }
            if self.peek_at(1).is_some_and(is_name_start_char) {
                self.advance(1);
                let local = self.read_ncname();
                return Token::NameTest(format!("{}:{}", name, local));
            }
        }

        let after_name = self.pos;
        self.skip_whitespace();
        if self.remaining().starts_with("::") {
            return Token::Axis(name.to_string());
        }
        if self.peek() == Some('(') {
            return match name {
                "node" | "text" | "comment" | "processing-instruction" => Token::NodeType(name.to_string()),
                _ => Token::Name(name.to_string()),
            };
        }
        self.pos = after_name;
        Token::Name(name.to_string())
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            tokens("/root/child"),
            vec![
                Token::Slash,
                Token::Name("root".to_string()),
                Token::Slash,
                Token::Name("child".to_string()),
            ]
        );
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            tokens("item[@id='test']"),
            vec![
                Token::Name("item".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("id".to_string()),
                Token::Eq,
                Token::String("test".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis() {
        assert_eq!(
            tokens("child::element"),
            vec![
                Token::Axis("child".to_string()),
                Token::DoubleColon,
                Token::Name("element".to_string()),
            ]
        );
    }

    #[test]
    fn test_operator_names_by_context() {
        // Element names that look like operators
        assert_eq!(tokens("and")[0], Token::Name("and".to_string()));
        assert_eq!(tokens("/div/mod")[1], Token::Name("div".to_string()));
        assert_eq!(tokens("a and b")[1], Token::And);
        assert_eq!(tokens("6 div 2")[1], Token::Div);
        assert_eq!(tokens("@or = 'x' or b")[3], Token::String("x".to_string()));
        assert_eq!(tokens("@or = 'x' or b")[4], Token::Or);
    }

    #[test]
    fn test_star_by_context() {
        assert_eq!(tokens("*")[0], Token::Star);
        assert_eq!(tokens("2 * 3")[1], Token::Multiply);
        assert_eq!(tokens("a/*")[2], Token::Star);
        assert_eq!(tokens("count(*) * 2")[4], Token::Multiply);
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(tokens("p:item")[0], Token::NameTest("p:item".to_string()));
        assert_eq!(tokens("p:*")[0], Token::NameTest("p:*".to_string()));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("1.5")[0], Token::Number(1.5));
        assert_eq!(tokens(".5")[0], Token::Number(0.5));
        assert_eq!(tokens("last() - 1")[3], Token::Minus);
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("'open").tokenize().is_err());
        assert!(Lexer::new("a ! b").tokenize().is_err());
        assert!(Lexer::new("#").tokenize().is_err());
    }
}
