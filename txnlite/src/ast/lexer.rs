// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lexer for the statement language
//!
//! Every token parser must either consume input or fail; the main loop
//! rejects a token that leaves the input unchanged. Reserved words get their
//! own tokens; everything else that looks like a word (including soft
//! keywords such as `BEGIN`, `ISOLATION`, type names and `count`) is an
//! `Identifier` and is matched by name in the parser.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1},
    combinator::{map, map_res, opt, recognize},
    multi::many0,
    sequence::{pair, tuple},
    IResult,
};

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Create,
    Table,
    Drop,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    From,
    Where,
    And,
    Select,
    Not,
    Null,
    Is,
    If,
    Exists,
    True,
    False,

    // Literals and names
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),

    // Operators and punctuation
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LeftParen,
    RightParen,
    Comma,
    Star,
    Semicolon,

    // Skipped by the tokenizer
    Whitespace,
    Comment,

    EOF,
}

/// Reserved word for `word`, if it is one
fn keyword(word: &str) -> Option<Token> {
    let token = match word.to_ascii_uppercase().as_str() {
        "CREATE" => Token::Create,
        "TABLE" => Token::Table,
        "DROP" => Token::Drop,
        "INSERT" => Token::Insert,
        "INTO" => Token::Into,
        "VALUES" => Token::Values,
        "UPDATE" => Token::Update,
        "SET" => Token::Set,
        "DELETE" => Token::Delete,
        "FROM" => Token::From,
        "WHERE" => Token::Where,
        "AND" => Token::And,
        "SELECT" => Token::Select,
        "NOT" => Token::Not,
        "NULL" => Token::Null,
        "IS" => Token::Is,
        "IF" => Token::If,
        "EXISTS" => Token::Exists,
        "TRUE" => Token::True,
        "FALSE" => Token::False,
        _ => return None,
    };
    Some(token)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        whitespace,
        map(comment, |_| Token::Comment),
        // Floats before integers so "1.5" is not read as 1 then ".5"
        map(float_literal, Token::Float),
        map(integer_literal, Token::Integer),
        map(string_literal, Token::String),
        map(quoted_identifier, Token::Identifier),
        simple_patterns,
        // Whole words, so "Selected" never splits into SELECT + "ed"
        map(identifier, |s| {
            keyword(s).unwrap_or_else(|| Token::Identifier(s.to_string()))
        }),
    ))(input)
}

/// Operators (two-character forms first), then punctuation
fn simple_patterns(input: &str) -> IResult<&str, Token> {
    for (text, token) in [
        ("<>", Token::NotEqual),
        ("!=", Token::NotEqual),
        ("<=", Token::LessEqual),
        (">=", Token::GreaterEqual),
    ] {
        if let Some(rest) = input.strip_prefix(text) {
            return Ok((rest, token));
        }
    }

    let single = match input.chars().next() {
        Some('=') => Token::Equal,
        Some('<') => Token::Less,
        Some('>') => Token::Greater,
        Some('(') => Token::LeftParen,
        Some(')') => Token::RightParen,
        Some(',') => Token::Comma,
        Some('*') => Token::Star,
        Some(';') => Token::Semicolon,
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )))
        }
    };
    Ok((&input[1..], single))
}

/// Whitespace must consume at least one character
fn whitespace(input: &str) -> IResult<&str, Token> {
    let (remaining, whitespace_chars) = take_while(|c: char| c.is_whitespace())(input)?;
    if whitespace_chars.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    Ok((remaining, Token::Whitespace))
}

/// `-- ...` to end of line, or `/* ... */`
fn comment(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(tag("--"), take_while(|c| c != '\n'))),
        recognize(tuple((tag("/*"), take_while(|c| c != '*'), tag("*/")))),
    ))(input)
}

/// Quoted text with the quote character doubled as its escape
fn quoted(quote: char) -> impl Fn(&str) -> IResult<&str, String> {
    move |input: &str| {
        let (mut rest, _) = char(quote)(input)?;
        let mut content = String::new();
        loop {
            let mut chars = rest.chars();
            match chars.next() {
                None => {
                    return Err(nom::Err::Error(nom::error::Error::new(
                        input,
                        nom::error::ErrorKind::Char,
                    )))
                }
                Some(c) if c == quote => {
                    let after = chars.as_str();
                    if after.starts_with(quote) {
                        content.push(quote);
                        rest = &after[quote.len_utf8()..];
                    } else {
                        return Ok((after, content));
                    }
                }
                Some(c) => {
                    content.push(c);
                    rest = chars.as_str();
                }
            }
        }
    }
}

/// 'text' with '' for a literal quote
fn string_literal(input: &str) -> IResult<&str, String> {
    quoted('\'')(input)
}

/// "Name" with "" for a literal quote
fn quoted_identifier(input: &str) -> IResult<&str, String> {
    quoted('"')(input)
}

fn integer_literal(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

fn float_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// Split statement text into tokens, ending with `Token::EOF`
pub fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    while !remaining.is_empty() {
        match token(remaining) {
            Ok((next_remaining, token)) => {
                if next_remaining.len() >= remaining.len() {
                    return Err(format!(
                        "Lexer made no progress at '{}'",
                        preview(remaining)
                    ));
                }
                if !matches!(token, Token::Whitespace | Token::Comment) {
                    tokens.push(token);
                }
                remaining = next_remaining;
            }
            Err(_) => {
                return Err(format!("Unrecognized input at '{}'", preview(remaining)));
            }
        }
    }

    tokens.push(Token::EOF);
    Ok(tokens)
}

fn preview(input: &str) -> String {
    input.chars().take(20).collect()
}
