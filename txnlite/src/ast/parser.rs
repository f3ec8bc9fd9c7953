// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parser for the statement language using nom parsers over tokens

use log::debug;
use nom::{
    branch::alt,
    combinator::{map, map_opt, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::ast::*;
use super::lexer::{tokenize, Token};
use crate::storage::{ColumnDefinition, DataType};
use crate::txn::{AccessMode, IsolationLevel};

/// Parser error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParserError {
    #[error("Lexer error: {0}")]
    LexerError(String),
    #[error("Unexpected token: {0:?}")]
    UnexpectedToken(Token),
    #[error("Empty statement")]
    EmptyStatement,
}

/// Parse one statement, optionally terminated by `;`
pub fn parse_statement(input: &str) -> Result<Statement, ParserError> {
    let tokens = tokenize(input).map_err(ParserError::LexerError)?;

    if matches!(tokens.as_slice(), [] | [Token::EOF] | [Token::Semicolon, Token::EOF]) {
        return Err(ParserError::EmptyStatement);
    }

    let parsed = terminated(
        statement,
        pair(opt(expect_token(Token::Semicolon)), end_of_input),
    )(tokens.as_slice());

    match parsed {
        Ok((_, statement)) => {
            debug!("Parsed {} statement", statement.kind());
            Ok(statement)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let unexpected = e.input.first().cloned().unwrap_or(Token::EOF);
            debug!("PARSER: failed at {:?}", unexpected);
            Err(ParserError::UnexpectedToken(unexpected))
        }
        Err(nom::Err::Incomplete(_)) => Err(ParserError::UnexpectedToken(Token::EOF)),
    }
}

/// Split a script into statements on `;`, ignoring semicolons inside
/// quotes and comments. Empty statements are dropped.
pub fn split_script(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = script.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    for skipped in chars.by_ref() {
                        if skipped == '\n' {
                            current.push('\n');
                            break;
                        }
                    }
                }
                ';' => {
                    let statement = current.trim();
                    if !statement.is_empty() {
                        statements.push(statement.to_string());
                    }
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }

    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    statements
}

fn statement(tokens: &[Token]) -> IResult<&[Token], Statement> {
    alt((
        map(create_table, Statement::CreateTable),
        map(drop_table, Statement::DropTable),
        map(insert, Statement::Insert),
        map(update, Statement::Update),
        map(delete, Statement::Delete),
        map(select, Statement::Select),
        map(transaction_statement, Statement::TransactionStatement),
    ))(tokens)
}

/// CREATE TABLE [IF NOT EXISTS] name (column_def, ...)
fn create_table(tokens: &[Token]) -> IResult<&[Token], CreateTableStatement> {
    map(
        tuple((
            expect_token(Token::Create),
            expect_token(Token::Table),
            opt(tuple((
                expect_token(Token::If),
                expect_token(Token::Not),
                expect_token(Token::Exists),
            ))),
            identifier,
            delimited(
                expect_token(Token::LeftParen),
                separated_list1(expect_token(Token::Comma), column_definition),
                expect_token(Token::RightParen),
            ),
        )),
        |(_, _, if_not_exists, name, columns)| CreateTableStatement {
            name,
            columns,
            if_not_exists: if_not_exists.is_some(),
        },
    )(tokens)
}

/// name type [(length)] [NOT NULL | NULL]
fn column_definition(tokens: &[Token]) -> IResult<&[Token], ColumnDefinition> {
    map(
        tuple((
            identifier,
            map_opt(
                pair(
                    identifier,
                    opt(delimited(
                        expect_token(Token::LeftParen),
                        integer,
                        expect_token(Token::RightParen),
                    )),
                ),
                |(type_name, length)| {
                    let length = match length {
                        Some(n) => Some(u32::try_from(n).ok()?),
                        None => None,
                    };
                    DataType::from_name(&type_name, length)
                },
            ),
            opt(alt((
                value(
                    false,
                    pair(expect_token(Token::Not), expect_token(Token::Null)),
                ),
                value(true, expect_token(Token::Null)),
            ))),
        )),
        |(name, data_type, nullable)| ColumnDefinition {
            name,
            data_type,
            nullable: nullable.unwrap_or(true),
        },
    )(tokens)
}

/// DROP TABLE [IF EXISTS] name
fn drop_table(tokens: &[Token]) -> IResult<&[Token], DropTableStatement> {
    map(
        tuple((
            expect_token(Token::Drop),
            expect_token(Token::Table),
            opt(pair(expect_token(Token::If), expect_token(Token::Exists))),
            identifier,
        )),
        |(_, _, if_exists, name)| DropTableStatement {
            name,
            if_exists: if_exists.is_some(),
        },
    )(tokens)
}

/// INSERT INTO table [(columns)] VALUES (literals), ...
fn insert(tokens: &[Token]) -> IResult<&[Token], InsertStatement> {
    map(
        tuple((
            expect_token(Token::Insert),
            expect_token(Token::Into),
            identifier,
            opt(delimited(
                expect_token(Token::LeftParen),
                separated_list1(expect_token(Token::Comma), identifier),
                expect_token(Token::RightParen),
            )),
            expect_token(Token::Values),
            separated_list1(
                expect_token(Token::Comma),
                delimited(
                    expect_token(Token::LeftParen),
                    separated_list1(expect_token(Token::Comma), literal),
                    expect_token(Token::RightParen),
                ),
            ),
        )),
        |(_, _, table, columns, _, rows)| InsertStatement {
            table,
            columns,
            rows,
        },
    )(tokens)
}

/// UPDATE table SET column = literal, ... [WHERE predicate]
fn update(tokens: &[Token]) -> IResult<&[Token], UpdateStatement> {
    map(
        tuple((
            expect_token(Token::Update),
            identifier,
            expect_token(Token::Set),
            separated_list1(
                expect_token(Token::Comma),
                map(
                    tuple((identifier, expect_token(Token::Equal), literal)),
                    |(column, _, value)| Assignment { column, value },
                ),
            ),
            opt(where_clause),
        )),
        |(_, table, _, assignments, filter)| UpdateStatement {
            table,
            assignments,
            filter,
        },
    )(tokens)
}

/// DELETE FROM table [WHERE predicate]
fn delete(tokens: &[Token]) -> IResult<&[Token], DeleteStatement> {
    map(
        tuple((
            expect_token(Token::Delete),
            expect_token(Token::From),
            identifier,
            opt(where_clause),
        )),
        |(_, _, table, filter)| DeleteStatement { table, filter },
    )(tokens)
}

/// SELECT (* | count(*) | columns) FROM table [WHERE predicate]
fn select(tokens: &[Token]) -> IResult<&[Token], SelectStatement> {
    map(
        tuple((
            expect_token(Token::Select),
            projection,
            expect_token(Token::From),
            identifier,
            opt(where_clause),
        )),
        |(_, projection, _, table, filter)| SelectStatement {
            projection,
            table,
            filter,
        },
    )(tokens)
}

fn projection(tokens: &[Token]) -> IResult<&[Token], Projection> {
    alt((
        value(Projection::All, expect_token(Token::Star)),
        value(
            Projection::CountStar,
            tuple((
                expect_identifier("COUNT"),
                expect_token(Token::LeftParen),
                expect_token(Token::Star),
                expect_token(Token::RightParen),
            )),
        ),
        map(
            separated_list1(expect_token(Token::Comma), identifier),
            Projection::Columns,
        ),
    ))(tokens)
}

fn where_clause(tokens: &[Token]) -> IResult<&[Token], Predicate> {
    map(
        preceded(
            expect_token(Token::Where),
            separated_list1(expect_token(Token::And), condition),
        ),
        |conditions| Predicate { conditions },
    )(tokens)
}

fn condition(tokens: &[Token]) -> IResult<&[Token], Condition> {
    alt((
        map(
            tuple((
                identifier,
                expect_token(Token::Is),
                opt(expect_token(Token::Not)),
                expect_token(Token::Null),
            )),
            |(column, _, not, _)| Condition::IsNull {
                column,
                negated: not.is_some(),
            },
        ),
        map(
            tuple((identifier, comparison_op, literal)),
            |(column, op, value)| Condition::Compare { column, op, value },
        ),
    ))(tokens)
}

fn comparison_op(tokens: &[Token]) -> IResult<&[Token], ComparisonOp> {
    alt((
        value(ComparisonOp::Equal, expect_token(Token::Equal)),
        value(ComparisonOp::NotEqual, expect_token(Token::NotEqual)),
        value(ComparisonOp::LessEqual, expect_token(Token::LessEqual)),
        value(ComparisonOp::GreaterEqual, expect_token(Token::GreaterEqual)),
        value(ComparisonOp::Less, expect_token(Token::Less)),
        value(ComparisonOp::Greater, expect_token(Token::Greater)),
    ))(tokens)
}

fn literal(tokens: &[Token]) -> IResult<&[Token], Literal> {
    match tokens.first() {
        Some(Token::Integer(i)) => Ok((&tokens[1..], Literal::Integer(*i))),
        Some(Token::Float(f)) => Ok((&tokens[1..], Literal::Float(*f))),
        Some(Token::String(s)) => Ok((&tokens[1..], Literal::String(s.clone()))),
        Some(Token::True) => Ok((&tokens[1..], Literal::Boolean(true))),
        Some(Token::False) => Ok((&tokens[1..], Literal::Boolean(false))),
        Some(Token::Null) => Ok((&tokens[1..], Literal::Null)),
        _ => Err(tag_error(tokens)),
    }
}

/// BEGIN [WORK | TRANSACTION] / START TRANSACTION, then characteristics;
/// COMMIT [WORK]; ROLLBACK [WORK]
fn transaction_statement(tokens: &[Token]) -> IResult<&[Token], TransactionStatement> {
    alt((
        map(
            preceded(
                alt((
                    map(
                        pair(
                            expect_identifier("BEGIN"),
                            opt(alt((
                                expect_identifier("WORK"),
                                expect_identifier("TRANSACTION"),
                            ))),
                        ),
                        |_| (),
                    ),
                    map(
                        pair(
                            expect_identifier("START"),
                            expect_identifier("TRANSACTION"),
                        ),
                        |_| (),
                    ),
                )),
                transaction_characteristics,
            ),
            TransactionStatement::StartTransaction,
        ),
        value(
            TransactionStatement::Commit,
            pair(
                expect_identifier("COMMIT"),
                opt(alt((
                    expect_identifier("WORK"),
                    expect_identifier("TRANSACTION"),
                ))),
            ),
        ),
        value(
            TransactionStatement::Rollback,
            pair(
                expect_identifier("ROLLBACK"),
                opt(alt((
                    expect_identifier("WORK"),
                    expect_identifier("TRANSACTION"),
                ))),
            ),
        ),
    ))(tokens)
}

#[derive(Clone)]
enum Characteristic {
    Isolation(IsolationLevel),
    Access(AccessMode),
}

fn transaction_characteristics(tokens: &[Token]) -> IResult<&[Token], TransactionCharacteristics> {
    map(
        many0(preceded(
            opt(expect_token(Token::Comma)),
            alt((
                map(
                    preceded(
                        pair(expect_identifier("ISOLATION"), expect_identifier("LEVEL")),
                        isolation_level,
                    ),
                    Characteristic::Isolation,
                ),
                value(
                    Characteristic::Access(AccessMode::ReadOnly),
                    pair(expect_identifier("READ"), expect_identifier("ONLY")),
                ),
                value(
                    Characteristic::Access(AccessMode::ReadWrite),
                    pair(expect_identifier("READ"), expect_identifier("WRITE")),
                ),
            )),
        )),
        |items| {
            let mut characteristics = TransactionCharacteristics::default();
            for item in items {
                match item {
                    Characteristic::Isolation(level) => {
                        characteristics.isolation_level = Some(level)
                    }
                    Characteristic::Access(mode) => characteristics.access_mode = Some(mode),
                }
            }
            characteristics
        },
    )(tokens)
}

fn isolation_level(tokens: &[Token]) -> IResult<&[Token], IsolationLevel> {
    alt((
        value(
            IsolationLevel::ReadUncommitted,
            pair(expect_identifier("READ"), expect_identifier("UNCOMMITTED")),
        ),
        value(
            IsolationLevel::ReadCommitted,
            pair(expect_identifier("READ"), expect_identifier("COMMITTED")),
        ),
        value(
            IsolationLevel::RepeatableRead,
            pair(expect_identifier("REPEATABLE"), expect_identifier("READ")),
        ),
        value(
            IsolationLevel::Serializable,
            expect_identifier("SERIALIZABLE"),
        ),
    ))(tokens)
}

fn identifier(tokens: &[Token]) -> IResult<&[Token], String> {
    match tokens.first() {
        Some(Token::Identifier(name)) => Ok((&tokens[1..], name.clone())),
        _ => Err(tag_error(tokens)),
    }
}

fn integer(tokens: &[Token]) -> IResult<&[Token], i64> {
    match tokens.first() {
        Some(Token::Integer(n)) => Ok((&tokens[1..], *n)),
        _ => Err(tag_error(tokens)),
    }
}

fn end_of_input(tokens: &[Token]) -> IResult<&[Token], ()> {
    match tokens {
        [Token::EOF] => Ok((&tokens[1..], ())),
        _ => Err(tag_error(tokens)),
    }
}

/// Expect a specific token
fn expect_token(expected: Token) -> impl Fn(&[Token]) -> IResult<&[Token], Token> {
    move |tokens: &[Token]| match tokens.first() {
        Some(token) if std::mem::discriminant(token) == std::mem::discriminant(&expected) => {
            Ok((&tokens[1..], token.clone()))
        }
        _ => Err(tag_error(tokens)),
    }
}

/// Helper function to expect a specific identifier (case-insensitive)
fn expect_identifier(name: &'static str) -> impl Fn(&[Token]) -> IResult<&[Token], Token> {
    move |tokens: &[Token]| match tokens.first() {
        Some(token @ Token::Identifier(id)) if id.eq_ignore_ascii_case(name) => {
            Ok((&tokens[1..], token.clone()))
        }
        _ => Err(tag_error(tokens)),
    }
}

fn tag_error(tokens: &[Token]) -> nom::Err<nom::error::Error<&[Token]>> {
    nom::Err::Error(nom::error::Error::new(tokens, nom::error::ErrorKind::Tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table() {
        let stmt = parse_statement(
            "CREATE TABLE IF NOT EXISTS t (i tinyint NOT NULL, name varchar(10), ok boolean)",
        )
        .unwrap();
        let Statement::CreateTable(create) = stmt else {
            panic!("expected CREATE TABLE");
        };
        assert!(create.if_not_exists);
        assert_eq!(create.name, "t");
        assert_eq!(create.columns.len(), 3);
        assert_eq!(create.columns[0].data_type, DataType::TinyInt);
        assert!(!create.columns[0].nullable);
        assert_eq!(create.columns[1].data_type, DataType::Varchar(Some(10)));
    }

    #[test]
    fn test_insert_multiple_rows() {
        let stmt = parse_statement("insert into t (i, name) values (1, 'a'), (2, NULL);").unwrap();
        assert_eq!(
            stmt,
            Statement::Insert(InsertStatement {
                table: "t".to_string(),
                columns: Some(vec!["i".to_string(), "name".to_string()]),
                rows: vec![
                    vec![Literal::Integer(1), Literal::String("a".to_string())],
                    vec![Literal::Integer(2), Literal::Null],
                ],
            })
        );
    }

    #[test]
    fn test_select_count_and_where() {
        let stmt = parse_statement("select count(*) from t where i >= 3 and name is not null")
            .unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected SELECT");
        };
        assert_eq!(select.projection, Projection::CountStar);
        let filter = select.filter.unwrap();
        assert_eq!(filter.conditions.len(), 2);
        assert_eq!(
            filter.conditions[1],
            Condition::IsNull {
                column: "name".to_string(),
                negated: true
            }
        );
    }

    #[test]
    fn test_column_named_count_is_still_a_column() {
        let stmt = parse_statement("select count, i from t").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected SELECT");
        };
        assert_eq!(
            select.projection,
            Projection::Columns(vec!["count".to_string(), "i".to_string()])
        );
    }

    #[test]
    fn test_update_and_delete() {
        let stmt = parse_statement("UPDATE t SET i = 7, name = 'x' WHERE i = 1").unwrap();
        let Statement::Update(update) = stmt else {
            panic!("expected UPDATE");
        };
        assert_eq!(update.assignments.len(), 2);
        assert!(update.filter.is_some());

        let stmt = parse_statement("DELETE FROM t").unwrap();
        assert_eq!(
            stmt,
            Statement::Delete(DeleteStatement {
                table: "t".to_string(),
                filter: None
            })
        );
    }

    #[test]
    fn test_transaction_statements() {
        assert_eq!(
            parse_statement("START TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .unwrap(),
            Statement::TransactionStatement(TransactionStatement::StartTransaction(
                TransactionCharacteristics {
                    isolation_level: Some(IsolationLevel::RepeatableRead),
                    access_mode: Some(AccessMode::ReadOnly),
                }
            ))
        );
        assert_eq!(
            parse_statement("begin").unwrap(),
            Statement::TransactionStatement(TransactionStatement::StartTransaction(
                TransactionCharacteristics::default()
            ))
        );
        assert_eq!(
            parse_statement("COMMIT WORK").unwrap(),
            Statement::TransactionStatement(TransactionStatement::Commit)
        );
        assert_eq!(
            parse_statement("rollback;").unwrap(),
            Statement::TransactionStatement(TransactionStatement::Rollback)
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_statement("  -- nothing\n"), Err(ParserError::EmptyStatement));
        assert!(matches!(
            parse_statement("select * from t extra"),
            Err(ParserError::UnexpectedToken(Token::Identifier(_)))
        ));
        assert!(matches!(
            parse_statement("create table t (i blob)"),
            Err(ParserError::UnexpectedToken(_))
        ));
        assert!(matches!(
            parse_statement("select 'oops"),
            Err(ParserError::LexerError(_))
        ));
    }

    #[test]
    fn test_split_script() {
        let script = "create table t (s varchar);\n-- a comment; with a semicolon\ninsert into t values ('a;b');;\nselect * from t";
        assert_eq!(
            split_script(script),
            vec![
                "create table t (s varchar)".to_string(),
                "insert into t values ('a;b')".to_string(),
                "select * from t".to_string(),
            ]
        );
    }
}
