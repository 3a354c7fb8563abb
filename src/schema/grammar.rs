use super::ast::*;
use super::lexer::{Lexer, Token};
use crate::error::SchemaError;

/// Parse protobuf schema text into an AST.
pub fn parse_file(input: &str) -> Result<AstFile, SchemaError> {
    let mut lexer = Lexer::new(input);
    let mut package = None;
    let mut items = Vec::new();

    loop {
        let tok = lexer.peek_token();
        match &tok.token {
            Token::Eof => break,
            Token::Semi => {
                lexer.next_token();
            }
            Token::Ident(kw) => match kw.as_str() {
                "syntax" => {
                    lexer.next_token();
                    expect_token(&mut lexer, Token::Eq)?;
                    expect_string(&mut lexer)?;
                    expect_token(&mut lexer, Token::Semi)?;
                }
                "package" => {
                    lexer.next_token();
                    package = Some(parse_dotted_name(&mut lexer)?);
                    expect_token(&mut lexer, Token::Semi)?;
                }
                "import" => {
                    lexer.next_token();
                    // Optional 'public' / 'weak' modifier
                    if let Token::Ident(m) = &lexer.peek_token().token {
                        if m == "public" || m == "weak" {
                            lexer.next_token();
                        }
                    }
                    expect_string(&mut lexer)?;
                    expect_token(&mut lexer, Token::Semi)?;
                }
                "option" => {
                    lexer.next_token();
                    skip_to_semi(&mut lexer)?;
                }
                "message" => {
                    items.push(AstItem::Message(parse_message(&mut lexer)?));
                }
                "enum" => {
                    items.push(AstItem::Enum(parse_enum(&mut lexer)?));
                }
                "extend" => {
                    items.push(AstItem::Extend(parse_extend(&mut lexer)?));
                }
                other => {
                    return Err(SchemaError::Syntax {
                        line: tok.line,
                        message: format!("unexpected top-level keyword '{}'", other),
                    });
                }
            },
            other => {
                return Err(SchemaError::Syntax {
                    line: tok.line,
                    message: format!("expected declaration, found {:?}", other),
                });
            }
        }
    }

    Ok(AstFile { package, items })
}

fn parse_message(lexer: &mut Lexer) -> Result<AstMessage, SchemaError> {
    // Consume 'message'
    let kw = lexer.next_token();
    let line = kw.line;

    let name = expect_ident(lexer)?;
    expect_token(lexer, Token::LBrace)?;
    let members = parse_members(lexer)?;
    expect_token(lexer, Token::RBrace)?;

    Ok(AstMessage {
        name,
        members,
        line,
    })
}

fn parse_members(lexer: &mut Lexer) -> Result<Vec<AstMember>, SchemaError> {
    let mut members = Vec::new();

    loop {
        let tok = lexer.peek_token();
        match &tok.token {
            Token::RBrace | Token::Eof => break,
            Token::Semi => {
                lexer.next_token();
            }
            Token::Ident(kw) => match kw.as_str() {
                "message" => {
                    members.push(AstMember::Nested(parse_message(lexer)?));
                }
                "enum" => {
                    members.push(AstMember::Enum(parse_enum(lexer)?));
                }
                "extend" => {
                    members.push(AstMember::Extend(parse_extend(lexer)?));
                }
                "option" | "reserved" | "extensions" => {
                    lexer.next_token();
                    skip_to_semi(lexer)?;
                }
                "oneof" => {
                    // Members of a oneof become plain singular fields.
                    lexer.next_token();
                    expect_ident(lexer)?;
                    expect_token(lexer, Token::LBrace)?;
                    loop {
                        let inner = lexer.peek_token();
                        match &inner.token {
                            Token::RBrace => break,
                            Token::Eof => {
                                return Err(SchemaError::Syntax {
                                    line: inner.line,
                                    message: "unterminated oneof body".into(),
                                });
                            }
                            Token::Semi => {
                                lexer.next_token();
                            }
                            Token::Ident(k) if k == "option" => {
                                lexer.next_token();
                                skip_to_semi(lexer)?;
                            }
                            _ => {
                                members.push(AstMember::Field(parse_field(lexer)?));
                            }
                        }
                    }
                    expect_token(lexer, Token::RBrace)?;
                }
                "map" => {
                    members.push(AstMember::Map(parse_map_field(lexer)?));
                }
                _ => {
                    members.push(AstMember::Field(parse_field(lexer)?));
                }
            },
            Token::Dot => {
                // Absolute type reference starting a field
                members.push(AstMember::Field(parse_field(lexer)?));
            }
            other => {
                return Err(SchemaError::Syntax {
                    line: tok.line,
                    message: format!("expected field, nested type, or '}}', found {:?}", other),
                });
            }
        }
    }

    Ok(members)
}

fn parse_field(lexer: &mut Lexer) -> Result<AstField, SchemaError> {
    let line = lexer.current_line();

    // Optional label
    let mut repeated = false;
    if let Token::Ident(label) = &lexer.peek_token().token {
        match label.as_str() {
            "repeated" => {
                repeated = true;
                lexer.next_token();
            }
            "optional" | "required" => {
                lexer.next_token();
            }
            _ => {}
        }
    }

    let type_name = parse_type_ref(lexer)?;
    let name = expect_ident(lexer)?;
    expect_token(lexer, Token::Eq)?;
    let number = expect_number(lexer)?;
    skip_field_options(lexer)?;
    expect_token(lexer, Token::Semi)?;

    Ok(AstField {
        repeated,
        type_name,
        name,
        number,
        line,
    })
}

fn parse_map_field(lexer: &mut Lexer) -> Result<AstMap, SchemaError> {
    let kw = lexer.next_token(); // 'map'
    let line = kw.line;

    expect_token(lexer, Token::LAngle)?;
    let key_type = expect_ident(lexer)?;
    expect_token(lexer, Token::Comma)?;
    let value_type = parse_type_ref(lexer)?;
    expect_token(lexer, Token::RAngle)?;
    let name = expect_ident(lexer)?;
    expect_token(lexer, Token::Eq)?;
    let number = expect_number(lexer)?;
    skip_field_options(lexer)?;
    expect_token(lexer, Token::Semi)?;

    Ok(AstMap {
        key_type,
        value_type,
        name,
        number,
        line,
    })
}

fn parse_enum(lexer: &mut Lexer) -> Result<AstEnum, SchemaError> {
    let kw = lexer.next_token(); // 'enum'
    let line = kw.line;

    let name = expect_ident(lexer)?;
    expect_token(lexer, Token::LBrace)?;

    let mut values = Vec::new();
    loop {
        let tok = lexer.peek_token();
        match &tok.token {
            Token::RBrace | Token::Eof => break,
            Token::Semi => {
                lexer.next_token();
            }
            Token::Ident(kw) if kw == "option" || kw == "reserved" => {
                lexer.next_token();
                skip_to_semi(lexer)?;
            }
            Token::Ident(_) => {
                let value_name = expect_ident(lexer)?;
                expect_token(lexer, Token::Eq)?;
                let negative = if lexer.peek_token().token == Token::Minus {
                    lexer.next_token();
                    true
                } else {
                    false
                };
                let magnitude = expect_number(lexer)?;
                skip_field_options(lexer)?;
                expect_token(lexer, Token::Semi)?;
                values.push((value_name, if negative { -magnitude } else { magnitude }));
            }
            other => {
                return Err(SchemaError::Syntax {
                    line: tok.line,
                    message: format!("expected enum value or '}}', found {:?}", other),
                });
            }
        }
    }
    expect_token(lexer, Token::RBrace)?;

    Ok(AstEnum { name, values, line })
}

fn parse_extend(lexer: &mut Lexer) -> Result<AstExtend, SchemaError> {
    let kw = lexer.next_token(); // 'extend'
    let line = kw.line;

    let extendee = parse_type_ref(lexer)?;
    expect_token(lexer, Token::LBrace)?;

    let mut fields = Vec::new();
    loop {
        let tok = lexer.peek_token();
        match &tok.token {
            Token::RBrace | Token::Eof => break,
            Token::Semi => {
                lexer.next_token();
            }
            _ => {
                fields.push(parse_field(lexer)?);
            }
        }
    }
    expect_token(lexer, Token::RBrace)?;

    Ok(AstExtend {
        extendee,
        fields,
        line,
    })
}

/// A type reference: `Foo`, `Foo.Bar`, or absolute `.pkg.Foo`.
fn parse_type_ref(lexer: &mut Lexer) -> Result<String, SchemaError> {
    let mut name = String::new();
    if lexer.peek_token().token == Token::Dot {
        lexer.next_token();
        name.push('.');
    }
    name.push_str(&parse_dotted_name(lexer)?);
    Ok(name)
}

fn parse_dotted_name(lexer: &mut Lexer) -> Result<String, SchemaError> {
    let mut name = expect_ident(lexer)?;
    while lexer.peek_token().token == Token::Dot {
        lexer.next_token();
        name.push('.');
        name.push_str(&expect_ident(lexer)?);
    }
    Ok(name)
}

/// Skip `[...]` field options, tolerating nested brackets and braces
/// (aggregate option syntax).
fn skip_field_options(lexer: &mut Lexer) -> Result<(), SchemaError> {
    if lexer.peek_token().token != Token::LBracket {
        return Ok(());
    }
    lexer.next_token();
    let mut depth = 1usize;
    loop {
        let tok = lexer.next_token();
        match tok.token {
            Token::LBracket | Token::LBrace => depth += 1,
            Token::RBracket | Token::RBrace => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Token::Eof => {
                return Err(SchemaError::Syntax {
                    line: tok.line,
                    message: "unterminated field options".into(),
                });
            }
            _ => {}
        }
    }
}

/// Skip to the terminating `;` of a statement, tolerating aggregate
/// option braces.
fn skip_to_semi(lexer: &mut Lexer) -> Result<(), SchemaError> {
    let mut depth = 0usize;
    loop {
        let tok = lexer.next_token();
        match tok.token {
            Token::LBrace => depth += 1,
            Token::RBrace => depth = depth.saturating_sub(1),
            Token::Semi if depth == 0 => return Ok(()),
            Token::Eof => {
                return Err(SchemaError::Syntax {
                    line: tok.line,
                    message: "unterminated statement".into(),
                });
            }
            _ => {}
        }
    }
}

// Helper functions

fn expect_ident(lexer: &mut Lexer) -> Result<String, SchemaError> {
    let tok = lexer.next_token();
    match tok.token {
        Token::Ident(n) => Ok(n),
        other => Err(SchemaError::Syntax {
            line: tok.line,
            message: format!("expected identifier, found {:?}", other),
        }),
    }
}

fn expect_number(lexer: &mut Lexer) -> Result<i32, SchemaError> {
    let tok = lexer.next_token();
    match tok.token {
        Token::Int(n) if n <= i32::MAX as u64 => Ok(n as i32),
        other => Err(SchemaError::Syntax {
            line: tok.line,
            message: format!("expected field number, found {:?}", other),
        }),
    }
}

fn expect_string(lexer: &mut Lexer) -> Result<String, SchemaError> {
    let tok = lexer.next_token();
    match tok.token {
        Token::Str(s) => Ok(s),
        other => Err(SchemaError::Syntax {
            line: tok.line,
            message: format!("expected string literal, found {:?}", other),
        }),
    }
}

fn expect_token(lexer: &mut Lexer, expected: Token) -> Result<(), SchemaError> {
    let tok = lexer.next_token();
    if tok.token == expected {
        Ok(())
    } else {
        Err(SchemaError::Syntax {
            line: tok.line,
            message: format!("expected {:?}, found {:?}", expected, tok.token),
        })
    }
}
