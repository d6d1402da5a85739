use super::Statement;
use hubcore::{ParamType, ParamValue, ScriptError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Equals,
}

fn syntax(line: usize, message: impl Into<String>) -> ScriptError {
    ScriptError::Syntax {
        line,
        message: message.into(),
    }
}

pub(super) fn parse_line(line: usize, text: &str) -> Result<Statement, ScriptError> {
    let text = text.trim_start();
    if let Some(rest) = text.strip_prefix('#') {
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        return Ok(Statement::Comment(rest.to_string()));
    }
    let text = text.trim_end();
    if text.is_empty() {
        return Ok(Statement::Blank);
    }

    let tokens = tokenize(line, text)?;
    match tokens.as_slice() {
        [Token::Ident(var), Token::Equals, rest @ ..] => parse_assignment(line, var, rest),
        _ => parse_call(line, &tokens),
    }
}

fn tokenize(line: usize, text: &str) -> Result<Vec<Token>, ScriptError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '#' => break,
            '(' | ')' | '[' | ']' | ',' | '=' => {
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    ',' => Token::Comma,
                    _ => Token::Equals,
                });
                pos += 1;
            }
            '\'' | '"' => {
                let (value, next) = lex_string(line, &chars, pos)?;
                tokens.push(Token::Str(value));
                pos = next;
            }
            '-' if chars[pos + 1..].starts_with(&['i', 'n', 'f']) => {
                tokens.push(Token::Float(f64::NEG_INFINITY));
                pos += 4;
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let (token, next) = lex_number(line, &chars, pos)?;
                tokens.push(token);
                pos = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            }
            other => return Err(syntax(line, format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

fn lex_string(line: usize, chars: &[char], start: usize) -> Result<(String, usize), ScriptError> {
    let delimiter = chars[start];
    let mut value = String::new();
    let mut pos = start + 1;

    while pos < chars.len() {
        match chars[pos] {
            c if c == delimiter => return Ok((value, pos + 1)),
            '\\' => {
                let Some(&escaped) = chars.get(pos + 1) else {
                    break;
                };
                match escaped {
                    '\\' | '\'' | '"' => value.push(escaped),
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                pos += 2;
            }
            c => {
                value.push(c);
                pos += 1;
            }
        }
    }

    Err(syntax(line, "unterminated string literal"))
}

fn lex_number(line: usize, chars: &[char], start: usize) -> Result<(Token, usize), ScriptError> {
    let mut pos = start;
    if matches!(chars[pos], '-' | '+') {
        pos += 1;
    }
    while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
        pos += 1;
    }
    if pos < chars.len() && matches!(chars[pos], 'e' | 'E') {
        pos += 1;
        if pos < chars.len() && matches!(chars[pos], '-' | '+') {
            pos += 1;
        }
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }

    let literal: String = chars[start..pos].iter().collect();
    let token = if literal.contains(&['.', 'e', 'E'][..]) {
        literal.parse::<f64>().ok().map(Token::Float)
    } else {
        literal.parse::<i64>().ok().map(Token::Int)
    };
    token
        .map(|token| (token, pos))
        .ok_or_else(|| syntax(line, format!("invalid number '{}'", literal)))
}

/// Split `name(arg, ...)` into the callee and its single-token arguments
fn split_call<'t>(line: usize, tokens: &'t [Token]) -> Result<(&'t str, Vec<&'t Token>), ScriptError> {
    let [Token::Ident(name), Token::LParen, inner @ .., Token::RParen] = tokens else {
        return Err(syntax(line, "expected a function call"));
    };

    let mut args = Vec::new();
    if !inner.is_empty() {
        for (index, chunk) in inner.split(|t| *t == Token::Comma).enumerate() {
            match chunk {
                [arg] => args.push(arg),
                _ => {
                    return Err(syntax(
                        line,
                        format!("malformed argument {} to {}()", index + 1, name),
                    ))
                }
            }
        }
    }

    Ok((name.as_str(), args))
}

fn parse_assignment(line: usize, var: &str, rest: &[Token]) -> Result<Statement, ScriptError> {
    let var = var.to_string();

    if let [Token::Ident(list), Token::LBracket, Token::Int(index), Token::RBracket] = rest {
        let index = usize::try_from(*index)
            .map_err(|_| syntax(line, format!("negative index into '{}'", list)))?;
        return Ok(Statement::SelectHub {
            var,
            list: list.clone(),
            index,
        });
    }

    let (func, args) = split_call(line, rest)?;
    match (func, args.as_slice()) {
        ("getMasterHub", []) => Ok(Statement::MasterHub { var }),
        ("getVistleSession", []) => Ok(Statement::Session { var }),
        ("spawnAsync", [hub, type_name]) => Ok(Statement::SpawnAsync {
            token: var,
            hub: ident(line, func, hub)?,
            type_name: string(line, func, type_name)?,
        }),
        ("waitForSpawn", [token]) => Ok(Statement::WaitForSpawn {
            var,
            token: ident(line, func, token)?,
        }),
        ("waitForHub", []) => Ok(Statement::WaitForHub { var }),
        ("waitForHubs", [count]) => {
            let count = usize::try_from(int(line, func, count)?)
                .map_err(|_| syntax(line, "waitForHubs() expects a non-negative count"))?;
            Ok(Statement::WaitForHubs { var, count })
        }
        _ => Err(syntax(
            line,
            format!("unsupported call {}() with {} arguments", func, args.len()),
        )),
    }
}

fn parse_call(line: usize, tokens: &[Token]) -> Result<Statement, ScriptError> {
    let (func, args) = split_call(line, tokens)?;
    match (func, args.as_slice()) {
        ("applyParameters", [module]) => Ok(Statement::ApplyParameters {
            module: ident(line, func, module)?,
        }),
        ("printInfo", [text]) => Ok(Statement::PrintInfo(string(line, func, text)?)),
        ("connect", [from_module, from_port, to_module, to_port]) => Ok(Statement::Connect {
            from_module: ident(line, func, from_module)?,
            from_port: string(line, func, from_port)?,
            to_module: ident(line, func, to_module)?,
            to_port: string(line, func, to_port)?,
        }),
        _ if func.starts_with("set") && func.ends_with("Param") => {
            parse_set_parameter(line, func, &args)
        }
        _ => Err(syntax(
            line,
            format!("unsupported call {}() with {} arguments", func, args.len()),
        )),
    }
}

fn parse_set_parameter(line: usize, func: &str, args: &[&Token]) -> Result<Statement, ScriptError> {
    let param_type = func
        .strip_prefix("set")
        .and_then(|s| s.strip_suffix("Param"))
        .and_then(ParamType::from_name)
        .ok_or_else(|| syntax(line, format!("unknown parameter setter {}()", func)))?;

    let [module, name, rest @ ..] = args else {
        return Err(syntax(
            line,
            format!("{}() expects a module and a parameter name", func),
        ));
    };
    let module = ident(line, func, module)?;
    let name = string(line, func, name)?;

    let (values, delayed) = match rest.split_last() {
        Some((Token::Ident(flag), values)) if flag == "True" || flag == "False" => {
            (values, flag == "True")
        }
        _ => (rest, false),
    };

    let value = match (param_type, values) {
        (ParamType::Int, [v]) => ParamValue::Int(int(line, func, v)?),
        (ParamType::Float, [v]) => ParamValue::Float(number(line, func, v)?),
        (ParamType::String, [v]) => ParamValue::String(string(line, func, v)?),
        (ParamType::Vector, values) => ParamValue::Vector(
            values
                .iter()
                .map(|v| number(line, func, v))
                .collect::<Result<_, _>>()?,
        ),
        (ParamType::IntVector, values) => ParamValue::IntVector(
            values
                .iter()
                .map(|v| int(line, func, v))
                .collect::<Result<_, _>>()?,
        ),
        _ => {
            return Err(syntax(
                line,
                format!("{}() expects exactly one value, got {}", func, values.len()),
            ))
        }
    };

    Ok(Statement::SetParameter {
        module,
        name,
        value,
        delayed,
    })
}

fn ident(line: usize, func: &str, token: &Token) -> Result<String, ScriptError> {
    match token {
        Token::Ident(name) => Ok(name.clone()),
        other => Err(syntax(
            line,
            format!("{}() expects a variable, got {:?}", func, other),
        )),
    }
}

fn string(line: usize, func: &str, token: &Token) -> Result<String, ScriptError> {
    match token {
        Token::Str(s) => Ok(s.clone()),
        other => Err(syntax(
            line,
            format!("{}() expects a string, got {:?}", func, other),
        )),
    }
}

fn int(line: usize, func: &str, token: &Token) -> Result<i64, ScriptError> {
    match token {
        Token::Int(i) => Ok(*i),
        other => Err(syntax(
            line,
            format!("{}() expects an integer, got {:?}", func, other),
        )),
    }
}

fn number(line: usize, func: &str, token: &Token) -> Result<f64, ScriptError> {
    match token {
        Token::Int(i) => Ok(*i as f64),
        Token::Float(x) => Ok(*x),
        Token::Ident(name) if name == "inf" => Ok(f64::INFINITY),
        Token::Ident(name) if name == "NaN" || name == "nan" => Ok(f64::NAN),
        other => Err(syntax(
            line,
            format!("{}() expects a number, got {:?}", func, other),
        )),
    }
}
