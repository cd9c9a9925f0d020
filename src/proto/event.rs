//! Inbound event argument parsing.
//!
//! The payload of an `EV` command describes a guest event as a name followed
//! by a comma-separated argument list on a single text line, without any
//! structured-data format. Arguments are either quoted strings (with
//! backslash escapes) or bare tokens classified by content. Bare tokens that
//! fail to parse degrade to nil rather than rejecting the whole event, so one
//! bad argument never costs the remote side an entire input.

use std::iter::Peekable;
use std::str::Chars;

/// A typed event argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A decoded guest event: name plus arguments in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub args: Vec<Value>,
}

/// Parse an `EV` payload into a named event.
///
/// The name runs to the first comma (or the whole payload if there is none);
/// the argument list may be empty.
pub fn parse_event(payload: &str) -> Event {
    match payload.split_once(',') {
        Some((name, rest)) => Event {
            name: name.to_string(),
            args: parse_args(rest),
        },
        None => Event {
            name: payload.to_string(),
            args: Vec::new(),
        },
    }
}

/// Parse a comma-separated argument list.
pub fn parse_args(input: &str) -> Vec<Value> {
    let mut args = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        let mut saw_comma = false;
        let arg = match chars.peek() {
            Some(&q) if q == '"' || q == '\'' => {
                chars.next();
                let text = quoted_string(&mut chars, q);
                // Skip to the separating comma; trailing junk after the
                // closing quote is dropped.
                for c in chars.by_ref() {
                    if c == ',' {
                        saw_comma = true;
                        break;
                    }
                }
                Value::Text(text)
            }
            _ => {
                let mut token = String::new();
                for c in chars.by_ref() {
                    if c == ',' {
                        saw_comma = true;
                        break;
                    }
                    token.push(c);
                }
                classify(&token)
            }
        };
        args.push(arg);

        if chars.peek().is_none() {
            // A separator at the very end still delimits one final empty
            // argument
            if saw_comma {
                args.push(Value::Nil);
            }
            break;
        }
    }

    args
}

// Consume a quoted string body up to (and including) the closing quote.
// An unterminated string runs to the end of input.
fn quoted_string(chars: &mut Peekable<Chars>, quote: char) -> String {
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            c if c == quote => break,
            '\\' => match chars.next() {
                Some('a') => out.push('\x07'),
                Some('b') => out.push('\x08'),
                Some('f') => out.push('\x0c'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('v') => out.push('\x0b'),
                Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                // Unknown escapes keep the escaped character
                Some(c) => out.push(c),
                None => break,
            },
            c => out.push(c),
        }
    }
    out
}

fn classify(token: &str) -> Value {
    match token {
        "nil" => Value::Nil,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match token.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Nil,
        },
    }
}
