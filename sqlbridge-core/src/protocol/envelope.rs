//! The call envelope: `name(arg, arg, ...)`.
//!
//! Arguments are decimal integers, quoted strings, `0x<hex>` side-channel
//! addresses or `null`. Whitespace between tokens is ignored; nothing may
//! follow the closing parenthesis.

use std::fmt;
use std::str::FromStr;

use super::escape::{quote_into, unquote};
use super::{Command, ProtocolError};
use crate::memory::Addr;

/// One argument token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Decimal integer.
    Int(i64),
    /// Quoted string.
    Text(String),
    /// Side-channel block address.
    Addr(Addr),
    /// The `null` literal.
    Null,
}

/// A decoded call envelope, before argument typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Operation name.
    pub command: Command,
    /// Arguments in order.
    pub args: Vec<Arg>,
}

impl Call {
    /// Creates a call.
    #[must_use]
    pub const fn new(command: Command, args: Vec<Arg>) -> Self {
        Self { command, args }
    }

    /// Renders the envelope text.
    #[must_use]
    pub fn encode(&self) -> String {
        let name: &'static str = self.command.into();
        let mut out = String::with_capacity(name.len() + 2 + self.args.len() * 8);
        out.push_str(name);
        out.push('(');
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match arg {
                Arg::Int(v) => out.push_str(&v.to_string()),
                Arg::Text(s) => quote_into(&mut out, s),
                Arg::Addr(a) => out.push_str(&a.to_string()),
                Arg::Null => out.push_str("null"),
            }
        }
        out.push(')');
        out
    }

    /// Parses envelope text.
    pub fn decode(input: &str) -> Result<Self, ProtocolError> {
        let open = input
            .find('(')
            .ok_or_else(|| ProtocolError::MalformedCall("missing `(`".to_string()))?;
        let name = input[..open].trim();
        if name.is_empty() {
            return Err(ProtocolError::MalformedCall("missing command name".to_string()));
        }
        let command =
            Command::from_str(name).map_err(|_| ProtocolError::UnknownCommand(name.to_string()))?;

        let mut rest = input[open + 1..].trim_start();
        let mut args = Vec::new();
        if let Some(after) = rest.strip_prefix(')') {
            rest = after;
        } else {
            loop {
                let (arg, after) = parse_arg(rest)?;
                args.push(arg);
                rest = after.trim_start();
                if let Some(after) = rest.strip_prefix(',') {
                    rest = after.trim_start();
                } else if let Some(after) = rest.strip_prefix(')') {
                    rest = after;
                    break;
                } else {
                    return Err(ProtocolError::MalformedCall(
                        "expected `,` or `)` after argument".to_string(),
                    ));
                }
            }
        }
        if !rest.trim().is_empty() {
            return Err(ProtocolError::MalformedCall(format!(
                "trailing input `{}`",
                rest.trim()
            )));
        }
        Ok(Self { command, args })
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn parse_arg(input: &str) -> Result<(Arg, &str), ProtocolError> {
    if input.starts_with('"') {
        let (text, rest) = unquote(input)?;
        return Ok((Arg::Text(text), rest));
    }
    let end = input
        .find(|c: char| c == ',' || c == ')' || c.is_whitespace())
        .unwrap_or(input.len());
    let (token, rest) = input.split_at(end);
    let arg = if token == "null" {
        Arg::Null
    } else if let Some(hex) = token.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
            .map(|raw| Arg::Addr(Addr::from_raw(raw)))
            .map_err(|_| ProtocolError::MalformedCall(format!("bad address `{token}`")))?
    } else if token.is_empty() {
        return Err(ProtocolError::MalformedCall("missing argument".to_string()));
    } else {
        token
            .parse::<i64>()
            .map(Arg::Int)
            .map_err(|_| ProtocolError::MalformedCall(format!("bad token `{token}`")))?
    };
    Ok((arg, rest))
}
