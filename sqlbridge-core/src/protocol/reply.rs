//! Result envelopes.
//!
//! * status codes and integers render as decimal text,
//! * strings render quoted, SQL NULL as `null`,
//! * open and prepare render `status;handle`,
//! * a call the sandbox cannot decode renders `fault: <reason>`.
//!
//! The host parses each reply according to the operation it issued.

use sqlbridge_db::ResultCode;

use super::escape::{quote, unquote};
use super::ProtocolError;

const FAULT_PREFIX: &str = "fault: ";

/// A reply produced by the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Native status code.
    Code(ResultCode),
    /// Integer result.
    Int(i64),
    /// String result, `None` for SQL NULL.
    Text(Option<String>),
    /// Status plus new handle (`0` when none was created).
    Pair(ResultCode, u32),
    /// The call was rejected before reaching the engine.
    Fault(String),
}

impl Reply {
    /// Renders the result envelope.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Code(code) => code.0.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Text(Some(s)) => quote(s),
            Self::Text(None) => "null".to_string(),
            Self::Pair(code, handle) => format!("{};{handle}", code.0),
            Self::Fault(reason) => {
                let reason = reason.replace(['\n', '\r'], " ");
                format!("{FAULT_PREFIX}{reason}")
            }
        }
    }
}

fn check_fault(reply: &str) -> Result<(), ProtocolError> {
    match reply.strip_prefix(FAULT_PREFIX) {
        Some(reason) => Err(ProtocolError::Fault(reason.to_string())),
        None => Ok(()),
    }
}

/// Parses a status-code reply.
pub fn parse_code(reply: &str) -> Result<ResultCode, ProtocolError> {
    check_fault(reply)?;
    reply
        .trim()
        .parse::<i32>()
        .map(ResultCode)
        .map_err(|_| ProtocolError::NotNumeric(reply.to_string()))
}

/// Parses an integer reply.
pub fn parse_int(reply: &str) -> Result<i64, ProtocolError> {
    check_fault(reply)?;
    reply
        .trim()
        .parse::<i64>()
        .map_err(|_| ProtocolError::NotNumeric(reply.to_string()))
}

/// Parses a string reply; `null` maps to `None`.
pub fn parse_text(reply: &str) -> Result<Option<String>, ProtocolError> {
    check_fault(reply)?;
    let reply = reply.trim();
    if reply == "null" {
        return Ok(None);
    }
    let (text, rest) = unquote(reply)?;
    if !rest.is_empty() {
        return Err(ProtocolError::MalformedCall(format!("trailing input `{rest}`")));
    }
    Ok(Some(text))
}

/// Parses a `status;handle` reply.
pub fn parse_pair(reply: &str) -> Result<(ResultCode, u32), ProtocolError> {
    check_fault(reply)?;
    let fields: Vec<&str> = reply.trim().split(';').collect();
    let [status, handle] = fields.as_slice() else {
        return Err(ProtocolError::FieldCount {
            expected: 2,
            found: fields.len(),
        });
    };
    let status = status
        .parse::<i32>()
        .map_err(|_| ProtocolError::NotNumeric((*status).to_string()))?;
    let handle = handle
        .parse::<u32>()
        .map_err(|_| ProtocolError::NotNumeric((*handle).to_string()))?;
    Ok((ResultCode(status), handle))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn renders_each_shape() {
        assert_eq!(Reply::Code(ResultCode::ROW).render(), "100");
        assert_eq!(Reply::Int(i64::MIN).render(), "-9223372036854775808");
        assert_eq!(Reply::Text(None).render(), "null");
        assert_eq!(Reply::Text(Some("say \"hi\"".into())).render(), r#""say \"hi\"""#);
        assert_eq!(Reply::Pair(ResultCode::OK, 42).render(), "0;42");
        assert_eq!(Reply::Fault("bad\ncall".into()).render(), "fault: bad call");
    }

    #[test]
    fn pair_reply_parses() {
        assert_eq!(parse_pair("0;42"), Ok((ResultCode::OK, 42)));
        assert_eq!(parse_pair("14;0"), Ok((ResultCode::CANTOPEN, 0)));
    }

    #[test_case("abc", ProtocolError::FieldCount { expected: 2, found: 1 } ; "single field")]
    #[test_case("0;1;2", ProtocolError::FieldCount { expected: 2, found: 3 } ; "three fields")]
    #[test_case("x;1", ProtocolError::NotNumeric("x".into()) ; "bad status")]
    #[test_case("0;-1", ProtocolError::NotNumeric("-1".into()) ; "negative handle")]
    fn malformed_pair_is_rejected(reply: &str, expected: ProtocolError) {
        assert_eq!(parse_pair(reply), Err(expected));
    }

    #[test]
    fn non_numeric_code_is_rejected() {
        assert_eq!(parse_code("abc"), Err(ProtocolError::NotNumeric("abc".into())));
        assert_eq!(parse_code("101"), Ok(ResultCode::DONE));
    }

    #[test]
    fn fault_is_surfaced() {
        assert_eq!(
            parse_int("fault: unknown command `x`"),
            Err(ProtocolError::Fault("unknown command `x`".into()))
        );
    }

    #[test]
    fn text_reply_round_trips() {
        let text = "multi\nline \"quoted\" \\ tail\0";
        let rendered = Reply::Text(Some(text.into())).render();
        assert_eq!(parse_text(&rendered), Ok(Some(text.to_string())));
        assert_eq!(parse_text("null"), Ok(None));
        assert!(parse_text("bare").is_err());
    }

    #[test]
    fn int_reply_is_lossless() {
        assert_eq!(parse_int(&Reply::Int(i64::MAX).render()), Ok(i64::MAX));
    }
}
