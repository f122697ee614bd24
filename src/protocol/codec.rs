//! Command Codec
//!
//! Builds command lines and takes replies apart.
//!
//! ## Encoding
//!
//! ```text
//! <VERB> <arg1> <arg2> ... [<bare>...] [LIMIT(n)] [OFFSET(n)] [LANG(code)]
//! ```
//!
//! Positional arguments go out verbatim, in call order. Free text must be
//! passed through [`escape`] first so it travels as one quoted argument and
//! can never end the line early.
//!
//! ## Decoding
//!
//! Most commands answer with one line. `QUERY`, `SUGGEST` and `LIST` answer
//! `PENDING <marker>` immediately and deliver the real answer later as
//! `EVENT <VERB> <marker> <item>...`; both lines are read before the
//! connection goes back to the pool.

use crate::connection::Connection;
use crate::error::{ClientError, SonicError, SonicResult};
use crate::protocol::types::{prefix, split_meta, Command};
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::trace;

/// Optional trailing modifiers of a command.
///
/// Rendered after the positional arguments: bare tokens in insertion order,
/// then `LIMIT(n)`, `OFFSET(n)`, `LANG(code)`, each only when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub locale: Option<String>,
    pub bare: Vec<String>,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `LIMIT(n)`.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets `OFFSET(n)`.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets `LANG(code)`, an ISO 639-3 code such as `eng`.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Appends a token rendered as-is.
    pub fn bare(mut self, token: impl Into<String>) -> Self {
        self.bare.push(token.into());
        self
    }

    /// Checks the locale and bare tokens with [`check_token`].
    pub fn check(&self) -> Result<(), ClientError> {
        if let Some(locale) = &self.locale {
            check_token(locale)?;
        }
        self.bare.iter().try_for_each(|token| check_token(token))
    }

    fn render_into(&self, parts: &mut Vec<String>) {
        parts.extend(self.bare.iter().cloned());
        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT({})", limit));
        }
        if let Some(offset) = self.offset {
            parts.push(format!("OFFSET({})", offset));
        }
        if let Some(locale) = &self.locale {
            parts.push(format!("LANG({})", locale));
        }
    }
}

/// Quotes free text for the wire.
///
/// The result is wrapped in double quotes, embedded quotes and backslashes
/// are backslash-escaped, and line breaks (`\r\n`, or a lone `\r` / `\n`)
/// each become a single space so the text cannot terminate the command line.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' => out.push(' '),
            _ => out.push(c),
        }
    }

    out.push('"');
    out
}

/// Number of bytes `c` occupies once escaped and UTF-8 encoded.
#[inline]
pub fn wire_len(c: char) -> usize {
    match c {
        '"' | '\\' => 2,
        _ => c.len_utf8(),
    }
}

/// Checks that `token` can be sent as one bare argument.
///
/// Empty tokens pass; [`encode`] leaves them out.
pub fn check_token(token: &str) -> Result<(), ClientError> {
    if token
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '"')
    {
        return Err(ClientError::InvalidToken(token.to_string()));
    }
    Ok(())
}

/// Builds the command line for `command` (without the CRLF terminator).
///
/// Empty positional arguments are left out, so optional trailing arguments
/// can be passed as `""`.
pub fn encode(command: Command, args: &[&str], modifiers: &Modifiers) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(1 + args.len() + 3);
    parts.push(command.as_str().to_string());
    parts.extend(
        args.iter()
            .filter(|arg| !arg.is_empty())
            .map(|arg| arg.to_string()),
    );
    modifiers.render_into(&mut parts);
    parts.join(" ")
}

/// Reads the authoritative reply to `command` from `conn`.
///
/// Deferred commands consume the `PENDING` acknowledgement and return the
/// `EVENT` line that follows it.
pub async fn read_reply<S>(command: Command, conn: &mut Connection<S>) -> SonicResult<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let first = conn.read_line().await?;
    if !command.is_deferred() {
        return Ok(first);
    }

    let mut tokens = first.split_whitespace();
    if tokens.next() != Some(prefix::PENDING) {
        return Err(SonicError::malformed(command, first));
    }
    let marker = tokens.next().map(str::to_string);
    trace!(command = %command, marker = ?marker, "Awaiting event");

    let event = conn.read_line().await?;
    let mut tokens = event.split_whitespace();
    if tokens.next() != Some(prefix::EVENT) {
        return Err(SonicError::malformed(command, event));
    }
    let _verb = tokens.next();
    if let (Some(expected), Some(got)) = (marker.as_deref(), tokens.next()) {
        if expected != got {
            return Err(SonicError::malformed(command, event));
        }
    }
    Ok(event)
}

/// Extracts the identifiers of a `QUERY`/`SUGGEST`/`LIST` reply.
///
/// The first three tokens are framing (`EVENT QUERY <marker>` or
/// `RESULT <n> <id>`-style); exactly three tokens means an empty result.
pub fn parse_results(command: Command, line: &str) -> SonicResult<Vec<String>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 || !matches!(tokens[0], prefix::EVENT | prefix::RESULT) {
        return Err(SonicError::malformed(command, line));
    }
    if tokens.len() == 3 {
        return Ok(Vec::new());
    }
    Ok(tokens[3..].iter().map(|t| t.to_string()).collect())
}

/// Parses a `RESULT <n>` reply.
///
/// Anything but `RESULT` followed by exactly one integer is malformed.
pub fn parse_count(command: Command, line: &str) -> SonicResult<u64> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(prefix::RESULT) {
        return Err(SonicError::malformed(command, line));
    }
    match (tokens.next().map(str::parse::<u64>), tokens.next()) {
        (Some(Ok(n)), None) => Ok(n),
        _ => Err(SonicError::malformed(command, line)),
    }
}

/// Parses an `INFO` reply: `RESULT key(value) key(value) ...`.
pub fn parse_info(line: &str) -> SonicResult<BTreeMap<String, String>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(prefix::RESULT) {
        return Err(SonicError::malformed(Command::Info, line));
    }

    let mut info = BTreeMap::new();
    for token in tokens {
        let (key, value) =
            split_meta(token).ok_or_else(|| SonicError::malformed(Command::Info, line))?;
        info.insert(key.to_string(), value.to_string());
    }
    Ok(info)
}
