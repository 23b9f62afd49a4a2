//! Shell escaping for arguments crossing the transport boundary
//!
//! The transport runs remote commands through a single command-line string,
//! so every token is escaped individually before joining. Escaping a
//! pre-joined string would re-introduce word splitting on the remote side.

use std::borrow::Cow;

/// Escape a single argument for a POSIX shell.
///
/// Arguments consisting only of characters that no shell interprets are
/// passed through unchanged; everything else is wrapped in single quotes,
/// with embedded single quotes rendered as `'\''`.
pub fn shell_escape(arg: &str) -> Cow<'_, str> {
    fn is_safe(b: u8) -> bool {
        b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/' | b':' | b',' | b'@' | b'%' | b'+' | b'=')
    }
    if !arg.is_empty() && arg.bytes().all(is_safe) {
        return Cow::Borrowed(arg);
    }
    let mut escaped = String::with_capacity(arg.len() + 2);
    escaped.push('\'');
    for ch in arg.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    Cow::Owned(escaped)
}

/// Escape each token and join with single spaces into one command line.
pub fn join_escaped<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|arg| shell_escape(arg.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
