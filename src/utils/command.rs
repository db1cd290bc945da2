//! Rendering of external command lines for dry runs and debug logs

use std::ffi::OsStr;
use std::path::Path;

/// Quote a single argument so the rendered line can be pasted into a shell
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    let needs_quotes = arg.chars().any(|c| {
        c.is_whitespace()
            || matches!(
                c,
                '\'' | '"' | '\\' | '$' | '`' | '&' | '|' | ';' | '<' | '>' | '(' | ')' | '*' | '?'
                    | '!' | '#' | '~' | '[' | ']' | '{' | '}'
            )
    });

    if needs_quotes {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// Render `program args...` as a single shell-style line
pub fn render_command<I, S>(program: &Path, args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut parts = vec![quote_arg(&program.to_string_lossy())];
    parts.extend(
        args.into_iter()
            .map(|arg| quote_arg(&arg.as_ref().to_string_lossy())),
    );
    parts.join(" ")
}
