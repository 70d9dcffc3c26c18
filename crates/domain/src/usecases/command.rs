//! Command parser - turns a chat line into a typed command
//!
//! Grammar (whitespace-delimited tokens):
//!
//! ```text
//! post new <url>
//! post update <id> <text...>
//! post publish <id>
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Commands understood by the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `post new <url>`
    Create { url: String },
    /// `post update <id> <text...>`
    Annotate { id: u64, text: String },
    /// `post publish <id>`
    Publish { id: u64 },
    /// Anything else; ignored by the dispatcher
    Unrecognized,
}

/// Chat clients render links as `<target|label>`
static LABELED_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>|\s]+)\|[^<>]*>").expect("valid link pattern"));

/// Parse a raw chat line
pub fn parse_command(line: &str) -> Command {
    let mut tokens = line.split_whitespace();

    if tokens.next() != Some("post") {
        return Command::Unrecognized;
    }

    let parsed = match tokens.next() {
        Some("new") => tokens
            .next()
            .and_then(unwrap_url)
            .map(|url| Command::Create { url }),
        Some("update") => tokens.next().and_then(parse_id).map(|id| {
            let text = tokens.collect::<Vec<_>>().join(" ");
            Command::Annotate {
                id,
                text: replace_labeled_links(&text),
            }
        }),
        Some("publish") => tokens
            .next()
            .and_then(parse_id)
            .map(|id| Command::Publish { id }),
        _ => None,
    };

    parsed.unwrap_or(Command::Unrecognized)
}

fn parse_id(token: &str) -> Option<u64> {
    token.parse().ok()
}

/// Strip the `<...>` delimiters; a `|label` suffix is dropped
fn unwrap_url(token: &str) -> Option<String> {
    let inner = token.strip_prefix('<')?.strip_suffix('>')?;
    let url = inner.split('|').next().unwrap_or_default();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

fn replace_labeled_links(text: &str) -> String {
    LABELED_LINK.replace_all(text, "$1").into_owned()
}
