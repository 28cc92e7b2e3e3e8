//! Parsing and serialization of one IRC line.
//!
//! Grammar (applied left to right):
//!
//! 1. `@tags ` — optional, semicolon-separated `k[=v]` pairs.
//! 2. `:prefix ` — optional.
//! 3. `VERB` — one whitespace-delimited token.
//! 4. args — space-separated tokens; a token starting with `:` (after a
//!    leading space, or at the very start of the remainder) consumes the
//!    rest of the line unsplit as the final argument.

use nom::{
    IResult, Parser,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::opt,
    multi::separated_list1,
    sequence::preceded,
};

use crate::icase::ICaseStr;
use crate::message::{Message, Prefix, Tag};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty line")]
    Empty,
    #[error("malformed line: {0}")]
    Malformed(String),
}

/// Required by `tokio_util::codec::Decoder`/`Encoder`, which bound their
/// associated `Error` on `From<io::Error>` so a read/write failure can be
/// reported through the same channel as a parse failure.
impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::Malformed(format!("io error: {e}"))
    }
}

fn not_space(c: char) -> bool {
    c != ' '
}

fn tag_pair(input: &str) -> IResult<&str, (ICaseStr, Tag)> {
    let (input, key) = take_while1(|c: char| c != '=' && c != ';')(input)?;
    let (input, value) = opt(preceded(char('='), take_while1(|c: char| c != ';'))).parse(input)?;
    let tag_value = match value {
        Some(v) => Tag::Value(v.to_string()),
        None => Tag::Flag,
    };
    Ok((input, (ICaseStr::from(key), tag_value)))
}

fn tags_block(input: &str) -> IResult<&str, Vec<(ICaseStr, Tag)>> {
    preceded(char('@'), separated_list1(char(';'), tag_pair)).parse(input)
}

fn prefix_block(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(not_space)).parse(input)
}

fn verb_token(input: &str) -> IResult<&str, &str> {
    take_while1(not_space)(input)
}

/// Parses one already-trimmed line (no trailing `\r\n`/`\n`) into a
/// `Message`. Input is expected to already be valid UTF-8; callers reading
/// from a byte stream should reject non-UTF-8 lines before calling this.
pub fn parse(line: &str) -> Result<Message, CodecError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Err(CodecError::Empty);
    }

    let mut rest = line;

    let mut tags = std::collections::HashMap::new();
    if rest.starts_with('@') {
        let (before_space, after_tags) = split_on_space(rest)
            .ok_or_else(|| CodecError::Malformed("tags not followed by a space".into()))?;
        let (_, pairs) = tags_block(before_space)
            .map_err(|e| CodecError::Malformed(format!("bad tags: {e}")))?;
        tags.extend(pairs);
        rest = after_tags;
    }

    let mut prefix = None;
    if rest.starts_with(':') {
        let (before_space, after_prefix) = split_on_space(rest)
            .ok_or_else(|| CodecError::Malformed("prefix not followed by a space".into()))?;
        let (_, raw_prefix) = prefix_block(before_space)
            .map_err(|e| CodecError::Malformed(format!("bad prefix: {e}")))?;
        prefix = Some(Prefix::parse(raw_prefix));
        rest = after_prefix;
    }

    rest = rest.trim_start_matches(' ');
    if rest.is_empty() {
        return Err(CodecError::Malformed("missing verb".into()));
    }

    let (after_verb, verb) =
        verb_token(rest).map_err(|e| CodecError::Malformed(format!("bad verb: {e}")))?;
    let verb = ICaseStr::from(verb);
    rest = after_verb.trim_start_matches(' ');

    let args = parse_args(rest);

    Ok(Message {
        tags,
        prefix,
        verb: Some(verb),
        args,
    })
}

/// Splits `input` at the first space into `(part_before_space,
/// remainder_after_space)`, skipping any further leading spaces in the
/// remainder. Returns `None` if there is no space at all.
fn split_on_space(input: &str) -> Option<(&str, &str)> {
    let idx = input.find(' ')?;
    let before = &input[..idx];
    let after = input[idx..].trim_start_matches(' ');
    Some((before, after))
}

fn parse_args(rest: &str) -> Vec<ICaseStr> {
    if rest.is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut remaining = rest;
    loop {
        if let Some(trailing) = remaining.strip_prefix(':') {
            args.push(ICaseStr::from(trailing));
            break;
        }
        match remaining.find(' ') {
            Some(idx) => {
                let (token, after) = remaining.split_at(idx);
                args.push(ICaseStr::from(token));
                remaining = after.trim_start_matches(' ');
                if remaining.is_empty() {
                    break;
                }
            }
            None => {
                args.push(ICaseStr::from(remaining));
                break;
            }
        }
    }
    args
}

/// Serializes a message's args per §4.1: `a1 a2 ... an-1 :an\n` when there
/// are at least two args, else `a1\n`. Tags/prefix are not emitted; the
/// server assigns its own prefix on outbound frames.
pub fn serialize(args: &[ICaseStr]) -> String {
    match args.len() {
        0 => "\n".to_string(),
        1 => format!("{}\n", args[0]),
        n => {
            let head = args[..n - 1]
                .iter()
                .map(ICaseStr::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            format!("{head} :{}\n", args[n - 1])
        }
    }
}

/// Serializes a full message including verb; callers that also need a
/// prefix (e.g. the server's numeric replies) prepend it themselves before
/// writing the line.
pub fn serialize_message(verb: &str, args: &[ICaseStr]) -> String {
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push(ICaseStr::from(verb));
    all.extend_from_slice(args);
    serialize(&all)
}
