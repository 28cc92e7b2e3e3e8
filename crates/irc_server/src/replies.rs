//! Outbound line framing (§4.10), grounded on the teacher's `IrcReply`
//! enum/`format()` shape but rebuilt on [`irc_proto::codec::serialize_message`]
//! so the numerics this server actually sends (§6) can never drift from what
//! the shared codec parses back.

use irc_proto::ICaseStr;

/// The shared codec only terminates lines with `\n` (§4.1); the server
/// SHOULDs append `\r\n` on its own outbound frames (§4.1, §6), so every
/// line built here goes through this before being queued for writing.
fn crlf(line: String) -> String {
    format!("{}\r\n", line.strip_suffix('\n').unwrap_or(&line))
}

/// Builds `:<server_name> <num> <nick_or_*> <args…> :<last_arg>` with the
/// numeric rendered as three ASCII digits, per §4.10's "Numeric framing".
pub fn numeric(server_name: &str, num: u16, target: &str, args: &[&str]) -> String {
    let verb = format!("{num:03}");
    let mut all: Vec<ICaseStr> = Vec::with_capacity(args.len() + 1);
    all.push(ICaseStr::from(target));
    all.extend(args.iter().map(|a| ICaseStr::from(*a)));
    crlf(format!(
        ":{server_name} {}",
        irc_proto::codec::serialize_message(&verb, &all)
    ))
}

/// Builds `:<prefix> <verb> <args…>`, e.g. `:nick!user@host JOIN #chan` or
/// `:<server_name> NOTICE nick :text`.
pub fn from_prefix(prefix: &str, verb: &str, args: &[&str]) -> String {
    let all: Vec<ICaseStr> = args.iter().map(|a| ICaseStr::from(*a)).collect();
    crlf(format!(
        ":{prefix} {}",
        irc_proto::codec::serialize_message(verb, &all)
    ))
}
