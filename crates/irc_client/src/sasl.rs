//! SASL PLAIN authentication (§4.7).
//!
//! Grounded on the reference client's `IRCSasl` sequence; the
//! base64-over-`AUTHENTICATE` framing matches the IRCv3 `sasl` spec this
//! codebase's ecosystem (e.g. `jwodder-ircbits`'s `sasl::plain` module)
//! also implements.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use irc_proto::Message;

use crate::client::Client;
use crate::errors::ClientError;

/// Runs the full `AUTHENTICATE PLAIN` exchange. Precondition: the caller
/// already ran `req("sasl")` to completion via [`crate::cap::CapNegotiator`]
/// and it returned `true`.
pub async fn authenticate_plain(
    client: &mut Client,
    user: &str,
    password: &str,
) -> Result<(), ClientError> {
    client
        .conn
        .send(vec!["AUTHENTICATE".into(), "PLAIN".into()])
        .await?;

    let mut plus_pattern = Message::for_verb("AUTHENTICATE");
    plus_pattern.args = vec!["+".into()];
    client.match_patterns(&[plus_pattern]).await?;

    let payload = format!("{user}\0{user}\0{password}");
    let encoded = STANDARD.encode(payload.as_bytes());
    client
        .conn
        .send(vec!["AUTHENTICATE".into(), encoded.into()])
        .await?;

    let outcome = client
        .match_patterns(&[
            Message::for_verb("902"),
            Message::for_verb("903"),
            Message::for_verb("904"),
        ])
        .await?;

    match outcome.verb_str() {
        Some("903") => Ok(()),
        Some(other) => Err(ClientError::AuthFailed(format!(
            "server replied {other} instead of 903"
        ))),
        None => Err(ClientError::AuthFailed("no numeric reply".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_matches_the_documented_scenario() {
        let payload = format!("{0}\0{0}\0{1}", "u", "p");
        assert_eq!(STANDARD.encode(payload.as_bytes()), "dQB1AHA=");
    }
}
