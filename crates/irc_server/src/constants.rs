//! Numeric reply codes used by the server (§6).

pub const RPL_WELCOME: u16 = 1;
pub const RPL_YOURHOST: u16 = 2;
pub const RPL_ISUPPORT: u16 = 5;

pub const RPL_TOPIC: u16 = 332;
pub const RPL_TOPICWHOTIME: u16 = 333;
pub const RPL_NAMREPLY: u16 = 353;
pub const RPL_ENDOFNAMES: u16 = 366;

pub const RPL_MOTD: u16 = 372;
pub const RPL_MOTDSTART: u16 = 375;
pub const RPL_ENDOFMOTD: u16 = 376;

pub const ERR_ERRONEUSNICKNAME: u16 = 432;
pub const ERR_NICKNAMEINUSE: u16 = 433;
pub const ERR_NOTREGISTERED: u16 = 451;

pub const ERR_UMODEUNKNOWNFLAG: u16 = 501;
pub const ERR_USERSDONTMATCH: u16 = 502;

/// Fixed banner sent and the connection closed on the first unparseable
/// line (§4.10).
pub const BAD_LINE_BANNER: &str = "This is not a whatever you're trying to do server";

/// Sent in reply to a bare `GET` to bounce stray HTTP probes (§4.10).
pub const HTTP_PROBE_REPLY: &str = "HTTP/1.0 200 OK\r\n\r\nThis is not an HTTP server\r\n";
