//! Trace line grammar.
//!
//! ```text
//! <timestamp> : T <type> 0x<src-hex>(<src-kind>) -> 0x<dest-hex>(<dest-kind>) [<subtype>] [<data>...]
//! ```
//!
//! The first whitespace-delimited token after the destination is always the
//! subtype; everything after it is opaque data. Spaces and tabs both
//! separate fields, and the subtype may follow the destination directly.

use crate::message::EntityRef;
use once_cell::sync::Lazy;
use regex::Regex;
use rewind_core::{Guid, KindCode, Timestamp};

static LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<ts>[0-9]+) : T (?P<type>[0-9]+) 0x(?P<src>[0-9a-fA-F]+)\((?P<src_kind>[0-9]+)\) -> 0x(?P<dest>[0-9a-fA-F]+)\((?P<dest_kind>[0-9]+)\)(?:[ \t]*(?P<subtype>\S+))?(?:[ \t]+(?P<data>.*))?[ \t]*$",
    )
    .expect("trace grammar must compile")
});

/// A trace line split into its grammar fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLine<'a> {
    /// Message timestamp
    pub timestamp: Timestamp,
    /// Numeric message type, kept as text for kind lookup
    pub type_code: &'a str,
    /// Sender
    pub source: EntityRef,
    /// Receiver
    pub destination: EntityRef,
    /// Optional subtype token
    pub subtype: Option<&'a str>,
    /// Remainder of the line, possibly empty
    pub data: &'a str,
}

impl<'a> TraceLine<'a> {
    /// Match a line against the grammar
    ///
    /// Trailing `\r`/`\n` are ignored. Returns `None` when the line does not
    /// match or a numeric field does not fit its type.
    #[must_use]
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let caps = LINE.captures(line)?;

        let timestamp = caps["ts"].parse::<u64>().ok()?;
        let source = EntityRef::new(
            Guid::from_hex(&caps["src"])?,
            KindCode::new(caps["src_kind"].parse().ok()?),
        );
        let destination = EntityRef::new(
            Guid::from_hex(&caps["dest"])?,
            KindCode::new(caps["dest_kind"].parse().ok()?),
        );

        Some(Self {
            timestamp: Timestamp::from_raw(timestamp),
            type_code: caps.name("type")?.as_str(),
            source,
            destination,
            subtype: caps.name("subtype").map(|m| m.as_str()),
            data: caps.name("data").map_or("", |m| m.as_str()),
        })
    }
}
