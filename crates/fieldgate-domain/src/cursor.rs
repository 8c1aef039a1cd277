//! Opaque pagination cursors.
//!
//! A cursor is a kind tag followed by the sort-key fields of the last item of
//! the previous page, joined with `:` and encoded as URL-safe base64 without
//! padding. Separators and escapes inside field values are backslash-escaped,
//! so any string survives the round trip.
//!
//! Decoding never panics: undecodable text, a foreign kind tag or the wrong
//! number of fields all yield `None`, which the caller turns into a
//! client-facing validation error.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{DomainError, DomainResult};

const SEPARATOR: char = ':';
const ESCAPE: char = '\\';

/// The list type a cursor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorKind {
    /// A user's channels, keyed by channel ID.
    Channel,
    /// A user's channel memberships, keyed by `(channel_id, user_id)`.
    ChannelMember,
}

impl CursorKind {
    /// Tag embedded in the encoded cursor.
    pub fn tag(self) -> &'static str {
        match self {
            CursorKind::Channel => "channel",
            CursorKind::ChannelMember => "channelMember",
        }
    }

    /// Number of key fields a cursor of this kind carries.
    pub fn arity(self) -> usize {
        match self {
            CursorKind::Channel => 1,
            CursorKind::ChannelMember => 2,
        }
    }
}

impl fmt::Display for CursorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Encodes a cursor of `kind` carrying `fields`.
pub fn encode<S: AsRef<str>>(kind: CursorKind, fields: &[S]) -> String {
    let mut raw = String::from(kind.tag());
    for field in fields {
        raw.push(SEPARATOR);
        for c in field.as_ref().chars() {
            if c == SEPARATOR || c == ESCAPE {
                raw.push(ESCAPE);
            }
            raw.push(c);
        }
    }
    URL_SAFE_NO_PAD.encode(raw)
}

/// Decodes a cursor issued for `expected`, returning its key fields.
pub fn decode(cursor: &str, expected: CursorKind) -> Option<Vec<String>> {
    let bytes = URL_SAFE_NO_PAD.decode(cursor).ok()?;
    let raw = String::from_utf8(bytes).ok()?;
    let mut parts = split_escaped(&raw)?.into_iter();

    if parts.next()? != expected.tag() {
        return None;
    }
    let fields: Vec<String> = parts.collect();
    if fields.len() != expected.arity() {
        return None;
    }
    Some(fields)
}

fn split_escaped(raw: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(escaped @ (SEPARATOR | ESCAPE)) => current.push(escaped),
                _ => return None,
            },
            SEPARATOR => parts.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    parts.push(current);
    Some(parts)
}

/// A typed cursor bound to one list kind.
pub trait PageCursor: Sized {
    const KIND: CursorKind;

    /// Key fields in encoding order.
    fn fields(&self) -> Vec<&str>;

    /// Rebuilds the cursor from decoded fields (length already checked).
    fn from_fields(fields: Vec<String>) -> Option<Self>;

    fn encode(&self) -> String {
        encode(Self::KIND, self.fields().as_slice())
    }

    fn parse(cursor: &str) -> Option<Self> {
        decode(cursor, Self::KIND).and_then(Self::from_fields)
    }
}

/// Parses an optional `after` argument.
///
/// An absent or empty cursor means "start from the beginning"; a present but
/// invalid one is a validation error.
pub fn parse_after<C: PageCursor>(after: Option<&str>) -> DomainResult<Option<C>> {
    match after {
        None | Some("") => Ok(None),
        Some(raw) => C::parse(raw).map(Some).ok_or_else(|| {
            DomainError::validation(format!("after cursor not in the correct format: {raw}"))
        }),
    }
}

/// Position after a channel in a channel listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCursor {
    pub channel_id: String,
}

impl PageCursor for ChannelCursor {
    const KIND: CursorKind = CursorKind::Channel;

    fn fields(&self) -> Vec<&str> {
        vec![self.channel_id.as_str()]
    }

    fn from_fields(fields: Vec<String>) -> Option<Self> {
        let mut fields = fields.into_iter();
        Some(Self {
            channel_id: fields.next()?,
        })
    }
}

/// Position after a membership in a channel-member listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMemberCursor {
    pub channel_id: String,
    pub user_id: String,
}

impl PageCursor for ChannelMemberCursor {
    const KIND: CursorKind = CursorKind::ChannelMember;

    fn fields(&self) -> Vec<&str> {
        vec![self.channel_id.as_str(), self.user_id.as_str()]
    }

    fn from_fields(fields: Vec<String>) -> Option<Self> {
        let mut fields = fields.into_iter();
        Some(Self {
            channel_id: fields.next()?,
            user_id: fields.next()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_channel_member_cursor_round_trips() {
        let cursor = ChannelMemberCursor {
            channel_id: "c-1".to_string(),
            user_id: "u:2".to_string(),
        };
        let encoded = cursor.encode();

        assert!(!encoded.contains('='));
        assert_eq!(ChannelMemberCursor::parse(&encoded), Some(cursor));
    }

    #[test]
    fn test_cross_kind_cursor_is_rejected() {
        let encoded = ChannelCursor {
            channel_id: "c1".to_string(),
        }
        .encode();

        assert_eq!(ChannelMemberCursor::parse(&encoded), None);
        assert_eq!(decode(&encoded, CursorKind::ChannelMember), None);
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        let encoded = encode(CursorKind::ChannelMember, &["c1", "u1", "extra"]);
        assert_eq!(decode(&encoded, CursorKind::ChannelMember), None);

        let encoded = encode(CursorKind::ChannelMember, &["c1"]);
        assert_eq!(decode(&encoded, CursorKind::ChannelMember), None);
    }

    #[test]
    fn test_malformed_text_is_rejected() {
        for raw in ["not base64!!!", "%%%", "Y2hhbm5lbDp4XA", "/w"] {
            assert_eq!(decode(raw, CursorKind::Channel), None, "input {raw:?}");
        }
    }

    #[test]
    fn test_parse_after_distinguishes_empty_from_invalid() {
        assert_eq!(parse_after::<ChannelCursor>(None).unwrap(), None);
        assert_eq!(parse_after::<ChannelCursor>(Some("")).unwrap(), None);

        let err = parse_after::<ChannelCursor>(Some("garbage")).unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(err.to_string().contains("garbage"));
    }

    proptest! {
        #[test]
        fn prop_round_trip_preserves_fields(a in ".*", b in ".*") {
            let encoded = encode(CursorKind::ChannelMember, &[&a, &b]);
            prop_assert_eq!(decode(&encoded, CursorKind::ChannelMember), Some(vec![a, b]));
        }

        #[test]
        fn prop_other_kind_never_decodes(a in ".*") {
            let encoded = encode(CursorKind::Channel, &[&a]);
            prop_assert_eq!(decode(&encoded, CursorKind::ChannelMember), None);
        }

        #[test]
        fn prop_arbitrary_input_never_panics(raw in ".*") {
            let _ = decode(&raw, CursorKind::Channel);
            let _ = decode(&raw, CursorKind::ChannelMember);
        }
    }
}
