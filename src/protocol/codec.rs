//! Packet and payload codec.
//!
//! Pure, stateless encode/decode functions. Decoding never fails: malformed
//! input degrades to a [`Packet::parser_error`] packet so callers can treat
//! every decode as "zero or more packets, possibly containing error entries".
//!
//! # Wire Format
//!
//! Single text packet: one ASCII digit (the type ordinal) followed by the
//! data text, e.g. `4hello`.
//!
//! Single binary packet: the ordinal as first byte followed by raw bytes.
//!
//! Payload: encoded packets joined by the record separator `0x1E`:
//!
//! ```text
//! 4hello<0x1E>2probe<0x1E>b4AQID
//! ```
//!
//! Binary packets inside a payload use `b` + ordinal digit + base64 so the
//! payload stays plain text.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::packet::{PARSER_ERROR, Packet, PacketData, PacketType};

// ============================================================================
// Constants
// ============================================================================

/// Separator between packets in a payload (ASCII record separator).
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Prefix marking a base64-encoded binary packet inside a text payload.
const BINARY_PREFIX: char = 'b';

// ============================================================================
// EncodedPacket
// ============================================================================

/// Wire form of a single packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedPacket {
    /// Text wire unit.
    Text(String),
    /// Binary wire unit.
    Binary(Vec<u8>),
}

impl EncodedPacket {
    /// Returns the text form, if any.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }
}

// ============================================================================
// Packet Encoding
// ============================================================================

/// Encodes a single packet.
///
/// Text (or absent) data produces [`EncodedPacket::Text`]; binary data
/// produces [`EncodedPacket::Binary`]. An error packet is never transmitted
/// and encodes to the bare diagnostic text, which decodes back to an error.
#[must_use]
pub fn encode_packet(packet: &Packet) -> EncodedPacket {
    let Some(ordinal) = packet.packet_type().ordinal() else {
        return EncodedPacket::Text(PARSER_ERROR.to_owned());
    };

    match packet.data() {
        Some(PacketData::Binary(bytes)) => {
            let mut out = Vec::with_capacity(bytes.len() + 1);
            out.push(ordinal);
            out.extend_from_slice(bytes);
            EncodedPacket::Binary(out)
        }
        Some(PacketData::Text(text)) => {
            let mut out = String::with_capacity(text.len() + 1);
            out.push(ordinal_digit(ordinal));
            out.push_str(text);
            EncodedPacket::Text(out)
        }
        None => EncodedPacket::Text(ordinal_digit(ordinal).to_string()),
    }
}

// ============================================================================
// Packet Decoding
// ============================================================================

/// Decodes a single packet in either wire form.
#[must_use]
pub fn decode_packet(encoded: &EncodedPacket) -> Packet {
    match encoded {
        EncodedPacket::Text(text) => decode_text_packet(Some(text)),
        EncodedPacket::Binary(bytes) => decode_binary_packet(bytes),
    }
}

/// Decodes a text packet.
///
/// Absent or empty input, a non-digit first character, or an ordinal outside
/// `0..=6` yield an error packet.
#[must_use]
pub fn decode_text_packet(data: Option<&str>) -> Packet {
    let Some(data) = data.filter(|d| !d.is_empty()) else {
        return Packet::parser_error();
    };

    let first = data.as_bytes()[0];
    if !first.is_ascii_digit() {
        return Packet::parser_error();
    }

    let Some(packet_type) = PacketType::from_ordinal(first - b'0') else {
        return Packet::parser_error();
    };

    // first byte is ASCII, so slicing at 1 stays on a char boundary
    let rest = &data[1..];
    if rest.is_empty() {
        Packet::empty(packet_type)
    } else {
        Packet::text(packet_type, rest)
    }
}

/// Decodes a binary packet.
///
/// The first byte selects the type; remaining bytes are returned unchanged.
#[must_use]
pub fn decode_binary_packet(data: &[u8]) -> Packet {
    let Some((&ordinal, rest)) = data.split_first() else {
        return Packet::parser_error();
    };

    match PacketType::from_ordinal(ordinal) {
        Some(packet_type) => Packet::binary(packet_type, rest),
        None => Packet::parser_error(),
    }
}

// ============================================================================
// Payload Encoding
// ============================================================================

/// Encodes an ordered batch of packets as one text payload.
///
/// An empty batch encodes to a bare `open` packet (`"0"`).
#[must_use]
pub fn encode_payload(packets: &[Packet]) -> String {
    if packets.is_empty() {
        return ordinal_digit(0).to_string();
    }

    let mut out = String::new();
    for (index, packet) in packets.iter().enumerate() {
        if index > 0 {
            out.push(RECORD_SEPARATOR);
        }
        encode_payload_entry(packet, &mut out);
    }
    out
}

/// Appends one packet in payload framing.
fn encode_payload_entry(packet: &Packet, out: &mut String) {
    match (packet.packet_type().ordinal(), packet.binary_data()) {
        (Some(ordinal), Some(bytes)) => {
            out.push(BINARY_PREFIX);
            out.push(ordinal_digit(ordinal));
            STANDARD.encode_string(bytes, out);
        }
        _ => {
            if let EncodedPacket::Text(text) = encode_packet(packet) {
                out.push_str(&text);
            }
        }
    }
}

// ============================================================================
// Payload Decoding
// ============================================================================

/// Decodes a text payload, visiting each packet in order.
///
/// `visit` receives `(packet, index, total)` and returns `false` to skip the
/// remaining packets. Empty input visits exactly one error packet with
/// `total == 1`.
pub fn decode_payload<F>(data: &str, mut visit: F)
where
    F: FnMut(Packet, usize, usize) -> bool,
{
    if data.is_empty() {
        visit(Packet::parser_error(), 0, 1);
        return;
    }

    let segments: Vec<&str> = data.split(RECORD_SEPARATOR).collect();
    let total = segments.len();

    for (index, segment) in segments.into_iter().enumerate() {
        if !visit(decode_payload_entry(segment), index, total) {
            break;
        }
    }
}

/// Decodes a text payload into a vector of packets.
#[must_use]
pub fn decode_payload_to_vec(data: &str) -> Vec<Packet> {
    let mut packets = Vec::new();
    decode_payload(data, |packet, _, _| {
        packets.push(packet);
        true
    });
    packets
}

/// Decodes one payload segment, handling the base64 binary form.
fn decode_payload_entry(segment: &str) -> Packet {
    let Some(encoded) = segment.strip_prefix(BINARY_PREFIX) else {
        return decode_text_packet(Some(segment));
    };

    let Some(&first) = encoded.as_bytes().first() else {
        return Packet::parser_error();
    };
    if !first.is_ascii_digit() {
        return Packet::parser_error();
    }

    match (
        PacketType::from_ordinal(first - b'0'),
        STANDARD.decode(&encoded[1..]),
    ) {
        (Some(packet_type), Ok(bytes)) => Packet::binary(packet_type, bytes),
        _ => Packet::parser_error(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Converts a wire ordinal (`0..=9`) to its ASCII digit.
#[inline]
fn ordinal_digit(ordinal: u8) -> char {
    char::from(b'0' + ordinal)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(data: &str) -> Vec<(Packet, usize, usize)> {
        let mut visits = Vec::new();
        decode_payload(data, |packet, index, total| {
            visits.push((packet, index, total));
            true
        });
        visits
    }

    fn round_trip(packet: &Packet) -> Packet {
        decode_packet(&encode_packet(packet))
    }

    #[test]
    fn test_encode_as_string() {
        let encoded = encode_packet(&Packet::text(PacketType::Message, "test"));
        assert_eq!(encoded, EncodedPacket::Text("4test".into()));
    }

    #[test]
    fn test_no_data() {
        let packet = round_trip(&Packet::empty(PacketType::Message));
        assert_eq!(packet.packet_type(), PacketType::Message);
        assert!(packet.data().is_none());
    }

    #[test]
    fn test_open_packet_with_json() {
        let packet = round_trip(&Packet::text(PacketType::Open, r#"{"some":"json"}"#));
        assert_eq!(packet.packet_type(), PacketType::Open);
        assert_eq!(packet.text_data(), Some(r#"{"some":"json"}"#));
    }

    #[test]
    fn test_control_packets() {
        for packet_type in [PacketType::Close, PacketType::Upgrade, PacketType::Noop] {
            let packet = round_trip(&Packet::empty(packet_type));
            assert_eq!(packet.packet_type(), packet_type);
        }

        let ping = round_trip(&Packet::text(PacketType::Ping, "1"));
        assert_eq!(ping.packet_type(), PacketType::Ping);
        assert_eq!(ping.text_data(), Some("1"));

        let pong = round_trip(&Packet::text(PacketType::Pong, "1"));
        assert_eq!(pong.packet_type(), PacketType::Pong);
        assert_eq!(pong.text_data(), Some("1"));
    }

    #[test]
    fn test_utf8_special_chars() {
        let packet = round_trip(&Packet::text(PacketType::Message, "utf8 — string"));
        assert_eq!(packet.text_data(), Some("utf8 — string"));
    }

    #[test]
    fn test_coercing_to_string() {
        let packet = round_trip(&Packet::text(PacketType::Message, 1));
        assert_eq!(packet.packet_type(), PacketType::Message);
        assert_eq!(packet.text_data(), Some("1"));
    }

    #[test]
    fn test_encoding_format() {
        let with_data = encode_packet(&Packet::text(PacketType::Message, "test"));
        let text = with_data.as_text().expect("text");
        assert!(text.as_bytes()[0].is_ascii_digit());

        let without_data = encode_packet(&Packet::empty(PacketType::Message));
        assert_eq!(without_data.as_text(), Some("4"));
    }

    #[test]
    fn test_decode_malformed_packets() {
        for input in [None, Some(""), Some(":::"), Some("94103")] {
            let packet = decode_text_packet(input);
            assert_eq!(packet.packet_type(), PacketType::Error);
            assert_eq!(packet.text_data(), Some(PARSER_ERROR));
        }
    }

    #[test]
    fn test_binary_message() {
        let data = vec![0u8, 1, 2, 3, 4];
        let encoded = encode_packet(&Packet::binary(PacketType::Message, data.clone()));
        assert_eq!(encoded, EncodedPacket::Binary(vec![4, 0, 1, 2, 3, 4]));

        let packet = decode_packet(&encoded);
        assert_eq!(packet.packet_type(), PacketType::Message);
        assert_eq!(packet.binary_data(), Some(&data[..]));
    }

    #[test]
    fn test_decode_malformed_binary() {
        assert!(decode_binary_packet(&[]).is_error());
        assert!(decode_binary_packet(&[42, 1]).is_error());
    }

    #[test]
    fn test_encode_error_packet() {
        let encoded = encode_packet(&Packet::parser_error());
        assert!(decode_packet(&encoded).is_error());
    }

    #[test]
    fn test_encode_and_decode_payload() {
        let single = encode_payload(&[Packet::text(PacketType::Message, "a")]);
        let visits = decoded(&single);
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].1 + 1, visits[0].2);

        let pair = encode_payload(&[
            Packet::text(PacketType::Message, "a"),
            Packet::empty(PacketType::Ping),
        ]);
        let visits = decoded(&pair);
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].0.packet_type(), PacketType::Message);
        assert_eq!(visits[1].0.packet_type(), PacketType::Ping);
        assert!(visits.iter().all(|(_, _, total)| *total == 2));
    }

    #[test]
    fn test_empty_payload() {
        let encoded = encode_payload(&[]);
        assert_eq!(encoded, "0");

        let visits = decoded(&encoded);
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].0.packet_type(), PacketType::Open);
        assert_eq!(visits[0].2, 1);
    }

    #[test]
    fn test_non_ascii_payload_is_not_transcoded() {
        let encoded = encode_payload(&[
            Packet::text(PacketType::Message, "€€€"),
            Packet::text(PacketType::Message, "α"),
        ]);
        assert_eq!(encoded, "4€€€\u{1e}4α");
    }

    #[test]
    fn test_decode_payload_bad_format() {
        for input in ["", "))", "99:", "aa"] {
            let visits = decoded(input);
            assert_eq!(visits.len(), 1, "input {input:?}");
            let (packet, index, total) = &visits[0];
            assert_eq!(packet.packet_type(), PacketType::Error);
            assert_eq!(packet.text_data(), Some(PARSER_ERROR));
            assert_eq!(index + 1, *total);
        }
    }

    #[test]
    fn test_binary_contents() {
        let first = vec![0u8, 1, 2, 3, 4];
        let second = vec![5u8, 6, 7, 8];
        let encoded = encode_payload(&[
            Packet::binary(PacketType::Message, first.clone()),
            Packet::binary(PacketType::Message, second.clone()),
        ]);

        let packets = decode_payload_to_vec(&encoded);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].binary_data(), Some(&first[..]));
        assert_eq!(packets[1].binary_data(), Some(&second[..]));
    }

    #[test]
    fn test_mixed_binary_and_string_contents() {
        let buffer: Vec<u8> = (0..123).collect();
        let encoded = encode_payload(&[
            Packet::binary(PacketType::Message, buffer.clone()),
            Packet::text(PacketType::Message, "hello"),
            Packet::empty(PacketType::Close),
        ]);

        let visits = decoded(&encoded);
        assert_eq!(visits.len(), 3);
        assert_eq!(visits[0].0, Packet::binary(PacketType::Message, buffer));
        assert_eq!(visits[1].0, Packet::text(PacketType::Message, "hello"));
        assert_eq!(visits[2].0.packet_type(), PacketType::Close);
        assert!(visits.iter().all(|(_, _, total)| *total == 3));
    }

    #[test]
    fn test_binary_keeps_packet_type() {
        let encoded = encode_payload(&[Packet::binary(PacketType::Ping, vec![9u8])]);
        assert!(encoded.starts_with("b2"));

        let packets = decode_payload_to_vec(&encoded);
        assert_eq!(packets, vec![Packet::binary(PacketType::Ping, vec![9u8])]);
    }

    #[test]
    fn test_malformed_entry_does_not_abort_batch() {
        let packets = decode_payload_to_vec("4a\u{1e}zz\u{1e}b4!!!\u{1e}2");
        let types: Vec<_> = packets.iter().map(Packet::packet_type).collect();
        assert_eq!(
            types,
            vec![
                PacketType::Message,
                PacketType::Error,
                PacketType::Error,
                PacketType::Ping
            ]
        );
    }

    #[test]
    fn test_visit_stop_skips_remaining() {
        let mut seen = Vec::new();
        decode_payload("4a\u{1e}1\u{1e}4b", |packet, _, _| {
            let keep_going = packet.packet_type() != PacketType::Close;
            seen.push(packet);
            keep_going
        });
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].packet_type(), PacketType::Close);
    }
}
