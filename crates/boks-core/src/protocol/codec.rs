//! Binary codec for building and validating Boks protocol frames.
//!
//! Wire format:
//! ```text
//! [opcode:1][length:1][payload:N][checksum:1]
//! ```
//! The checksum is the sum of every preceding byte (opcode, length, and
//! payload) modulo 256.
//!
//! # The `length` byte is advisory
//!
//! For almost every opcode `length` equals the payload byte count, but the
//! firmware does not always honour that.  `NOTIFY_CODES_COUNT` (0xC3) reports
//! `0x07` for a four-byte payload, and history entries sometimes announce more
//! bytes than they carry.  The decoder therefore treats the payload as
//! *everything between the length byte and the trailing checksum* and keeps
//! the declared value on the [`Frame`] for diagnostics.  The checksum does
//! not depend on `length`, so validation is unaffected by the quirk.
//!
//! # Unchecked frames
//!
//! `OPEN_DOOR` is written as `[opcode][length][code:6]` with no trailing
//! checksum; the firmware accepts exactly eight bytes for it.  Such frames are
//! built with [`Frame::unchecked`].

use serde::Serialize;
use thiserror::Error;

/// Number of bytes before the payload (opcode + length).
pub const HEADER_SIZE: usize = 2;

/// Smallest possible frame: opcode, length, checksum, empty payload.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + 1;

/// Largest payload a single length byte can describe.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// Errors raised while building an outbound frame.
///
/// These are caller-visible failures returned before anything is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The payload does not fit in a single-byte length field.
    #[error("payload too large: {len} bytes exceeds the {MAX_PAYLOAD_LEN}-byte limit")]
    PayloadTooLarge { len: usize },

    /// A command argument cannot be laid out in its fixed-width wire field.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Errors raised while validating an inbound frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than [`MIN_FRAME_SIZE`] bytes were received.
    #[error("truncated frame: need at least {MIN_FRAME_SIZE} bytes, got {available}")]
    Truncated { available: usize },

    /// The trailing checksum disagrees with the recomputed sum.
    ///
    /// The opcode is kept so the caller can still name the frame in logs.
    #[error("checksum mismatch on opcode 0x{opcode:02X}: computed 0x{computed:02X}, received 0x{received:02X}")]
    ChecksumMismatch { opcode: u8, computed: u8, received: u8 },
}

impl DecodeError {
    /// Best-effort opcode of the offending frame, when at least one byte arrived.
    pub fn opcode(&self) -> Option<u8> {
        match self {
            DecodeError::Truncated { .. } => None,
            DecodeError::ChecksumMismatch { opcode, .. } => Some(*opcode),
        }
    }
}

/// One complete frame exchanged over the write/notify characteristic pair.
///
/// Frames are immutable once built: construct them with [`Frame::new`] (or
/// [`Frame::with_declared_len`] to reproduce a firmware quirk, or
/// [`Frame::unchecked`] for the checksum-less door frame) and serialise them
/// with [`Frame::to_bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    opcode: u8,
    declared_len: u8,
    payload: Vec<u8>,
    checksummed: bool,
}

impl Frame {
    /// Builds a frame whose length byte equals the payload size.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::PayloadTooLarge`] above 255 payload bytes.
    pub fn new(opcode: u8, payload: impl Into<Vec<u8>>) -> Result<Self, EncodeError> {
        let payload = payload.into();
        let declared_len = u8::try_from(payload.len())
            .map_err(|_| EncodeError::PayloadTooLarge { len: payload.len() })?;
        Ok(Self {
            opcode,
            declared_len,
            payload,
            checksummed: true,
        })
    }

    /// Builds a frame that is written without a trailing checksum byte.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::PayloadTooLarge`] above 255 payload bytes.
    pub fn unchecked(opcode: u8, payload: impl Into<Vec<u8>>) -> Result<Self, EncodeError> {
        let mut frame = Self::new(opcode, payload)?;
        frame.checksummed = false;
        Ok(frame)
    }

    /// Builds a frame with an explicit length byte that may differ from the payload size.
    ///
    /// Used to reproduce notifications such as `0xC3` whose declared length
    /// is not the payload length.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::PayloadTooLarge`] above 255 payload bytes.
    pub fn with_declared_len(
        opcode: u8,
        declared_len: u8,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Self, EncodeError> {
        let mut frame = Self::new(opcode, payload)?;
        frame.declared_len = declared_len;
        Ok(frame)
    }

    /// The opcode byte.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// The length byte as written on the wire.
    pub fn declared_len(&self) -> u8 {
        self.declared_len
    }

    /// The bytes between the length byte and the checksum.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Whether the length byte matches the payload actually carried.
    pub fn length_conforms(&self) -> bool {
        usize::from(self.declared_len) == self.payload.len()
    }

    /// Whether [`Frame::to_bytes`] appends a checksum byte.
    pub fn is_checksummed(&self) -> bool {
        self.checksummed
    }

    /// The mod-256 sum of the header and payload.
    ///
    /// This is the trailing byte on the wire for checksummed frames.
    pub fn checksum(&self) -> u8 {
        checksum(&[self.opcode, self.declared_len]).wrapping_add(checksum(&self.payload))
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + usize::from(self.checksummed)
    }

    /// Serialises the frame to `[opcode, length, payload.., checksum]`.
    ///
    /// The checksum byte is omitted for frames built with [`Frame::unchecked`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.push(self.opcode);
        buf.push(self.declared_len);
        buf.extend_from_slice(&self.payload);
        if self.checksummed {
            buf.push(self.checksum());
        }
        buf
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Computes the mod-256 sum of `bytes`.
///
/// # Examples
///
/// ```rust
/// use boks_core::protocol::checksum;
///
/// assert_eq!(checksum(&[0x07, 0x00]), 0x07);
/// assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
/// ```
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Encodes `opcode` and `payload` into a ready-to-write frame.
///
/// # Errors
///
/// Returns [`EncodeError::PayloadTooLarge`] if the payload exceeds 255 bytes.
///
/// # Examples
///
/// ```rust
/// use boks_core::protocol::{decode_frame, encode_command};
///
/// let bytes = encode_command(0x07, &[]).unwrap();
/// assert_eq!(bytes, vec![0x07, 0x00, 0x07]);
///
/// let frame = decode_frame(&bytes).unwrap();
/// assert_eq!(frame.opcode(), 0x07);
/// assert!(frame.payload().is_empty());
/// ```
pub fn encode_command(opcode: u8, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    Ok(Frame::new(opcode, payload)?.to_bytes())
}

/// Validates one inbound frame and splits it into its fields.
///
/// Requires at least three bytes and a correct trailing checksum.  The
/// payload is every byte between the length byte and the checksum, whatever
/// the length byte claims; see the module docs for why.
///
/// # Errors
///
/// - [`DecodeError::Truncated`] for fewer than three bytes.
/// - [`DecodeError::ChecksumMismatch`] when the sum disagrees; the error
///   still carries the opcode.
pub fn decode_frame(raw: &[u8]) -> Result<Frame, DecodeError> {
    if raw.len() < MIN_FRAME_SIZE {
        return Err(DecodeError::Truncated {
            available: raw.len(),
        });
    }

    let (body, trailer) = raw.split_at(raw.len() - 1);
    let computed = checksum(body);
    let received = trailer[0];
    if computed != received {
        return Err(DecodeError::ChecksumMismatch {
            opcode: raw[0],
            computed,
            received,
        });
    }

    Ok(Frame {
        opcode: raw[0],
        declared_len: raw[1],
        payload: body[HEADER_SIZE..].to_vec(),
        checksummed: true,
    })
}

/// Formats bytes as upper-case, space-separated hex (`"07 00 07"`) for log lines.
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Checksum ──────────────────────────────────────────────────────────────

    #[test]
    fn test_checksum_of_empty_slice_is_zero() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_checksum_wraps_modulo_256() {
        // 0xFF + 0xFF + 0x03 = 0x201 → 0x01
        assert_eq!(checksum(&[0xFF, 0xFF, 0x03]), 0x01);
    }

    // ── Encoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_encode_get_logs_count_matches_wire_bytes() {
        let bytes = encode_command(0x07, &[]).unwrap();
        assert_eq!(bytes, vec![0x07, 0x00, 0x07]);
    }

    #[test]
    fn test_encode_request_logs_matches_wire_bytes() {
        let bytes = encode_command(0x03, &[]).unwrap();
        assert_eq!(bytes, vec![0x03, 0x00, 0x03]);
    }

    #[test]
    fn test_encode_writes_payload_length_and_trailing_checksum() {
        // Arrange
        let payload = b"123456";

        // Act
        let bytes = encode_command(0x01, payload).unwrap();

        // Assert
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1], 0x06);
        assert_eq!(&bytes[2..8], payload);
        assert_eq!(bytes[8], checksum(&bytes[..8]));
    }

    #[test]
    fn test_encode_accepts_max_payload() {
        let payload = vec![0xAA; MAX_PAYLOAD_LEN];
        let bytes = encode_command(0x10, &payload).unwrap();
        assert_eq!(bytes[1], 0xFF);
        assert_eq!(bytes.len(), MAX_PAYLOAD_LEN + 3);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        let result = encode_command(0x10, &payload);
        assert_eq!(result, Err(EncodeError::PayloadTooLarge { len: 256 }));
    }

    #[test]
    fn test_frame_with_declared_len_keeps_quirky_length() {
        // Arrange – NOTIFY_CODES_COUNT announces 7 for a 4-byte payload
        let frame = Frame::with_declared_len(0xC3, 0x07, vec![0x00, 0x05, 0x00, 0x02]).unwrap();

        // Act
        let bytes = frame.to_bytes();

        // Assert
        assert_eq!(bytes[1], 0x07);
        assert!(!frame.length_conforms());
        assert_eq!(*bytes.last().unwrap(), checksum(&bytes[..bytes.len() - 1]));
    }

    #[test]
    fn test_unchecked_frame_has_no_trailing_checksum() {
        // Arrange
        let frame = Frame::unchecked(0x01, b"123456".to_vec()).unwrap();

        // Act
        let bytes = frame.to_bytes();

        // Assert
        assert!(!frame.is_checksummed());
        assert_eq!(frame.encoded_len(), 8);
        assert_eq!(bytes, vec![0x01, 0x06, b'1', b'2', b'3', b'4', b'5', b'6']);
    }

    // ── Decoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_rejects_frames_shorter_than_three_bytes() {
        assert_eq!(decode_frame(&[]), Err(DecodeError::Truncated { available: 0 }));
        assert_eq!(
            decode_frame(&[0x79, 0x02]),
            Err(DecodeError::Truncated { available: 2 })
        );
    }

    #[test]
    fn test_decode_reports_checksum_mismatch_with_opcode() {
        // Arrange – correct checksum would be 0x79 + 0x02 + 0x00 + 0x05 = 0x80
        let raw = [0x79, 0x02, 0x00, 0x05, 0x81];

        // Act
        let err = decode_frame(&raw).unwrap_err();

        // Assert
        assert_eq!(
            err,
            DecodeError::ChecksumMismatch {
                opcode: 0x79,
                computed: 0x80,
                received: 0x81
            }
        );
        assert_eq!(err.opcode(), Some(0x79));
    }

    #[test]
    fn test_decode_logs_count_frame() {
        let frame = decode_frame(&[0x79, 0x02, 0x00, 0x05, 0x80]).unwrap();
        assert_eq!(frame.opcode(), 0x79);
        assert_eq!(frame.declared_len(), 2);
        assert_eq!(frame.payload(), &[0x00, 0x05]);
        assert!(frame.length_conforms());
    }

    #[test]
    fn test_decode_tolerates_overstated_length() {
        // Arrange – length byte says 7 but only 4 payload bytes are present
        let mut raw = vec![0xC3, 0x07, 0x00, 0x05, 0x00, 0x02];
        raw.push(checksum(&raw));

        // Act
        let frame = decode_frame(&raw).unwrap();

        // Assert
        assert_eq!(frame.payload(), &[0x00, 0x05, 0x00, 0x02]);
        assert!(!frame.length_conforms());
    }

    #[test]
    fn test_decode_tolerates_understated_length() {
        let mut raw = vec![0x84, 0x01, 0x00, 0x01];
        raw.push(checksum(&raw));

        let frame = decode_frame(&raw).unwrap();

        assert_eq!(frame.payload(), &[0x00, 0x01]);
        assert_eq!(frame.declared_len(), 1);
    }

    #[test]
    fn test_decode_minimum_frame_has_empty_payload() {
        let frame = decode_frame(&[0x92, 0x00, 0x92]).unwrap();
        assert_eq!(frame.opcode(), 0x92);
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn test_decoded_frame_reserialises_to_identical_bytes() {
        let mut raw = vec![0x86, 0x11, 0x00, 0x00, 0x3C];
        raw.extend_from_slice(b"123456");
        raw.extend_from_slice(&[0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD]);
        raw.push(checksum(&raw));

        let frame = decode_frame(&raw).unwrap();

        assert_eq!(frame.to_bytes(), raw);
    }

    #[test]
    fn test_decode_never_panics_on_arbitrary_short_inputs() {
        for len in 0..8usize {
            for fill in [0x00u8, 0x7F, 0xFF] {
                let raw = vec![fill; len];
                let _ = decode_frame(&raw);
            }
        }
    }

    // ── Round trip ────────────────────────────────────────────────────────────

    #[test]
    fn test_round_trip_preserves_opcode_and_payload() {
        for (opcode, payload) in [
            (0x01u8, b"123456".to_vec()),
            (0x07, Vec::new()),
            (0x16, vec![0x41; 10]),
        ] {
            let bytes = encode_command(opcode, &payload).unwrap();
            let frame = decode_frame(&bytes).unwrap();
            assert_eq!(frame.opcode(), opcode);
            assert_eq!(frame.payload(), payload.as_slice());
        }
    }

    // ── Hex formatting ────────────────────────────────────────────────────────

    #[test]
    fn test_format_hex_is_uppercase_and_space_separated() {
        assert_eq!(format_hex(&[0x07, 0x00, 0xab]), "07 00 AB");
        assert_eq!(format_hex(&[]), "");
    }
}
