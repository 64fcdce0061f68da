//! Multi-encoding Unicode decoder (`spec.md` §4.2) and encoding detection.
//!
//! Each `decode_*` function mirrors `yip_decode_*` in `yip.c` bit-for-bit,
//! including the permissive choices documented as Open Questions in
//! `spec.md` §9: over-long UTF-8 sequences are accepted rather than
//! rejected, and the zero-byte tie-break for detection favors UTF-32BE.

/// Sentinel returned by `decode_*` on a malformed byte sequence.
///
/// `begin` is still advanced past the offending byte(s) so the caller can
/// resynchronize on the next call, matching `yip_decode`'s "does NOT set
/// errno, cursor still advances" contract.
pub const INVALID_CODE: i64 = -3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl Encoding {
    /// Canonical name used as the payload of a `Bom` token (`spec.md` §4.6).
    pub fn canonical_name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Utf32Be => "UTF-32BE",
        }
    }

    /// Maximum bytes a single character can consume in this encoding.
    /// Used to size the source's required lookahead (`spec.md` §4.2).
    pub fn max_char_len(self) -> usize {
        match self {
            Encoding::Utf8 => 6,
            Encoding::Utf16Le | Encoding::Utf16Be => 4,
            Encoding::Utf32Le | Encoding::Utf32Be => 4,
        }
    }

    /// Nearest `encoding_rs` encoding, for callers that want to decode a
    /// whole `Unparsed`/`Match` token payload into a `String` rather than
    /// walking it character by character.
    pub fn as_encoding_rs(self) -> &'static encoding_rs::Encoding {
        match self {
            Encoding::Utf8 => encoding_rs::UTF_8,
            Encoding::Utf16Le => encoding_rs::UTF_16LE,
            Encoding::Utf16Be => encoding_rs::UTF_16BE,
            // encoding_rs has no UTF-32 support; callers needing this are
            // expected to use `decode_one` directly for those two encodings.
            Encoding::Utf32Le | Encoding::Utf32Be => encoding_rs::UTF_8,
        }
    }
}

/// Decode one character, advancing `*pos` past whatever was consumed (even
/// on failure). Returns the Unicode scalar value, or [`INVALID_CODE`].
pub fn decode_one(encoding: Encoding, bytes: &[u8], pos: &mut usize) -> i64 {
    match encoding {
        Encoding::Utf8 => decode_utf8(bytes, pos),
        Encoding::Utf16Le => decode_utf16le(bytes, pos),
        Encoding::Utf16Be => decode_utf16be(bytes, pos),
        Encoding::Utf32Le => decode_utf32le(bytes, pos),
        Encoding::Utf32Be => decode_utf32be(bytes, pos),
    }
}

fn next_byte(bytes: &[u8], pos: &mut usize) -> i32 {
    if *pos >= bytes.len() {
        -1
    } else {
        let b = bytes[*pos] as i32;
        *pos += 1;
        b
    }
}

pub fn decode_utf8(bytes: &[u8], pos: &mut usize) -> i64 {
    let first = next_byte(bytes, pos);
    if first < 0 {
        return INVALID_CODE;
    }
    if first & 0x80 == 0 {
        return first as i64;
    }
    let (mut code, continuations) = if first & 0xE0 == 0xC0 {
        (first & 0x1F, 1)
    } else if first & 0xF0 == 0xE0 {
        (first & 0x0F, 2)
    } else if first & 0xF8 == 0xF0 {
        (first & 0x07, 3)
    } else if first & 0xFC == 0xF8 {
        (first & 0x03, 4)
    } else if first & 0xFE == 0xFC {
        (first & 0x01, 5)
    } else {
        return INVALID_CODE;
    };
    for _ in 0..continuations {
        let next = next_byte(bytes, pos);
        if next < 0 || next & 0xC0 != 0x80 {
            return INVALID_CODE;
        }
        code = (code << 6) | (next & 0x3F);
    }
    code as i64
}

pub fn decode_utf16le(bytes: &[u8], pos: &mut usize) -> i64 {
    decode_utf16(bytes, pos, |hi, lo| (hi as u32) | (lo as u32) << 8)
}

pub fn decode_utf16be(bytes: &[u8], pos: &mut usize) -> i64 {
    decode_utf16(bytes, pos, |hi, lo| (hi as u32) << 8 | (lo as u32))
}

fn decode_utf16(bytes: &[u8], pos: &mut usize, combine: fn(i32, i32) -> u32) -> i64 {
    let b0 = next_byte(bytes, pos);
    if b0 < 0 {
        return INVALID_CODE;
    }
    let b1 = next_byte(bytes, pos);
    if b1 < 0 {
        return INVALID_CODE;
    }
    let unit0 = combine(b0, b1);
    if (0xDC00..0xE000).contains(&unit0) {
        return INVALID_CODE;
    }
    if !(0xD800..0xDC00).contains(&unit0) {
        return unit0 as i64;
    }
    let b2 = next_byte(bytes, pos);
    if b2 < 0 {
        return INVALID_CODE;
    }
    let b3 = next_byte(bytes, pos);
    if b3 < 0 {
        return INVALID_CODE;
    }
    let unit1 = combine(b2, b3);
    if !(0xDC00..0xE000).contains(&unit1) {
        return INVALID_CODE;
    }
    (((unit0 << 10) + unit1) as i64) + 0x10000 - ((0xD800i64 << 10) as i64) - 0xDC00
}

pub fn decode_utf32le(bytes: &[u8], pos: &mut usize) -> i64 {
    decode_utf32(bytes, pos, true)
}

pub fn decode_utf32be(bytes: &[u8], pos: &mut usize) -> i64 {
    decode_utf32(bytes, pos, false)
}

fn decode_utf32(bytes: &[u8], pos: &mut usize, little_endian: bool) -> i64 {
    let mut units = [0i32; 4];
    for unit in &mut units {
        let b = next_byte(bytes, pos);
        if b < 0 {
            return INVALID_CODE;
        }
        *unit = b;
    }
    let [b0, b1, b2, b3] = units;
    (if little_endian {
        b0 | b1 << 8 | b2 << 16 | b3 << 24
    } else {
        b0 << 24 | b1 << 16 | b2 << 8 | b3
    }) as i64
}

/// Inspect the first four bytes of the source to deduce the encoding,
/// following `detect_encoding` in `yip.c` exactly (including its
/// documented-ambiguous tie-break for an all-zero first four bytes).
///
/// Missing bytes (source shorter than four bytes) are treated as the
/// `0xAA` sentinel, matching the original.
pub fn detect_encoding(first_four: &[u8]) -> Encoding {
    let byte = |i: usize| -> u32 { *first_four.get(i).unwrap_or(&0xAA) as u32 };
    let (b0, b1, b2, b3) = (byte(0), byte(1), byte(2), byte(3));
    let byte_01 = (b0 << 8) | b1;
    let byte_012 = (b0 << 16) | (b1 << 8) | b2;
    let byte_123 = (b1 << 16) | (b2 << 8) | b3;
    let byte_0123 = (b0 << 24) | (b1 << 16) | (b2 << 8) | b3;

    if byte_0123 == 0x0000_FEFF {
        return Encoding::Utf32Be;
    }
    if byte_012 == 0x0000_00 {
        return Encoding::Utf32Be;
    }
    if byte_0123 == 0xFFFE_0000 {
        return Encoding::Utf32Le;
    }
    if byte_123 == 0x00_0000 {
        return Encoding::Utf32Le;
    }
    if byte_01 == 0xFEFF {
        return Encoding::Utf16Be;
    }
    if b0 == 0x00 {
        return Encoding::Utf16Be;
    }
    if byte_01 == 0xFFFE {
        return Encoding::Utf16Le;
    }
    if b1 == 0x00 {
        return Encoding::Utf16Be;
    }
    Encoding::Utf8
}

/// Length, in bytes, of the BOM for `encoding` if `first_bytes` begins with
/// one. Used by the parser to consume the BOM into a `Bom` token.
pub fn bom_len(encoding: Encoding, first_bytes: &[u8]) -> usize {
    match encoding {
        Encoding::Utf8 => {
            if first_bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
                3
            } else {
                0
            }
        }
        Encoding::Utf16Le => {
            if first_bytes.starts_with(&[0xFF, 0xFE]) {
                2
            } else {
                0
            }
        }
        Encoding::Utf16Be => {
            if first_bytes.starts_with(&[0xFE, 0xFF]) {
                2
            } else {
                0
            }
        }
        Encoding::Utf32Le => {
            if first_bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
                4
            } else {
                0
            }
        }
        Encoding::Utf32Be => {
            if first_bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
                4
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_ascii_round_trip() {
        let bytes = b"A";
        let mut pos = 0;
        assert_eq!(decode_utf8(bytes, &mut pos), 'A' as i64);
        assert_eq!(pos, 1);
    }

    #[test]
    fn utf8_accepts_overlong_sequence() {
        // 0xC0 0x80 is an over-long encoding of NUL; yip_decode_utf8 accepts it.
        let bytes = [0xC0, 0x80];
        let mut pos = 0;
        assert_eq!(decode_utf8(&bytes, &mut pos), 0);
        assert_eq!(pos, 2);
    }

    #[test]
    fn utf8_truncated_sequence_is_invalid_but_advances() {
        let bytes = [0xE2, 0x82]; // truncated 3-byte sequence (€ missing last byte)
        let mut pos = 0;
        assert_eq!(decode_utf8(&bytes, &mut pos), INVALID_CODE);
        assert_eq!(pos, 2);
    }

    #[test]
    fn utf16_surrogate_pair() {
        // U+1F600 ("😀") as UTF-16LE: D83D DE00
        let bytes = [0x3D, 0xD8, 0x00, 0xDE];
        let mut pos = 0;
        assert_eq!(decode_utf16le(&bytes, &mut pos), 0x1F600);
        assert_eq!(pos, 4);
    }

    #[test]
    fn utf16_unpaired_low_surrogate_is_invalid() {
        let bytes = [0x00, 0xDC];
        let mut pos = 0;
        assert_eq!(decode_utf16le(&bytes, &mut pos), INVALID_CODE);
    }

    #[test]
    fn detect_utf8_bom() {
        assert_eq!(detect_encoding(&[0xEF, 0xBB, 0xBF, b'a']), Encoding::Utf8);
    }

    #[test]
    fn detect_utf16_bom() {
        assert_eq!(detect_encoding(&[0xFF, 0xFE, b'a', 0x00]), Encoding::Utf16Le);
        assert_eq!(detect_encoding(&[0xFE, 0xFF, 0x00, b'a']), Encoding::Utf16Be);
    }

    #[test]
    fn detect_utf32_bom() {
        assert_eq!(
            detect_encoding(&[0x00, 0x00, 0xFE, 0xFF]),
            Encoding::Utf32Be
        );
        assert_eq!(
            detect_encoding(&[0xFF, 0xFE, 0x00, 0x00]),
            Encoding::Utf32Le
        );
    }

    #[test]
    fn detect_default_is_utf8() {
        assert_eq!(detect_encoding(b"key:"), Encoding::Utf8);
    }

    #[test]
    fn round_trip_all_encodings() {
        for enc in [
            Encoding::Utf8,
            Encoding::Utf16Le,
            Encoding::Utf16Be,
            Encoding::Utf32Le,
            Encoding::Utf32Be,
        ] {
            let sample = encode_sample(enc, "a: 1\n");
            let detected = detect_encoding(&sample[..sample.len().min(4)]);
            assert_eq!(detected, enc, "round trip failed for {enc:?}");
        }
    }

    fn encode_sample(enc: Encoding, text: &str) -> Vec<u8> {
        match enc {
            Encoding::Utf8 => {
                let mut v = vec![0xEF, 0xBB, 0xBF];
                v.extend_from_slice(text.as_bytes());
                v
            }
            Encoding::Utf16Le => {
                let mut v = vec![0xFF, 0xFE];
                for c in text.encode_utf16() {
                    v.extend_from_slice(&c.to_le_bytes());
                }
                v
            }
            Encoding::Utf16Be => {
                let mut v = vec![0xFE, 0xFF];
                for c in text.encode_utf16() {
                    v.extend_from_slice(&c.to_be_bytes());
                }
                v
            }
            Encoding::Utf32Le => {
                let mut v = vec![0xFF, 0xFE, 0x00, 0x00];
                for c in text.chars() {
                    v.extend_from_slice(&(c as u32).to_le_bytes());
                }
                v
            }
            Encoding::Utf32Be => {
                let mut v = vec![0x00, 0x00, 0xFE, 0xFF];
                for c in text.chars() {
                    v.extend_from_slice(&(c as u32).to_be_bytes());
                }
                v
            }
        }
    }
}
