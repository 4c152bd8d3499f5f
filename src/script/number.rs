//! Script integers
//!
//! Sign-magnitude, little-endian, variable length. Zero is the empty byte
//! string; the top bit of the last byte carries the sign.

use crate::error::{ScriptError, ScriptErrorKind};

/// Encodes `value` in the shortest form.
pub fn int_to_script_bytes(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut out = Vec::with_capacity(9);
    while magnitude > 0 {
        out.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

/// Decodes without length limit. Inputs longer than eight bytes saturate
/// the magnitude; callers bound the length first.
pub fn int_from_script_bytes(bytes: &[u8]) -> i64 {
    let Some((&last, _)) = bytes.split_last() else {
        return 0;
    };
    let mut magnitude: i64 = 0;
    for (i, b) in bytes.iter().enumerate().take(8) {
        let b = if i == bytes.len() - 1 { b & 0x7f } else { *b };
        magnitude |= i64::from(b) << (8 * i);
    }
    if last & 0x80 != 0 {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}

/// True if `bytes` has no superfluous trailing zero byte.
pub fn is_minimally_encoded(bytes: &[u8]) -> bool {
    match bytes {
        [] => true,
        [.., last] if last & 0x7f != 0 => true,
        [_] => false,
        [.., prev, _] => prev & 0x80 != 0,
    }
}

/// `CScriptNum(bytes, require_minimal, max_len)`. Overflow and non-minimal
/// encodings fail with `UNKNOWN_ERROR`, as Core's script tests expect.
pub fn script_num(bytes: &[u8], require_minimal: bool, max_len: usize) -> Result<i64, ScriptError> {
    if bytes.len() > max_len {
        return Err(ScriptErrorKind::UnknownError.into());
    }
    if require_minimal && !is_minimally_encoded(bytes) {
        return Err(ScriptErrorKind::UnknownError.into());
    }
    Ok(int_from_script_bytes(bytes))
}

/// Truthiness of a stack item: any nonzero byte, except a lone sign bit in
/// the last position ("negative zero").
pub fn cast_to_bool(bytes: &[u8]) -> bool {
    bytes.iter().enumerate().any(|(i, &b)| {
        if i == bytes.len() - 1 {
            b != 0 && b != 0x80
        } else {
            b != 0
        }
    })
}

/// Stack encoding of a boolean result.
pub fn bool_to_script_bytes(value: bool) -> Vec<u8> {
    if value {
        vec![1]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_encodings() {
        let cases: &[(i64, &str)] = &[
            (0, ""),
            (1, "01"),
            (-1, "81"),
            (127, "7f"),
            (128, "8000"),
            (-128, "8080"),
            (255, "ff00"),
            (256, "0001"),
            (-256, "0081"),
            (0x7fff_ffff, "ffffff7f"),
            (-0x7fff_ffff, "ffffffff"),
            (0x8000_0000, "0000008000"),
        ];
        for (n, expected) in cases {
            assert_eq!(hex::encode(int_to_script_bytes(*n)), *expected, "{n}");
            assert_eq!(int_from_script_bytes(&int_to_script_bytes(*n)), *n);
        }
    }

    #[test]
    fn test_minimal_encoding() {
        assert!(is_minimally_encoded(&[]));
        assert!(is_minimally_encoded(&[0x01]));
        assert!(!is_minimally_encoded(&[0x00]));
        assert!(!is_minimally_encoded(&[0x80]));
        assert!(!is_minimally_encoded(&[0x01, 0x00]));
        assert!(is_minimally_encoded(&[0x80, 0x00]));
        assert!(is_minimally_encoded(&[0xff, 0x80]));
    }

    #[test]
    fn test_script_num_limits() {
        assert_eq!(script_num(&[0x01, 0x02, 0x03, 0x04], true, 4).unwrap(), 0x04030201);
        let err = script_num(&[0x01, 0x02, 0x03, 0x04, 0x05], false, 4).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::UnknownError);
        assert!(script_num(&[0x01, 0x00], true, 4).is_err());
        assert_eq!(script_num(&[0x01, 0x00], false, 4).unwrap(), 1);
        assert_eq!(script_num(&[0x01, 0x02, 0x03, 0x04, 0x05], false, 5).unwrap(), 0x0504030201);
    }

    #[test]
    fn test_cast_to_bool() {
        assert!(!cast_to_bool(&[]));
        assert!(!cast_to_bool(&[0x00, 0x00]));
        assert!(!cast_to_bool(&[0x00, 0x80]));
        assert!(!cast_to_bool(&[0x80]));
        assert!(cast_to_bool(&[0x80, 0x00]));
        assert!(cast_to_bool(&[0x01]));
    }

    proptest! {
        #[test]
        fn prop_round_trip(n in -0xff_ffff_ffffi64..=0xff_ffff_ffffi64) {
            let bytes = int_to_script_bytes(n);
            prop_assert!(bytes.len() <= 6);
            prop_assert!(is_minimally_encoded(&bytes));
            prop_assert_eq!(int_from_script_bytes(&bytes), n);
        }
    }
}
