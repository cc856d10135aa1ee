use crate::error::MapError;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const CONTINUATION_BIT: u8 = 0b10_0000;
const VALUE_MASK: u8 = 0b01_1111;
const VALUE_BITS: u32 = 5;

// Seven digits carry 35 value bits, enough for a sign bit plus a 32 bit magnitude.
// Anything longer can't encode a value we'd accept anyway.
const MAX_SHIFT: u32 = VALUE_BITS * 6;

fn digit_value(c: char) -> Option<u8> {
    match c {
        'A'..='Z' => Some(c as u8 - b'A'),
        'a'..='z' => Some(c as u8 - b'a' + 26),
        '0'..='9' => Some(c as u8 - b'0' + 52),
        '+' => Some(62),
        '/' => Some(63),
        _ => None,
    }
}

/// Decode a base64 VLQ string into the signed integers it encodes.
pub fn decode(input: &str) -> Result<Vec<i32>, MapError> {
    let mut out = Vec::new();
    decode_into(input, &mut out)?;
    Ok(out)
}

/// Like [`decode`], but appends to a caller-owned buffer so hot loops can reuse it.
pub fn decode_into(input: &str, out: &mut Vec<i32>) -> Result<(), MapError> {
    let mut accumulated: u64 = 0;
    let mut shift: u32 = 0;

    for (offset, c) in input.char_indices() {
        let digit = digit_value(c).ok_or_else(|| {
            MapError::MalformedVlq(format!(
                "invalid base64 character {:?} at offset {} in {:?}",
                c, offset, input
            ))
        })?;

        if shift > MAX_SHIFT {
            return Err(MapError::MalformedVlq(format!(
                "value starting before offset {} in {:?} is too long",
                offset, input
            )));
        }

        accumulated |= u64::from(digit & VALUE_MASK) << shift;

        if digit & CONTINUATION_BIT != 0 {
            shift += VALUE_BITS;
            continue;
        }

        // Lowest bit is the sign, the rest is the magnitude
        let magnitude = (accumulated >> 1) as i64;
        let value = if accumulated & 1 == 1 {
            -magnitude
        } else {
            magnitude
        };
        let value = i32::try_from(value).map_err(|_| {
            MapError::MalformedVlq(format!("value {} in {:?} exceeds 32 bits", value, input))
        })?;
        out.push(value);

        accumulated = 0;
        shift = 0;
    }

    if shift != 0 {
        return Err(MapError::MalformedVlq(format!(
            "{:?} ends in the middle of a value",
            input
        )));
    }

    Ok(())
}

/// Encode a sequence of integers as a base64 VLQ string, the inverse of [`decode`].
pub fn encode(values: &[i32]) -> String {
    let mut out = String::new();
    for value in values {
        encode_value(*value, &mut out);
    }
    out
}

fn encode_value(value: i32, out: &mut String) {
    let value = i64::from(value);
    let mut remaining = if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (remaining & u64::from(VALUE_MASK)) as u8;
        remaining >>= VALUE_BITS;
        if remaining > 0 {
            digit |= CONTINUATION_BIT;
        }
        out.push(char::from(ALPHABET[usize::from(digit)]));
        if remaining == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    #[test]
    fn decodes_known_values() {
        assert_eq!(decode("A").unwrap(), vec![0]);
        assert_eq!(decode("C").unwrap(), vec![1]);
        assert_eq!(decode("D").unwrap(), vec![-1]);
        assert_eq!(decode("gB").unwrap(), vec![16]);
        assert_eq!(decode("hB").unwrap(), vec![-16]);
        assert_eq!(decode("AAAA").unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(decode("AAgBC").unwrap(), vec![0, 0, 16, 1]);
        assert_eq!(decode("").unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn negative_zero_is_zero() {
        assert_eq!(decode("B").unwrap(), vec![0]);
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        for input in ["AA*A", "AA=A", "A A", "AAé"] {
            let err = decode(input).unwrap_err();
            assert!(matches!(err, MapError::MalformedVlq(_)), "{}", input);
        }
    }

    #[test]
    fn rejects_truncated_values() {
        assert!(matches!(decode("g"), Err(MapError::MalformedVlq(_))));
        assert!(matches!(decode("AAg"), Err(MapError::MalformedVlq(_))));
    }

    #[test]
    fn rejects_overlong_values() {
        assert!(matches!(decode("gggggggB"), Err(MapError::MalformedVlq(_))));
        // 2^32 doesn't fit an i32
        assert!(matches!(decode(&encode_u64(1 << 33)), Err(MapError::MalformedVlq(_))));
    }

    fn encode_u64(mut remaining: u64) -> String {
        let mut out = String::new();
        loop {
            let mut digit = (remaining & 0b1_1111) as u8;
            remaining >>= 5;
            if remaining > 0 {
                digit |= CONTINUATION_BIT;
            }
            out.push(char::from(ALPHABET[usize::from(digit)]));
            if remaining == 0 {
                return out;
            }
        }
    }

    #[test]
    fn round_trips_edge_values() {
        let values = vec![
            0,
            1,
            -1,
            15,
            -15,
            16,
            -16,
            511,
            -512,
            i32::MAX,
            i32::MIN,
            i32::MAX - 1,
            i32::MIN + 1,
        ];
        assert_eq!(decode(&encode(&values)).unwrap(), values);
    }

    #[test]
    fn round_trips_random_sequences() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let len = rng.gen_range(0..32);
            let values: Vec<i32> = (0..len)
                .map(|_| match rng.gen_range(0..3) {
                    0 => rng.gen_range(-16..16),
                    1 => rng.gen_range(-100_000..100_000),
                    _ => rng.gen(),
                })
                .collect();
            assert_eq!(decode(&encode(&values)).unwrap(), values);
        }
    }
}
