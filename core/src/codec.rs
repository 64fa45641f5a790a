//! Length-prefixed framing for the protocol's concatenated byte bundles.
//!
//! Every field is prefixed with its length as a big-endian `u32`, so the
//! concatenation round-trips arbitrary byte strings (including empty ones
//! and ones containing any delimiter-looking bytes).

use crate::errors::ProtocolError;

const LEN_PREFIX: usize = 4;

/// Concatenates byte fields into one self-describing bundle.
pub fn concatenate(fields: &[&[u8]]) -> Vec<u8> {
    let total: usize = fields.iter().map(|field| LEN_PREFIX + field.len()).sum();
    let mut out = Vec::with_capacity(total);
    for field in fields {
        out.extend_from_slice(&(field.len() as u32).to_be_bytes());
        out.extend_from_slice(field);
    }
    out
}

/// Splits a bundle back into its fields.
pub fn parse(msg: &[u8]) -> Result<Vec<Vec<u8>>, ProtocolError> {
    let mut fields = Vec::new();
    let mut rest = msg;

    while !rest.is_empty() {
        if rest.len() < LEN_PREFIX {
            return Err(ProtocolError::MalformedPackage("truncated length prefix"));
        }
        let (prefix, tail) = rest.split_at(LEN_PREFIX);
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if tail.len() < len {
            return Err(ProtocolError::MalformedPackage("field longer than remaining bytes"));
        }
        let (field, tail) = tail.split_at(len);
        fields.push(field.to_vec());
        rest = tail;
    }

    Ok(fields)
}

/// Like [`parse`] but requires exactly `N` fields.
pub fn parse_n<const N: usize>(msg: &[u8]) -> Result<[Vec<u8>; N], ProtocolError> {
    parse(msg)?
        .try_into()
        .map_err(|_| ProtocolError::MalformedPackage("unexpected field count"))
}

/// Encodes a value at a fixed width in big-endian byte order.
///
/// `width` must be at least 8; the value occupies the low bytes.
pub fn encode_value(value: u64, width: usize) -> Vec<u8> {
    debug_assert!(width >= 8);
    let mut out = vec![0u8; width];
    let tail = out.len() - 8;
    out[tail..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Decodes a fixed-width big-endian value, rejecting anything that does
/// not fit in 64 bits.
pub fn decode_value(bytes: &[u8]) -> Result<u64, ProtocolError> {
    let split = bytes.len().saturating_sub(8);
    if bytes[..split].iter().any(|&byte| byte != 0) {
        return Err(ProtocolError::MalformedPackage("value does not fit in 64 bits"));
    }
    Ok(bytes[split..]
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roundtrip_includes_empty_and_delimiter_bytes() {
        let fields: Vec<Vec<u8>> = vec![
            vec![],
            (0u16..=255).map(|b| b as u8).collect(),
            b" - ".to_vec(), // the original implementation's separator
            vec![0; 4],
        ];
        let refs: Vec<&[u8]> = fields.iter().map(|f| f.as_slice()).collect();

        let bundle = concatenate(&refs);
        assert_eq!(parse(&bundle).unwrap(), fields);
    }

    #[test]
    fn test_parse_n_field_count() {
        let bundle = concatenate(&[b"a", b"bc"]);
        assert!(parse_n::<2>(&bundle).is_ok());
        assert!(parse_n::<3>(&bundle).is_err());
    }

    #[test]
    fn test_parse_rejects_truncation() {
        let mut bundle = concatenate(&[b"quantity"]);
        bundle.pop();
        assert!(parse(&bundle).is_err());

        // A dangling prefix without its field.
        assert!(parse(&[0, 0]).is_err());
    }

    #[test]
    fn test_empty_bundle_has_no_fields() {
        assert_eq!(parse(&[]).unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn test_value_width() {
        let encoded = encode_value(513, 32);
        assert_eq!(encoded.len(), 32);
        assert_eq!(decode_value(&encoded).unwrap(), 513);

        let mut overflowing = encoded;
        overflowing[0] = 1;
        assert!(decode_value(&overflowing).is_err());
    }

    proptest! {
        #[test]
        fn test_roundtrip(fields in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8)) {
            let refs: Vec<&[u8]> = fields.iter().map(|f| f.as_slice()).collect();
            prop_assert_eq!(parse(&concatenate(&refs)).unwrap(), fields);
        }

        #[test]
        fn test_value_roundtrip(value in any::<u64>()) {
            prop_assert_eq!(decode_value(&encode_value(value, 32)).unwrap(), value);
        }
    }
}
