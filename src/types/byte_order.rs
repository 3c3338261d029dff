use serde::Deserialize;
use strum_macros::Display;

#[cfg(target_endian = "big")]
pub const NATIVE_BYTE_ORDER: ByteOrder = ByteOrder::Big;

#[cfg(target_endian = "little")]
pub const NATIVE_BYTE_ORDER: ByteOrder = ByteOrder::Little;

#[cfg(target_endian = "big")]
pub const NON_NATIVE_BYTE_ORDER: ByteOrder = ByteOrder::Little;

#[cfg(target_endian = "little")]
pub const NON_NATIVE_BYTE_ORDER: ByteOrder = ByteOrder::Big;

/// Byte order / endianness of the bin wire format.
///
/// A single byte order is used for every spilled or shuffled bin within a job.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ByteOrder {
    /// Big Endian
    Big,
    /// Little Endian
    Little,
}

impl Default for ByteOrder {
    fn default() -> Self {
        NATIVE_BYTE_ORDER
    }
}

impl ByteOrder {
    /// Whether values in this byte order can be copied without swapping on this host.
    pub fn is_native(self) -> bool {
        self == NATIVE_BYTE_ORDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json;

    #[test]
    fn test_native_byte_order() {
        assert_ne!(NATIVE_BYTE_ORDER, NON_NATIVE_BYTE_ORDER);
        assert!(NATIVE_BYTE_ORDER.is_native());
        assert!(!NON_NATIVE_BYTE_ORDER.is_native());
    }

    #[test]
    fn test_default_is_native() {
        assert_eq!(NATIVE_BYTE_ORDER, ByteOrder::default());
    }

    #[test]
    fn test_deserialise() {
        let little: ByteOrder = serde_json::from_str(r#""little""#).unwrap();
        assert_eq!(ByteOrder::Little, little);
        let big: ByteOrder = serde_json::from_str(r#""big""#).unwrap();
        assert_eq!(ByteOrder::Big, big);
    }

    #[test]
    fn test_display() {
        assert_eq!("big", ByteOrder::Big.to_string());
        assert_eq!("little", ByteOrder::Little.to_string());
    }
}
