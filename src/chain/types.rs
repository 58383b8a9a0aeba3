//! Shared value types: 256-bit wire fields and zatoshi amounts.

use std::fmt;

use hex::{FromHex, ToHex};

/// Zatoshis per ZEC.
pub const COIN: i64 = 100_000_000;

/// A 256-bit wire field (block hash, txid, nullifier, nonce, ...).
///
/// Stored in internal (little-endian) wire order; displayed and parsed as
/// byte-reversed hex, matching the reference RPC.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero value, used by coinbase prevouts and the genesis parent.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    /// Return the bytes in big-endian byte-order suitable for printing out byte by byte.
    pub fn bytes_in_display_order(&self) -> [u8; 32] {
        let mut reversed_bytes = self.0;
        reversed_bytes.reverse();
        reversed_bytes
    }

    /// Convert bytes in big-endian byte-order into a [`Hash256`].
    pub fn from_bytes_in_display_order(bytes_in_display_order: &[u8; 32]) -> Hash256 {
        let mut internal_byte_order = *bytes_in_display_order;
        internal_byte_order.reverse();

        Hash256(internal_byte_order)
    }

    /// True when every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.encode_hex::<String>())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Hash256")
            .field(&self.encode_hex::<String>())
            .finish()
    }
}

impl ToHex for &Hash256 {
    fn encode_hex<T: FromIterator<char>>(&self) -> T {
        self.bytes_in_display_order().encode_hex()
    }

    fn encode_hex_upper<T: FromIterator<char>>(&self) -> T {
        self.bytes_in_display_order().encode_hex_upper()
    }
}

impl ToHex for Hash256 {
    fn encode_hex<T: FromIterator<char>>(&self) -> T {
        (&self).encode_hex()
    }

    fn encode_hex_upper<T: FromIterator<char>>(&self) -> T {
        (&self).encode_hex_upper()
    }
}

impl FromHex for Hash256 {
    type Error = <[u8; 32] as FromHex>::Error;

    fn from_hex<T: AsRef<[u8]>>(hex: T) -> Result<Self, Self::Error> {
        let hash = <[u8; 32]>::from_hex(hex)?;

        Ok(Self::from_bytes_in_display_order(&hash))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }
}

impl From<Hash256> for [u8; 32] {
    fn from(hash: Hash256) -> Self {
        hash.0
    }
}

/// An amount in zatoshis (`CAmount`): signed 64-bit, negative for the
/// Sapling value balance of a net-shielding transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(pub i64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// The raw zatoshi count.
    pub fn zatoshis(self) -> i64 {
        self.0
    }

    /// Display conversion to whole ZEC. Lossy above 2^53 zatoshis; the wire
    /// form always carries the integer.
    pub fn to_zec(self) -> f64 {
        self.0 as f64 / COIN as f64
    }

    /// Construct from a ZEC decimal, rounding to the nearest zatoshi.
    pub fn from_zec(zec: f64) -> Result<Amount, &'static str> {
        if !zec.is_finite() {
            return Err("invalid amount");
        }
        let zats = (zec * COIN as f64).round();
        if zats < i64::MIN as f64 || zats > i64::MAX as f64 {
            return Err("overflow");
        }
        Ok(Amount(zats as i64))
    }
}

impl From<i64> for Amount {
    fn from(zats: i64) -> Self {
        Amount(zats)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_order_is_reversed() {
        let mut wire = [0u8; 32];
        wire[0] = 0xAA;
        wire[31] = 0x01;
        let hash = Hash256(wire);

        let display = hash.to_string();
        assert!(display.starts_with("01"));
        assert!(display.ends_with("aa"));
        assert_eq!(display.len(), 64);
    }

    #[test]
    fn from_hex_round_trips_display() {
        let hex = "000000000053d2771290ff1b57181bd067ae0e55a367ba8ddee2d961ea27a14f";
        let hash = Hash256::from_hex(hex).unwrap();
        assert_eq!(hash.to_string(), hex);
        // Wire order has the leading display zeros at the tail.
        assert_eq!(hash.0[31], 0x00);
        assert_eq!(hash.0[0], 0x4f);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(Hash256::from_hex("ab").is_err());
    }

    #[test]
    fn zero_hash() {
        assert!(Hash256::ZERO.is_zero());
        assert!(!Hash256([1u8; 32]).is_zero());
    }

    #[test]
    fn amount_zec_conversion() {
        assert_eq!(Amount(COIN).to_zec(), 1.0);
        assert_eq!(Amount(150_000_000).to_zec(), 1.5);
        assert_eq!(Amount(1).to_zec(), 0.00000001);
        assert_eq!(Amount(-COIN).to_zec(), -1.0);
    }

    #[test]
    fn amount_from_zec_rounds() {
        assert_eq!(Amount::from_zec(2.5).unwrap(), Amount(250_000_000));
        assert_eq!(Amount::from_zec(0.00000001).unwrap(), Amount(1));
        assert!(Amount::from_zec(f64::NAN).is_err());
    }
}
