//! Fixed-size pubkey wrappers.
//!
//! `Nomination` pubkeys are 32 bytes (staking); `CcNomination` pubkeys are 33
//! bytes (monitor set, compressed secp256k1). Both need bytewise ascending
//! `Ord` for the aggregator's deterministic tie-break.

use std::fmt;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

macro_rules! fixed_pubkey {
    ($name:ident, $len:expr) => {
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                let bytes = hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?;
                let arr: [u8; $len] = bytes
                    .try_into()
                    .map_err(|_| D::Error::custom(concat!("expected ", $len, " byte pubkey")))?;
                Ok(Self(arr))
            }
        }
    };
}

fixed_pubkey!(Pubkey32, 32);
fixed_pubkey!(Pubkey33, 33);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_bytewise_ascending() {
        let a = Pubkey32([0u8; 32]);
        let mut b = [0u8; 32];
        b[31] = 1;
        let b = Pubkey32(b);
        assert!(a < b);
    }

    #[test]
    fn hex_roundtrip() {
        let pk = Pubkey33([7u8; 33]);
        let json = serde_json::to_string(&pk).unwrap();
        let back: Pubkey33 = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, back);
    }
}
