//! BIP-32 derivation paths as applications expect them in payloads
//!
//! The packed form is one count byte followed by each element as a
//! big-endian `u32`, hardened elements carrying the top bit.

use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};

/// Top bit of a hardened element
pub const HARDENED: u32 = 0x8000_0000;

/// Deepest path a count byte can describe
const MAX_DEPTH: usize = u8::MAX as usize;

/// Address formats prefixed to Bitcoin paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BtcPathFormat {
    Legacy = 0x00,
    P2sh = 0x01,
    Bech32 = 0x02,
    CashAddr = 0x03,
    Bech32m = 0x04,
}

/// Absolute path from the master key (`m/44'/0'/0'/0/0`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    elements: Vec<u32>,
}

impl DerivationPath {
    pub fn new(elements: Vec<u32>) -> Result<Self> {
        if elements.is_empty() || elements.len() > MAX_DEPTH {
            return Err(Error::DerivationPath {
                path: format!("{:?}", elements),
                reason: format!("depth must be between 1 and {}", MAX_DEPTH),
            });
        }
        Ok(Self { elements })
    }

    /// Elements as packed by [`DerivationPath::pack`], without the count byte
    pub fn from_packed(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(Error::DerivationPath {
                path: hex::encode(bytes),
                reason: "packed elements are 4 bytes each".to_string(),
            });
        }
        let elements = bytes
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::new(elements)
    }

    pub fn elements(&self) -> &[u32] {
        &self.elements
    }

    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    /// Count byte, then each element big-endian
    pub fn pack(&self) -> Vec<u8> {
        let mut packed = Vec::with_capacity(1 + 4 * self.elements.len());
        // MAX_DEPTH keeps this in range
        packed.push(self.elements.len() as u8);
        for element in &self.elements {
            packed.extend_from_slice(&element.to_be_bytes());
        }
        packed
    }

    // BIP-44 levels: m / purpose' / coin_type' / account' / change / address_index

    pub fn purpose(&self) -> Option<u32> {
        self.elements.first().map(|e| e & !HARDENED)
    }

    pub fn coin_type(&self) -> Option<u32> {
        self.elements.get(1).map(|e| e & !HARDENED)
    }

    pub fn account(&self) -> Option<u32> {
        self.elements.get(2).map(|e| e & !HARDENED)
    }

    pub fn change(&self) -> Option<u32> {
        self.elements.get(3).copied()
    }

    pub fn address_index(&self) -> Option<u32> {
        self.elements.get(4).copied()
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::DerivationPath {
            path: s.to_string(),
            reason,
        };

        let mut parts = s.trim().split('/');
        if parts.next() != Some("m") {
            return Err(invalid("must start at the master key 'm'".to_string()));
        }

        let mut elements = Vec::new();
        for part in parts {
            let (index, hardened) = match part.strip_suffix(['\'', 'h', 'H']) {
                Some(index) => (index, true),
                None => (part, false),
            };
            let index: u32 = index
                .parse()
                .map_err(|_| invalid(format!("'{}' is not an index", part)))?;
            if index >= HARDENED {
                return Err(invalid(format!("index {} is out of range", index)));
            }
            elements.push(if hardened { index | HARDENED } else { index });
        }

        Self::new(elements).map_err(|_| invalid(format!("depth must be between 1 and {}", MAX_DEPTH)))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for element in &self.elements {
            if element & HARDENED != 0 {
                write!(f, "/{}'", element & !HARDENED)?;
            } else {
                write!(f, "/{}", element)?;
            }
        }
        Ok(())
    }
}

/// Pack `m/...` into the payload form applications parse
pub fn pack_derivation_path(path: &str) -> Result<Vec<u8>> {
    Ok(path.parse::<DerivationPath>()?.pack())
}

/// [`pack_derivation_path`] preceded by the address format byte
pub fn pack_btc_derivation_path(format: BtcPathFormat, path: &str) -> Result<Vec<u8>> {
    let mut packed = vec![format as u8];
    packed.extend(pack_derivation_path(path)?);
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_bip44_path() {
        let packed = pack_derivation_path("m/44'/0'/0'/0/0").unwrap();
        assert_eq!(
            hex::encode(&packed),
            "058000002c80000000800000000000000000000000"
        );
    }

    #[test]
    fn test_hardened_markers() {
        let apostrophe: DerivationPath = "m/44'/60'/1'/0/7".parse().unwrap();
        let letter: DerivationPath = "m/44h/60H/1h/0/7".parse().unwrap();
        assert_eq!(apostrophe, letter);
        assert_eq!(letter.to_string(), "m/44'/60'/1'/0/7");

        assert_eq!(apostrophe.purpose(), Some(44));
        assert_eq!(apostrophe.coin_type(), Some(60));
        assert_eq!(apostrophe.account(), Some(1));
        assert_eq!(apostrophe.change(), Some(0));
        assert_eq!(apostrophe.address_index(), Some(7));
    }

    #[test]
    fn test_invalid_paths() {
        for path in ["44'/0'", "m", "m/", "m/abc", "m/2147483648", "m/1''", "x/1"] {
            let err = path.parse::<DerivationPath>().unwrap_err();
            assert!(matches!(err, Error::DerivationPath { .. }), "{path}: {err:?}");
        }
    }

    #[test]
    fn test_from_packed_elements() {
        let packed = pack_derivation_path("m/84'/1'/0'/1/12").unwrap();
        let path = DerivationPath::from_packed(&packed[1..]).unwrap();
        assert_eq!(path.to_string(), "m/84'/1'/0'/1/12");
        assert_eq!(path.depth(), 5);
        assert!(DerivationPath::from_packed(&packed[1..6]).is_err());
        assert!(DerivationPath::from_packed(&[]).is_err());
    }

    #[test]
    fn test_btc_format_prefix() {
        let packed = pack_btc_derivation_path(BtcPathFormat::Bech32, "m/84'/0'/0'/0/0").unwrap();
        assert_eq!(packed[0], 0x02);
        assert_eq!(packed[1], 5);
        assert_eq!(packed.len(), 2 + 5 * 4);
    }
}
