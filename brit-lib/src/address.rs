//! Bitcoin fee addresses.
//!
//! The core never builds transactions, so an address is only ever a
//! destination string. Parsing checks the prefix and length for the
//! configured network so that a Matcher cannot hand out something the wallet
//! could never pay to.

use serde::{Deserialize, Serialize};

/// Bitcoin network selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    /// Bitcoin mainnet.
    #[default]
    Mainnet,
    /// Bitcoin testnet (testnet3) and signet.
    Testnet,
    /// Bitcoin regtest (local development).
    Regtest,
}

impl BitcoinNetwork {
    /// Get the network name as used by most APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Regtest => "regtest",
        }
    }
}

impl std::str::FromStr for BitcoinNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "bitcoin" => Ok(Self::Mainnet),
            "testnet" | "signet" => Ok(Self::Testnet),
            "regtest" => Ok(Self::Regtest),
            other => Err(format!("unknown network: {}", other)),
        }
    }
}

/// Why an address string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("invalid {network} address format: {address}")]
    Format {
        network: &'static str,
        address: String,
    },
    #[error("invalid address length: {len} (expected {expected})")]
    Length { len: usize, expected: &'static str },
    #[error("address contains whitespace or control characters")]
    Whitespace,
}

/// A Bitcoin address used as a fee destination.
///
/// # Example
///
/// ```
/// use brit_lib::{BitcoinAddress, BitcoinNetwork};
///
/// let address = BitcoinAddress::parse(
///     "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
///     BitcoinNetwork::Mainnet,
/// )
/// .unwrap();
/// assert!(address.as_str().starts_with("bc1q"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BitcoinAddress(String);

impl BitcoinAddress {
    /// Parse and validate an address for `network`.
    pub fn parse(address: &str, network: BitcoinNetwork) -> Result<Self, AddressError> {
        if address.is_empty() {
            return Err(AddressError::Empty);
        }
        if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AddressError::Whitespace);
        }

        match network {
            BitcoinNetwork::Mainnet => validate_mainnet(address)?,
            BitcoinNetwork::Testnet => validate_testnet(address)?,
            BitcoinNetwork::Regtest => validate_regtest(address)?,
        }

        Ok(Self(address.to_string()))
    }

    /// Parse an address on any network.
    ///
    /// Used where the network is not known, e.g. when reading a stored
    /// schedule that was validated on the way in.
    pub fn parse_any(address: &str) -> Result<Self, AddressError> {
        Self::parse(address, BitcoinNetwork::Mainnet)
            .or_else(|_| Self::parse(address, BitcoinNetwork::Testnet))
            .or_else(|_| Self::parse(address, BitcoinNetwork::Regtest))
    }

    /// Get the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BitcoinAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BitcoinAddress {
    type Error = AddressError;

    fn try_from(address: String) -> Result<Self, Self::Error> {
        Self::parse_any(&address)
    }
}

impl From<BitcoinAddress> for String {
    fn from(address: BitcoinAddress) -> Self {
        address.0
    }
}

impl std::fmt::Display for BitcoinAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_base58(address: &str) -> bool {
    address
        .chars()
        .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'))
}

fn is_bech32_body(data: &str) -> bool {
    data.chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        && !data.contains(['1', 'b', 'i', 'o'])
}

fn validate_base58(address: &str) -> Result<(), AddressError> {
    if address.len() < 26 || address.len() > 35 {
        return Err(AddressError::Length {
            len: address.len(),
            expected: "26-35",
        });
    }
    if !is_base58(address) {
        return Err(AddressError::Format {
            network: "base58",
            address: address.to_string(),
        });
    }
    Ok(())
}

fn validate_segwit(address: &str, hrp: &str, network: &'static str) -> Result<(), AddressError> {
    let data = &address[hrp.len() + 1..];
    if !is_bech32_body(data) {
        return Err(AddressError::Format {
            network,
            address: address.to_string(),
        });
    }
    let witness_v0 = address.starts_with(&format!("{}1q", hrp));
    let len = address.len();
    let expected_v0 = [hrp.len() + 40, hrp.len() + 60];
    if witness_v0 && !expected_v0.contains(&len) {
        return Err(AddressError::Length {
            len,
            expected: "P2WPKH or P2WSH length",
        });
    }
    if !witness_v0 && len != hrp.len() + 60 {
        return Err(AddressError::Length {
            len,
            expected: "taproot length",
        });
    }
    Ok(())
}

fn validate_mainnet(address: &str) -> Result<(), AddressError> {
    if address.starts_with('1') || address.starts_with('3') {
        validate_base58(address)
    } else if address.starts_with("bc1q") || address.starts_with("bc1p") {
        validate_segwit(address, "bc", "mainnet")
    } else {
        Err(AddressError::Format {
            network: "mainnet",
            address: address.to_string(),
        })
    }
}

fn validate_testnet(address: &str) -> Result<(), AddressError> {
    if address.starts_with('m') || address.starts_with('n') || address.starts_with('2') {
        validate_base58(address)
    } else if address.starts_with("tb1q") || address.starts_with("tb1p") {
        validate_segwit(address, "tb", "testnet")
    } else {
        Err(AddressError::Format {
            network: "testnet",
            address: address.to_string(),
        })
    }
}

fn validate_regtest(address: &str) -> Result<(), AddressError> {
    if address.starts_with("bcrt1q") || address.starts_with("bcrt1p") {
        validate_segwit(address, "bcrt", "regtest")
    } else {
        validate_testnet(address).map_err(|_| AddressError::Format {
            network: "regtest",
            address: address.to_string(),
        })
    }
}
