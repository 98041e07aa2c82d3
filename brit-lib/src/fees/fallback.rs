//! Addresses shipped with the software.
//!
//! Used whenever no Matcher response is stored, or the stored one has an
//! empty pool. Changing these lists changes where fees go, so they are
//! versioned with the crate.

use crate::address::{BitcoinAddress, BitcoinNetwork};

/// Mainnet fallback pool.
pub const MAINNET_FALLBACK_ADDRESSES: &[&str] = &[
    "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
    "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
    "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh",
    "bc1q7efa5rjlceuzy34z8g7u7xnr9k6hqfmt9xz9y2",
    "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy",
];

/// Testnet fallback pool.
pub const TESTNET_FALLBACK_ADDRESSES: &[&str] = &[
    "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx",
    "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn",
    "2MzQwSSnBHWHqSAqtTVQ6v47XtaisrJa1Vc",
];

/// Regtest fallback pool.
pub const REGTEST_FALLBACK_ADDRESSES: &[&str] = &[
    "bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080",
    "n3GNqMveyvaPvUbH469vaDRSvDPDzXGGXR",
];

/// Raw fallback strings for `network`.
pub fn fallback_strings(network: BitcoinNetwork) -> &'static [&'static str] {
    match network {
        BitcoinNetwork::Mainnet => MAINNET_FALLBACK_ADDRESSES,
        BitcoinNetwork::Testnet => TESTNET_FALLBACK_ADDRESSES,
        BitcoinNetwork::Regtest => REGTEST_FALLBACK_ADDRESSES,
    }
}

/// The parsed fallback pool for `network`.
pub fn fallback_addresses(network: BitcoinNetwork) -> Vec<BitcoinAddress> {
    fallback_strings(network)
        .iter()
        .filter_map(|s| BitcoinAddress::parse(s, network).ok())
        .collect()
}

/// Whether `address` belongs to the fallback pool of any network.
pub fn is_fallback_address(address: &BitcoinAddress) -> bool {
    [
        MAINNET_FALLBACK_ADDRESSES,
        TESTNET_FALLBACK_ADDRESSES,
        REGTEST_FALLBACK_ADDRESSES,
    ]
    .iter()
    .any(|pool| pool.contains(&address.as_str()))
}
