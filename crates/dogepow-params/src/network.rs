//! Dogecoin network definitions and constants.

/// Key and address version bytes for a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VersionBytes {
    /// Base58 prefix of pay-to-pubkey-hash addresses.
    pub p2pkh: u8,
    /// Base58 prefix of pay-to-script-hash addresses.
    pub p2sh: u8,
    /// Wallet import format prefix.
    pub wif: u8,
    /// BIP32 extended public key version.
    pub bip32_public: u32,
    /// BIP32 extended private key version.
    pub bip32_private: u32,
}

/// Peer-to-peer parameters of a Dogecoin network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NetworkParams {
    pub name: &'static str,
    /// Message start bytes, read as a little-endian `u32`.
    pub magic: u32,
    pub default_port: u16,
    /// Port of the websocket transport used by browser peers.
    pub default_web_port: u16,
    pub dns_seeds: &'static [&'static str],
    pub versions: VersionBytes,
    /// Prefix hashed in front of signed messages.
    pub message_prefix: &'static str,
}

impl NetworkParams {
    /// Dogecoin mainnet.
    pub const MAINNET: NetworkParams = NetworkParams {
        name: "dogecoin",
        magic: 0xc0c0c0c0,
        default_port: 22556,
        default_web_port: 25592,
        dns_seeds: &[
            "seed.multidoge.org",
            "seed2.multidoge.org",
            "seed.dogecoin.com",
            "seed.doger.dogecoin.com",
        ],
        versions: VersionBytes {
            p2pkh: 0x1e,
            p2sh: 0x16,
            wif: 0x9e,
            bip32_public: 0x02facafd,
            bip32_private: 0x02fac398,
        },
        message_prefix: "\x19Dogecoin Signed Message:\n",
    };

    /// Message start bytes as they appear on the wire.
    pub fn magic_bytes(&self) -> [u8; 4] {
        self.magic.to_le_bytes()
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        NetworkParams::MAINNET
    }
}

impl core::fmt::Display for NetworkParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_mainnet() {
        let params = NetworkParams::default();

        assert_eq!(params, NetworkParams::MAINNET);
        assert_eq!(params.magic_bytes(), [0xc0; 4]);
        assert_eq!(params.default_port, 22556);
        assert_eq!(params.dns_seeds.len(), 4);
        assert_eq!(params.to_string(), "dogecoin");
    }

    #[test]
    fn test_message_prefix_is_length_prefixed() {
        let prefix = NetworkParams::MAINNET.message_prefix.as_bytes();
        assert_eq!(prefix[0] as usize, prefix.len() - 1);
    }
}
