use std::{fmt, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Target network of a deployment run, keyed by its hardhat-style name.
///
/// Unknown names are kept verbatim in [`Network::Other`] so that a record for a
/// network without any table entries still deploys; network keyed steps are
/// then skipped instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, SerializeDisplay, DeserializeFromStr)]
pub enum Network {
    Bsc,
    Heco,
    Avax,
    Polygon,
    Fantom,
    One,
    Arbitrum,
    Celo,
    Moonriver,
    Cronos,
    Aurora,
    Fuse,
    Metis,
    #[default]
    Localhost,
    Other(String),
}

impl Network {
    /// The only network where freshly deployed contracts are registered with
    /// the subsidy registry.
    pub const SUBSIDY_NETWORK: Network = Network::Bsc;

    pub fn name(&self) -> &str {
        match self {
            Network::Bsc => "bsc",
            Network::Heco => "heco",
            Network::Avax => "avax",
            Network::Polygon => "polygon",
            Network::Fantom => "fantom",
            Network::One => "one",
            Network::Arbitrum => "arbitrum",
            Network::Celo => "celo",
            Network::Moonriver => "moonriver",
            Network::Cronos => "cronos",
            Network::Aurora => "aurora",
            Network::Fuse => "fuse",
            Network::Metis => "metis",
            Network::Localhost => "localhost",
            Network::Other(name) => name,
        }
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Network::Bsc => Some(56),
            Network::Heco => Some(128),
            Network::Avax => Some(43114),
            Network::Polygon => Some(137),
            Network::Fantom => Some(250),
            Network::One => Some(1_666_600_000),
            Network::Arbitrum => Some(42161),
            Network::Celo => Some(42220),
            Network::Moonriver => Some(1285),
            Network::Cronos => Some(25),
            Network::Aurora => Some(1_313_161_554),
            Network::Fuse => Some(122),
            Network::Metis => Some(1088),
            Network::Localhost => Some(31337),
            Network::Other(_) => None,
        }
    }

    pub fn is_subsidy_network(&self) -> bool {
        *self == Self::SUBSIDY_NETWORK
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("network name must not be empty")]
pub struct EmptyNetworkName;

impl FromStr for Network {
    type Err = EmptyNetworkName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let network = match name.as_str() {
            "" => return Err(EmptyNetworkName),
            "bsc" => Network::Bsc,
            "heco" => Network::Heco,
            "avax" => Network::Avax,
            "polygon" => Network::Polygon,
            "fantom" => Network::Fantom,
            "one" => Network::One,
            "arbitrum" => Network::Arbitrum,
            "celo" => Network::Celo,
            "moonriver" => Network::Moonriver,
            "cronos" => Network::Cronos,
            "aurora" => Network::Aurora,
            "fuse" => Network::Fuse,
            "metis" => Network::Metis,
            "localhost" | "hardhat" | "anvil" => Network::Localhost,
            _ => Network::Other(name),
        };
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_unknown_names() {
        assert_eq!("BSC".parse::<Network>().unwrap(), Network::Bsc);
        assert_eq!("anvil".parse::<Network>().unwrap(), Network::Localhost);
        assert_eq!(
            "kava".parse::<Network>().unwrap(),
            Network::Other("kava".to_string())
        );
        assert!("  ".parse::<Network>().is_err());
    }

    #[test]
    fn only_bsc_is_subsidised() {
        assert!(Network::Bsc.is_subsidy_network());
        assert!(!Network::Polygon.is_subsidy_network());
        assert!(!Network::Other("bsc-testnet".into()).is_subsidy_network());
    }

    #[test]
    fn serializes_as_name() {
        let yaml = serde_yaml::to_string(&Network::Fantom).unwrap();
        assert_eq!(yaml.trim(), "fantom");
        let parsed: Network = serde_yaml::from_str("polygon").unwrap();
        assert_eq!(parsed, Network::Polygon);
    }
}
