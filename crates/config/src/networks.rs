use ethers::types::U256;
use vault_ops_types::Network;

/// Harvest call fee expected on each network.
///
/// Networks without an entry keep whatever fee the strategy was deployed with.
pub fn call_fee(network: &Network) -> Option<U256> {
    let fee: u64 = match network {
        Network::Bsc
        | Network::Heco
        | Network::Avax
        | Network::One
        | Network::Arbitrum
        | Network::Celo
        | Network::Moonriver
        | Network::Cronos
        | Network::Aurora
        | Network::Fuse
        | Network::Metis => 111,
        Network::Polygon | Network::Fantom => 11,
        Network::Localhost | Network::Other(_) => return None,
    };
    Some(U256::from(fee))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_networks_have_no_call_fee() {
        assert_eq!(call_fee(&Network::Other("kava".into())), None);
        assert_eq!(call_fee(&Network::Localhost), None);
        assert_eq!(call_fee(&Network::Polygon), Some(U256::from(11)));
        assert_eq!(call_fee(&Network::Bsc), Some(U256::from(111)));
    }
}
