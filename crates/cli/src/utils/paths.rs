use std::path::{Path, PathBuf};

use vault_ops_config::DEPLOYMENTS_DIR;

const CONTRACTS_ROOT_ENV: &str = "VAULT_OPS_CONTRACTS_ROOT";

/// Returns the root of the contracts project (forge `out/` or hardhat `artifacts/`).
pub fn contracts_root() -> PathBuf {
    if let Ok(path) = std::env::var(CONTRACTS_ROOT_ENV) {
        PathBuf::from(path)
    } else {
        default_contracts_root()
    }
}

/// Resolves a path relative to the contracts project root.
pub fn path_from_root<P: AsRef<Path>>(relative: P) -> PathBuf {
    contracts_root().join(relative)
}

/// Accepts either a path to a record or the bare name of one under
/// `configs/deployments`.
pub fn deployment_record(config: &Path) -> PathBuf {
    if config.exists() || config.components().count() > 1 {
        return config.to_path_buf();
    }
    let name = if config.extension().is_some() {
        config.to_path_buf()
    } else {
        config.with_extension("yaml")
    };
    path_from_root(DEPLOYMENTS_DIR).join(name)
}

fn default_contracts_root() -> PathBuf {
    // .../crates/cli -> the workspace root two levels up
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or(manifest_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_resolve_into_the_deployments_dir() {
        let resolved = deployment_record(Path::new("fantom-boo-dola-inv"));
        assert!(resolved.ends_with("configs/deployments/fantom-boo-dola-inv.yaml"));
    }

    #[test]
    fn relative_paths_are_kept() {
        let resolved = deployment_record(Path::new("somewhere/record.yml"));
        assert_eq!(resolved, PathBuf::from("somewhere/record.yml"));
    }
}
