/// Gas limit used for both creation transactions unless a record overrides it.
pub const DEFAULT_GAS_LIMIT: u64 = 5_000_000;
/// Default RPC endpoint (local anvil/hardhat node).
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";
/// How long a submitted transaction may stay unconfirmed before the step fails.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 300;
/// Directory holding one parameter record per deployment.
pub const DEPLOYMENTS_DIR: &str = "configs/deployments";
/// Name of the report file written for every archived run.
pub const REPORT_FILE: &str = "report.json";
