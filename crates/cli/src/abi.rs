use ethers::contract::abigen;

abigen!(
    IStrategyAbi,
    r#"[
        function callFee() external view returns (uint256)
        function setCallFee(uint256 fee) external
        function pendingRewardsFunctionName() external view returns (string)
        function setPendingRewardsFunctionName(string name) external
    ]"#
);

abigen!(
    ISubsidyRegistryAbi,
    r#"[
        function registerContract(address target, address registrant) external
    ]"#
);
