use alloy_sol_types::sol;

sol! {
    /// Minimal ERC-20 surface read by balance tracking.
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}
