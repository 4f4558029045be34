//! ABI bindings for the external contracts and the single-call builders.
//!
//! The DAO, governors and EntryPoint are deployed elsewhere; the relayer only
//! encodes calldata for the handful of methods it forwards.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    /// OpenZeppelin-style governor (main DAO and per-asset sub-governors).
    interface IGovernor {
        function castVote(uint256 proposalId, uint8 support) external returns (uint256 balance);
    }

    /// RWA funding DAO.
    interface IRwaDao {
        function finalizeProposal(uint256 proposalId) external;
        function invest(uint256 proposalId, uint256 amount) external;
    }

    /// ERC-4337 v0.6 user operation.
    #[derive(Debug, PartialEq, Eq)]
    struct UserOperation {
        address sender;
        uint256 nonce;
        bytes initCode;
        bytes callData;
        uint256 callGasLimit;
        uint256 verificationGasLimit;
        uint256 preVerificationGas;
        uint256 maxFeePerGas;
        uint256 maxPriorityFeePerGas;
        bytes paymasterAndData;
        bytes signature;
    }

    interface IEntryPoint {
        function handleOps(UserOperation[] ops, address beneficiary) external;
    }
}

/// A single contract call, ready to be signed by the relayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    /// Method name, for logs.
    pub method: &'static str,
}

impl ContractCall {
    fn new(to: Address, method: &'static str, data: Vec<u8>) -> Self {
        Self {
            to,
            data: Bytes::from(data),
            method,
        }
    }

    /// `castVote(proposalId, support)` on a governor.
    pub fn cast_vote(governor: Address, proposal_id: U256, support: u8) -> Self {
        let call = IGovernor::castVoteCall {
            proposalId: proposal_id,
            support,
        };
        Self::new(governor, "castVote", call.abi_encode())
    }

    /// `finalizeProposal(proposalId)` on the DAO.
    pub fn finalize_proposal(dao: Address, proposal_id: U256) -> Self {
        let call = IRwaDao::finalizeProposalCall {
            proposalId: proposal_id,
        };
        Self::new(dao, "finalizeProposal", call.abi_encode())
    }

    /// `invest(proposalId, amount)` on the DAO. Tokens move from the relayer's balance.
    pub fn invest(dao: Address, proposal_id: U256, amount: U256) -> Self {
        let call = IRwaDao::investCall {
            proposalId: proposal_id,
            amount,
        };
        Self::new(dao, "invest", call.abi_encode())
    }

    /// `handleOps([op], beneficiary)` on the EntryPoint.
    pub fn handle_ops(entry_point: Address, op: UserOperation, beneficiary: Address) -> Self {
        let call = IEntryPoint::handleOpsCall {
            ops: vec![op],
            beneficiary,
        };
        Self::new(entry_point, "handleOps", call.abi_encode())
    }

    #[cfg(test)]
    pub(crate) fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}
