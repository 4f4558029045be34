//! Relay request bodies and field validation.
//!
//! Every field is optional at the serde level so a missing field is reported by
//! name (400) rather than as an opaque deserialization failure.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

use crate::contracts::UserOperation;

/// Integer accepted as a JSON number, a decimal string or a `0x` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Numeric(pub U256);

impl<'de> Deserialize<'de> for Numeric {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Ok(Numeric(U256::from(n))),
            Raw::Str(s) => parse_numeric(&s).map(Numeric).map_err(serde::de::Error::custom),
        }
    }
}

fn parse_numeric(s: &str) -> Result<U256, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty numeric string".into());
    }
    U256::from_str(s).map_err(|e| format!("invalid integer {s:?}: {e}"))
}

/// Collects missing field names, then fails once with all of them.
#[derive(Default)]
struct Presence {
    missing: Vec<&'static str>,
}

impl Presence {
    fn take<T>(&mut self, name: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing.push(name);
        }
        value
    }

    fn into_error(self) -> crate::Error {
        crate::Error::Validation(format!(
            "Missing required field(s): {}",
            self.missing.join(", ")
        ))
    }
}

fn vote_support(n: U256) -> Result<u8, crate::Error> {
    match u8::try_from(n) {
        Ok(s @ 0..=2) => Ok(s),
        _ => Err(crate::Error::Validation(format!(
            "support must be 0 (against), 1 (for) or 2 (abstain), got {n}"
        ))),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDaoRequest {
    pub user_address: Option<Address>,
    pub proposal_id: Option<Numeric>,
    pub support: Option<Numeric>,
}

/// Validated main-DAO vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub user: Address,
    pub proposal_id: U256,
    pub support: u8,
}

impl VoteDaoRequest {
    pub fn validate(self) -> Result<Vote, crate::Error> {
        let mut p = Presence::default();
        let user = p.take("userAddress", self.user_address);
        let proposal_id = p.take("proposalId", self.proposal_id);
        let support = p.take("support", self.support);
        let (Some(user), Some(proposal_id), Some(support)) = (user, proposal_id, support) else {
            return Err(p.into_error());
        };

        Ok(Vote {
            user,
            proposal_id: proposal_id.0,
            support: vote_support(support.0)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRwaRequest {
    pub user_address: Option<Address>,
    /// Accepts `governorAddress` too.
    #[serde(alias = "governorAddress")]
    pub rwa_governor_address: Option<Address>,
    pub proposal_id: Option<Numeric>,
    pub support: Option<Numeric>,
}

impl VoteRwaRequest {
    pub fn validate(self) -> Result<(Address, Vote), crate::Error> {
        let mut p = Presence::default();
        let user = p.take("userAddress", self.user_address);
        let governor = p.take("rwaGovernorAddress", self.rwa_governor_address);
        let proposal_id = p.take("proposalId", self.proposal_id);
        let support = p.take("support", self.support);
        let (Some(user), Some(governor), Some(proposal_id), Some(support)) =
            (user, governor, proposal_id, support)
        else {
            return Err(p.into_error());
        };

        if governor == Address::ZERO {
            return Err(crate::Error::Validation(
                "rwaGovernorAddress must not be the zero address".into(),
            ));
        }
        let vote = Vote {
            user,
            proposal_id: proposal_id.0,
            support: vote_support(support.0)?,
        };
        Ok((governor, vote))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub proposal_id: Option<Numeric>,
}

impl FinalizeRequest {
    pub fn validate(self) -> Result<U256, crate::Error> {
        let mut p = Presence::default();
        match p.take("proposalId", self.proposal_id) {
            Some(proposal_id) => Ok(proposal_id.0),
            None => Err(p.into_error()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestRequest {
    pub user_address: Option<Address>,
    pub proposal_id: Option<Numeric>,
    pub amount: Option<Numeric>,
}

/// Validated investment. `amount` is in token base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Investment {
    pub user: Address,
    pub proposal_id: U256,
    pub amount: U256,
}

impl InvestRequest {
    pub fn validate(self) -> Result<Investment, crate::Error> {
        let mut p = Presence::default();
        let user = p.take("userAddress", self.user_address);
        let proposal_id = p.take("proposalId", self.proposal_id);
        let amount = p.take("amount", self.amount);
        let (Some(user), Some(proposal_id), Some(amount)) = (user, proposal_id, amount) else {
            return Err(p.into_error());
        };

        if amount.0.is_zero() {
            return Err(crate::Error::Validation("amount must be greater than zero".into()));
        }
        Ok(Investment {
            user,
            proposal_id: proposal_id.0,
            amount: amount.0,
        })
    }
}

/// `POST /bundler` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlerRequest {
    pub user_op: Option<UserOperationJson>,
}

/// ERC-4337 v0.6 user operation as sent by wallets (camelCase, hex or decimal integers).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationJson {
    pub sender: Address,
    pub nonce: Numeric,
    #[serde(default)]
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: Numeric,
    pub verification_gas_limit: Numeric,
    pub pre_verification_gas: Numeric,
    pub max_fee_per_gas: Numeric,
    pub max_priority_fee_per_gas: Numeric,
    #[serde(default)]
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperationJson {
    pub fn has_paymaster(&self) -> bool {
        !self.paymaster_and_data.is_empty()
    }
}

impl From<UserOperationJson> for UserOperation {
    fn from(op: UserOperationJson) -> Self {
        UserOperation {
            sender: op.sender,
            nonce: op.nonce.0,
            initCode: op.init_code,
            callData: op.call_data,
            callGasLimit: op.call_gas_limit.0,
            verificationGasLimit: op.verification_gas_limit.0,
            preVerificationGas: op.pre_verification_gas.0,
            maxFeePerGas: op.max_fee_per_gas.0,
            maxPriorityFeePerGas: op.max_priority_fee_per_gas.0,
            paymasterAndData: op.paymaster_and_data,
            signature: op.signature,
        }
    }
}

impl BundlerRequest {
    pub fn validate(self) -> Result<UserOperationJson, crate::Error> {
        self.user_op
            .ok_or_else(|| crate::Error::Validation("Missing required field(s): userOp".into()))
    }
}
