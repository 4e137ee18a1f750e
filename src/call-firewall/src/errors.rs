use alloy_primitives::{Address, Selector, B256, U256};
use thiserror::Error;

/// Errors during invariant program decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),
    #[error("truncated program")]
    Truncated,
    #[error("too many checks")]
    TooManyChecks,
    #[error("invalid check tag")]
    InvalidTag,
}

/// Failures reported by the execution environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("static call to {target} failed")]
    CallFailed { target: Address },
    #[error("malformed return data from {target}")]
    MalformedReturn { target: Address },
    #[error("insufficient balance for {account}")]
    InsufficientBalance { account: Address },
    #[error("invalid signature")]
    InvalidSignature,
}

/// Access violations on administrative operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("AccessControl: account {} is missing role {}", lower_hex(.account), lower_hex(.role))]
    MissingRole { account: Address, role: B256 },
    #[error("AccessControl: can only renounce roles for self")]
    RenounceForOther,
    #[error("Firewall: sender is not the firewall admin")]
    NotFirewallAdmin { consumer: Address, caller: Address },
    #[error("FirewallConsumer: sender is not allowed")]
    SenderNotAllowed,
}

/// Rejections raised by policy hooks and policy administration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("{policy}: call hashes empty")]
    CallHashesEmpty { policy: &'static str },
    #[error("{policy}: invalid call hash")]
    InvalidCallHash { policy: &'static str },
    #[error("{policy}: approval expired")]
    ApprovalExpired { policy: &'static str },
    #[error("{policy}: Unapproved Vector")]
    UnapprovedVector { policy: &'static str },
    #[error("{policy}: signature expired")]
    SignatureExpired { policy: &'static str },
    #[error("{policy}: invalid nonce")]
    InvalidNonce {
        policy: &'static str,
        expected: U256,
        got: U256,
    },
    #[error("{policy}: invalid signer")]
    InvalidSigner { policy: &'static str, signer: Address },
    #[error("AdminCallPolicy: Call not approved")]
    CallNotApproved,
    #[error("AllowlistPolicy: Sender not allowed")]
    SenderNotAllowed { sender: Address },
    #[error("BalanceChangePolicy: Balance change exceeds limit")]
    BalanceChangeExceedsLimit { asset: Address },
    #[error("BalanceChangePolicy: token not tracked")]
    UntrackedAsset { asset: Address },
    #[error("{0}")]
    InvariantViolation(String),
    #[error("PrivateInvariantsPolicy: invariant logic not set")]
    InvariantLogicNotSet,
    #[error("ForbiddenMethodsPolicy: method forbidden")]
    ForbiddenMethod { selector: Selector },
    #[error("NonReentrantPolicy: reentrant call")]
    Reentrant,
    #[error("OnlyEOAPolicy: only EOA")]
    OnlyEoa,
    #[error("{policy}: no snapshot for consumer")]
    MissingSnapshot { policy: &'static str },
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Errors surfaced by the dispatcher and the transaction shim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FirewallError {
    #[error("Firewall: policy not approved")]
    PolicyNotApproved { policy: Address },
    #[error("Firewall: unknown policy")]
    UnknownPolicy { policy: Address },
    #[error("Firewall: policy address already in use")]
    PolicyAddressInUse { policy: Address },
    #[error("Firewall: policy already exists")]
    PolicyAlreadyExists { policy: Address },
    #[error("Firewall: policy not found")]
    PolicyNotFound { policy: Address },
    #[error("Firewall: array length mismatch")]
    LengthMismatch,
    #[error("FirewallConsumer: zero address")]
    ZeroAddress,
    #[error("FirewallConsumer: admin already set")]
    AdminAlreadySet { consumer: Address },
    /// Revert raised by protected business logic rather than by a policy.
    #[error("{0}")]
    Reverted(String),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Host(#[from] HostError),
}

fn lower_hex<T: AsRef<[u8]>>(bytes: &T) -> String {
    format!("0x{}", hex::encode(bytes.as_ref()))
}
