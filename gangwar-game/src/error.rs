//! Error taxonomy for engine operations.
use thiserror::Error;

use crate::collab::WalletError;
use crate::cooldown::Action;
use crate::personnel::UnitKind;
use crate::state::{MemberId, MemberStatus, Role};
use crate::store::StoreError;
use crate::tools::ToolKind;

/// A rule that blocked an operation before anything was mutated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Precondition {
    #[error("actor is not in a gang")]
    NotInGang,
    #[error("actor already belongs to a gang")]
    AlreadyInGang,
    #[error("requires the {0} role")]
    MissingRole(Role),
    #[error("actor is kidnapped")]
    Kidnapped,
    #[error("actor must be outside the base")]
    MustBeOutside,
    #[error("actor is already {0}")]
    AlreadyThere(MemberStatus),
    #[error("unknown identity {0}")]
    UnknownIdentity(MemberId),
    #[error("no such gang")]
    UnknownGang,
    #[error("gang name already taken")]
    NameTaken,
    #[error("gang name must be 3 to 24 printable characters")]
    InvalidName,
    #[error("cannot target your own gang")]
    OwnGang,
    #[error("cannot target yourself")]
    SelfTarget,
    #[error("target is already kidnapped")]
    TargetKidnapped,
    #[error("target is inside their base")]
    TargetAtBase,
    #[error("gang is closed to new members")]
    Closed,
    #[error("level {have} is below the required {need}")]
    LevelTooLow { have: u32, need: u32 },
    #[error("actor is banned from this gang")]
    Banned,
    #[error("identity is not a member of this gang")]
    NotMember,
    #[error("the leader must transfer leadership or disband")]
    LeaderMustStay,
    #[error("actor is not kidnapped")]
    NotKidnapped,
    #[error("an escort is already hired")]
    EscortActive,
    #[error("amount must be positive")]
    NonPositiveAmount,
}

/// A resource the operation needed but did not have.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Shortfall {
    #[error("pocket holds {have}, needs {need}")]
    Pocket { have: i64, need: i64 },
    #[error("vault holds {have}, needs {need}")]
    Vault { have: i64, need: i64 },
    #[error("vault is full")]
    VaultFull,
    #[error("{kind} roster is at its cap of {cap}")]
    RosterFull { kind: UnitKind, cap: usize },
    #[error("no {0} units hired")]
    NoUnits(UnitKind),
    #[error("{0} is at max level")]
    MaxLevel(String),
    #[error("{0} is already owned")]
    ToolOwned(ToolKind),
    #[error("{0} stack is full")]
    StackFull(ToolKind),
    #[error("base is at full health")]
    FullHealth,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GangError {
    #[error("precondition failed: {0}")]
    PreconditionFailed(#[from] Precondition),
    #[error("{action} on cooldown for {remaining_secs}s")]
    CooldownActive { action: Action, remaining_secs: i64 },
    #[error("insufficient resource: {0}")]
    InsufficientResource(#[from] Shortfall),
    #[error("write conflict on {key} after {attempts} attempts")]
    ConcurrencyConflict { key: String, attempts: u32 },
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("wallet failure: {0}")]
    Wallet(String),
    /// Records committed but a pocket movement around them could not be
    /// completed or undone; `amount` is owed to `actor`.
    #[error("{amount} owed to {actor} was not settled: {reason}")]
    Unsettled {
        actor: MemberId,
        amount: i64,
        reason: String,
    },
}

impl GangError {
    /// Only write conflicts are worth an immediate retry. Cooldowns are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl From<StoreError> for GangError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<WalletError> for GangError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Insufficient { have, need } => {
                Self::InsufficientResource(Shortfall::Pocket { have, need })
            }
            WalletError::Backend(msg) => Self::Wallet(msg),
        }
    }
}

pub type GangResult<T> = Result<T, GangError>;
