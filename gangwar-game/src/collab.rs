//! Seams to the host platform: personal wallets and the player directory.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::state::MemberId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("balance {have} below {need}")]
    Insufficient { have: i64, need: i64 },
    #[error("wallet backend: {0}")]
    Backend(String),
}

/// Spendable pocket balances held outside the gang records.
pub trait Wallet: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn balance(&self, actor: &MemberId) -> Result<i64, WalletError>;

    /// # Errors
    ///
    /// Returns [`WalletError::Insufficient`] when the balance is too low.
    fn debit(&self, actor: &MemberId, amount: i64) -> Result<(), WalletError>;

    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn credit(&self, actor: &MemberId, amount: i64) -> Result<(), WalletError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub level: u32,
}

/// Known player identities.
pub trait Directory: Send + Sync {
    fn profile(&self, actor: &MemberId) -> Option<Profile>;
}

impl<W: Wallet + ?Sized> Wallet for Arc<W> {
    fn balance(&self, actor: &MemberId) -> Result<i64, WalletError> {
        (**self).balance(actor)
    }

    fn debit(&self, actor: &MemberId, amount: i64) -> Result<(), WalletError> {
        (**self).debit(actor, amount)
    }

    fn credit(&self, actor: &MemberId, amount: i64) -> Result<(), WalletError> {
        (**self).credit(actor, amount)
    }
}

impl<D: Directory + ?Sized> Directory for Arc<D> {
    fn profile(&self, actor: &MemberId) -> Option<Profile> {
        (**self).profile(actor)
    }
}

/// In-process wallet; unknown actors hold zero.
#[derive(Debug, Default)]
pub struct MemoryWallet {
    balances: Mutex<HashMap<MemberId, i64>>,
}

impl MemoryWallet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, actor: &MemberId, amount: i64) {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(actor.clone(), amount);
    }

    /// Sum of every balance, for conservation checks.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl Wallet for MemoryWallet {
    fn balance(&self, actor: &MemberId) -> Result<i64, WalletError> {
        let balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(balances.get(actor).copied().unwrap_or(0))
    }

    fn debit(&self, actor: &MemberId, amount: i64) -> Result<(), WalletError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = balances.entry(actor.clone()).or_insert(0);
        if *balance < amount {
            return Err(WalletError::Insufficient {
                have: *balance,
                need: amount,
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn credit(&self, actor: &MemberId, amount: i64) -> Result<(), WalletError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = balances.entry(actor.clone()).or_insert(0);
        *balance = balance.saturating_add(amount);
        Ok(())
    }
}

/// In-process directory of registered players.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    profiles: Mutex<HashMap<MemberId, Profile>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, actor: &MemberId, level: u32) {
        self.profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(actor.clone(), Profile { level });
    }
}

impl Directory for MemoryDirectory {
    fn profile(&self, actor: &MemberId) -> Option<Profile> {
        self.profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(actor)
            .copied()
    }
}
