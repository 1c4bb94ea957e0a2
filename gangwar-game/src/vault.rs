//! Capacity-bounded gang treasury.
//!
//! Credits clamp to free capacity and report what actually landed; debits
//! require funds. Transfers debit the source only what the destination took.
use serde::{Deserialize, Serialize};

use crate::error::Shortfall;

/// Room left before the vault hits `capacity`.
#[must_use]
pub fn free_capacity(balance: i64, capacity: i64) -> i64 {
    capacity.saturating_sub(balance).max(0)
}

/// Add up to `amount`, returning the credited portion. Excess is dropped.
pub fn credit(balance: &mut i64, capacity: i64, amount: i64) -> i64 {
    let credited = amount.max(0).min(free_capacity(*balance, capacity));
    *balance += credited;
    credited
}

/// # Errors
///
/// Returns [`Shortfall::Vault`] when `amount` exceeds the balance.
pub fn debit(balance: &mut i64, amount: i64) -> Result<(), Shortfall> {
    let amount = amount.max(0);
    if amount > *balance {
        return Err(Shortfall::Vault {
            have: *balance,
            need: amount,
        });
    }
    *balance -= amount;
    Ok(())
}

/// Outcome of a paired vault movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub requested: i64,
    pub credited: i64,
}

/// Endpoint of a transfer: a balance and the capacity bounding it.
#[derive(Debug)]
pub struct Account<'a> {
    pub balance: &'a mut i64,
    pub capacity: i64,
}

/// Move up to `amount` from `from` into `to`. The request is first capped by
/// the source balance, then by the destination's free capacity.
pub fn transfer(from: Account<'_>, to: Account<'_>, amount: i64) -> Transfer {
    let requested = amount.max(0).min(*from.balance);
    let credited = credit(to.balance, to.capacity, requested);
    *from.balance -= credited;
    Transfer {
        requested,
        credited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_clamps_to_capacity() {
        let mut vault = 9_500;
        assert_eq!(credit(&mut vault, 10_000, 2_000), 500);
        assert_eq!(vault, 10_000);
    }

    #[test]
    fn credit_to_full_vault_is_noop() {
        let mut vault = 10_000;
        assert_eq!(credit(&mut vault, 10_000, 750), 0);
        assert_eq!(vault, 10_000);
        assert_eq!(credit(&mut vault, 10_000, -5), 0);
    }

    #[test]
    fn debit_requires_funds() {
        let mut vault = 100;
        assert_eq!(
            debit(&mut vault, 150),
            Err(Shortfall::Vault {
                have: 100,
                need: 150
            })
        );
        assert_eq!(vault, 100);
        assert_eq!(debit(&mut vault, 100), Ok(()));
        assert_eq!(vault, 0);
    }

    #[test]
    fn transfer_debits_only_what_lands() {
        let mut source = 5_000;
        let mut dest = 9_000;
        let moved = transfer(
            Account {
                balance: &mut source,
                capacity: 25_000,
            },
            Account {
                balance: &mut dest,
                capacity: 10_000,
            },
            3_000,
        );
        assert_eq!(moved.requested, 3_000);
        assert_eq!(moved.credited, 1_000);
        assert_eq!(source, 4_000);
        assert_eq!(dest, 10_000);
    }

    #[test]
    fn transfer_caps_at_source_balance() {
        let mut source = 200;
        let mut dest = 0;
        let moved = transfer(
            Account {
                balance: &mut source,
                capacity: 10_000,
            },
            Account {
                balance: &mut dest,
                capacity: 10_000,
            },
            1_500,
        );
        assert_eq!(moved.credited, 200);
        assert_eq!(source, 0);
        assert_eq!(dest, 200);
    }
}
