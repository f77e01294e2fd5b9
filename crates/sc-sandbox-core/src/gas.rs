//! Gas metering for test invocations.
//!
//! Every executed instruction is charged its cost-table price. Outside test
//! mode the price is multiplied by the transaction's gas price; test
//! invocations are charged the base price and receive [`FREE_GAS`] on top of
//! the fee the caller offers, so the declared gas price and fee never stop a
//! small contract from running.
//!
//! # Cost table
//!
//! | Operation           | Cost (GAS) |
//! |---------------------|------------|
//! | any opcode          | 0.001      |
//! | `Get`               | 0.1        |
//! | `Put` / `Delete`    | 1          |
//! | `CheckWitness`      | 0.2        |
//! | other syscalls      | 0.001      |

use std::fmt;

use sc_sandbox_types::Fixed8;

use crate::vm::interop::Syscall;

/// Free allowance granted to every test invocation.
pub const FREE_GAS: Fixed8 = Fixed8::from_units(10 * 100_000_000);

/// Base price of a plain opcode.
pub const OPCODE_COST: Fixed8 = Fixed8::from_units(100_000);

/// Base price of a syscall, charged instead of [`OPCODE_COST`].
pub fn syscall_cost(syscall: Syscall) -> Fixed8 {
    match syscall {
        Syscall::Get => Fixed8::from_units(10_000_000),
        Syscall::Put | Syscall::Delete => Fixed8::ONE,
        Syscall::CheckWitness => Fixed8::from_units(20_000_000),
        Syscall::GetContext | Syscall::Notify | Syscall::Log | Syscall::GetAttachedGas => {
            OPCODE_COST
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasError {
    /// The charge would exceed the limit.
    OutOfGas { limit: Fixed8, required: Fixed8 },
    /// Arithmetic on the gas counters overflowed.
    Overflow,
}

impl fmt::Display for GasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GasError::OutOfGas { limit, required } => write!(
                f,
                "insufficient GAS: limit {} but at least {} required",
                limit, required
            ),
            GasError::Overflow => write!(f, "GAS accounting overflow"),
        }
    }
}

impl std::error::Error for GasError {}

/// Tracks GAS consumed against a limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    limit: Fixed8,
    price: Fixed8,
    consumed: Fixed8,
}

impl GasMeter {
    /// `price` multiplies every base cost; a zero price makes execution free.
    pub fn new(limit: Fixed8, price: Fixed8) -> Self {
        Self {
            limit,
            price,
            consumed: Fixed8::ZERO,
        }
    }

    /// Limit for a transaction offering `fee`, with the free allowance added
    /// in test mode.
    pub fn limit_for(fee: Fixed8, test_mode: bool, free_gas: Fixed8) -> Fixed8 {
        if test_mode {
            fee.checked_add(free_gas).unwrap_or(Fixed8::from_units(i64::MAX))
        } else {
            fee
        }
    }

    /// Price multiplier for a transaction. Test mode ignores the declared
    /// gas price.
    pub fn price_for(gas_price: Fixed8, test_mode: bool) -> Fixed8 {
        if test_mode {
            Fixed8::ONE
        } else {
            gas_price
        }
    }

    /// Charge `base * price`. The meter is left unchanged on failure.
    pub fn charge(&mut self, base: Fixed8) -> Result<(), GasError> {
        let amount = base.checked_mul(self.price).ok_or(GasError::Overflow)?;
        let total = self
            .consumed
            .checked_add(amount)
            .ok_or(GasError::Overflow)?;
        if total > self.limit {
            return Err(GasError::OutOfGas {
                limit: self.limit,
                required: total,
            });
        }
        self.consumed = total;
        Ok(())
    }

    pub fn consumed(&self) -> Fixed8 {
        self.consumed
    }

    pub fn limit(&self) -> Fixed8 {
        self.limit
    }

    pub fn price(&self) -> Fixed8 {
        self.price
    }

    pub fn remaining(&self) -> Fixed8 {
        self.limit.saturating_sub(self.consumed)
    }
}
