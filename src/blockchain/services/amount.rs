// src/blockchain/services/amount.rs

use rust_decimal::Decimal;

use crate::blockchain::models::{LedgerError, LedgerResult};

/// Largest number of decimal places a ledger token may declare.
pub const MAX_DECIMALS: u32 = 18;

pub const HBAR_DECIMALS: u32 = 8;

fn check_decimals(decimals: u32) -> LedgerResult<()> {
    if decimals > MAX_DECIMALS {
        return Err(LedgerError::Validation(format!(
            "Decimals must be between 0 and {}, got {}",
            MAX_DECIMALS, decimals
        )));
    }
    Ok(())
}

/// Scales a display amount to integer base units: `round(amount × 10^decimals)`.
///
/// Works on the decimal's integer mantissa, so nothing is rounded before the
/// final half-away-from-zero step. Fails if the result leaves the signed
/// 64-bit range the ledger stores amounts in.
pub fn to_base_units(amount: Decimal, decimals: u32) -> LedgerResult<i64> {
    check_decimals(decimals)?;
    let overflow = || {
        LedgerError::Validation(format!(
            "Amount {} with {} decimals exceeds the ledger's base-unit range",
            amount, decimals
        ))
    };

    let mantissa = amount.mantissa();
    let scale = amount.scale();
    let units = if decimals >= scale {
        // at most 10^18, and the mantissa is below 2^96
        mantissa
            .checked_mul(10i128.pow(decimals - scale))
            .ok_or_else(overflow)?
    } else {
        // scale is at most 28, so the divisor fits
        let divisor = 10i128.pow(scale - decimals);
        let quotient = mantissa / divisor;
        let remainder = (mantissa % divisor).abs();
        if remainder * 2 >= divisor {
            quotient + mantissa.signum()
        } else {
            quotient
        }
    };
    i64::try_from(units).map_err(|_| overflow())
}

/// Inverse of [`to_base_units`]; always exact.
pub fn to_display_units(base_units: i64, decimals: u32) -> LedgerResult<Decimal> {
    check_decimals(decimals)?;
    Ok(Decimal::from_i128_with_scale(base_units as i128, decimals))
}

pub fn hbar_to_tinybars(hbar: Decimal) -> LedgerResult<i64> {
    to_base_units(hbar, HBAR_DECIMALS)
}
