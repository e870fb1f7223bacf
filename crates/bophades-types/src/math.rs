//! Checked fixed-point helpers

use crate::error::{Result, TypesError};

/// `10^decimals` as a u128
pub fn scale(decimals: u8) -> Result<u128> {
    10u128
        .checked_pow(u32::from(decimals))
        .ok_or(TypesError::Overflow)
}

/// `a * b / denominator`, rounding down
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(TypesError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(TypesError::Overflow)?;
    Ok(product / denominator)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(TypesError::Underflow)
}

pub fn checked_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(TypesError::Overflow)
}

/// Express a whole-token amount in raw units
pub fn to_raw(whole: u128, decimals: u8) -> Result<u128> {
    whole.checked_mul(scale(decimals)?).ok_or(TypesError::Overflow)
}

/// Render a raw amount with its decimal point, trimming trailing zeros
pub fn format_units(raw: u128, decimals: u8) -> String {
    let Ok(unit) = scale(decimals) else {
        return raw.to_string();
    };
    let whole = raw / unit;
    let frac = raw % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
