// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Display formatting for amounts.

/// Symbols shown as US dollars.
const USD_SYMBOLS: &[&str] = &["USDC", "USD"];

/// Format a decimal string as US dollars: `15231.89` → `$15,231.89`.
///
/// Negative amounts read `$-1,234.50`. Anything that is not a finite number
/// formats as `$0.00`, as do negatives that round to zero.
pub fn format_usd(amount: &str) -> String {
    let value = match amount.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => return "$0.00".to_string(),
    };

    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value.is_sign_negative() && fixed != "0.00" {
        "-"
    } else {
        ""
    };

    format!("${sign}{}.{cents}", group_thousands(whole))
}

/// Dollar formatting for USD tokens, the raw amount for everything else.
pub fn format_token_amount(symbol: &str, amount: &str) -> String {
    if USD_SYMBOLS.iter().any(|s| s.eq_ignore_ascii_case(symbol)) {
        format_usd(amount)
    } else {
        amount.to_string()
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
