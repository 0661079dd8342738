//! Purchase memos on incoming funds transfers.
//!
//! A transfer to the contract buys tokens when its memo reads
//! `<count>,<seed>`. Empty segments are ignored, so `"3,,seed"` is accepted.

use drops_core::{DropsError, Result};

/// Parsed purchase order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueMemo {
    /// Tokens to mint
    pub count: u32,
    /// Seed the token ids are derived from
    pub seed: String,
}

/// Parse a `<count>,<seed>` memo.
pub fn parse_issue_memo(memo: &str) -> Result<IssueMemo> {
    if memo.is_empty() {
        return Err(DropsError::invalid(
            "A memo is required to send tokens to this contract",
        ));
    }

    let parts: Vec<&str> = memo.split(',').filter(|part| !part.is_empty()).collect();
    let [count, seed] = parts.as_slice() else {
        return Err(DropsError::invalid(
            "Memo data must contain 2 values, separated by a comma: amount,seed",
        ));
    };

    let count: u32 = count.trim().parse().map_err(|_| {
        DropsError::invalid("The amount of tokens to generate must be a positive value")
    })?;
    if count == 0 {
        return Err(DropsError::invalid(
            "The amount of tokens to generate must be a positive value",
        ));
    }

    Ok(IssueMemo {
        count,
        seed: (*seed).to_string(),
    })
}
