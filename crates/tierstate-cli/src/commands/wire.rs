//! Wire value lookups

use anyhow::Result;
use tierstate_core::TierMode;

/// Name of the mode a wire integer decodes to
pub fn decode(value: i32) -> Result<&'static str> {
    Ok(TierMode::try_decode(value)?.as_str())
}

/// Wire integer of a mode
pub fn encode(mode: TierMode) -> i32 {
    mode.encode()
}
