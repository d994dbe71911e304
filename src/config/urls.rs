//! Service URLs

/// Firmware key proxy queried for loader decryption keys
pub const KEY_SERVICE: &str = "https://api.m1sta.xyz/wikiproxy";
