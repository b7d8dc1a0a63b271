//! Single-use pairing codes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, InviteError};

/// Code alphabet without the `0/O` and `1/I` look-alikes. 32 symbols, so
/// the low five bits of a random byte index it without bias.
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const CODE_LENGTH: usize = 6;

/// Days an unused code stays redeemable.
pub const INVITE_TTL_DAYS: i64 = 7;

/// Bounded retries when a freshly generated code collides with a stored one.
pub const MAX_CODE_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCode {
    pub code: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<String>,
}

impl InviteCode {
    /// Build a fresh, unused code issued at `now`.
    pub fn issue(code: String, owner_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            code,
            owner_id: owner_id.to_string(),
            created_at: now,
            expires_at: now + Duration::days(INVITE_TTL_DAYS),
            used_at: None,
            used_by: None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Unused and unexpired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used() && !self.is_expired(now)
    }

    /// Check whether `requester` may redeem this code at `now`.
    ///
    /// Self-redemption is reported before used/expired so an owner typing
    /// their own code always gets the same answer.
    pub fn check_redeemable(&self, requester: &str, now: DateTime<Utc>) -> Result<(), InviteError> {
        if self.owner_id == requester {
            return Err(InviteError::SelfRedemption);
        }
        if self.is_used() {
            return Err(InviteError::AlreadyUsed);
        }
        if self.is_expired(now) {
            return Err(InviteError::Expired);
        }
        Ok(())
    }
}

/// Generate a random code from [`CODE_ALPHABET`].
pub fn generate_code() -> Result<String, Error> {
    let mut bytes = [0u8; CODE_LENGTH];
    getrandom::getrandom(&mut bytes).map_err(Error::store("random source"))?;
    Ok(encode_code(&bytes))
}

fn encode_code(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| CODE_ALPHABET[usize::from(b & 0x1f)] as char)
        .collect()
}

/// Uppercase and trim user input, then reject anything that could never
/// have been issued.
pub fn normalize_code(raw: &str) -> Result<String, InviteError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() != CODE_LENGTH || !code.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
        return Err(InviteError::Malformed);
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_ts;

    fn at(raw: &str) -> DateTime<Utc> {
        parse_ts(raw).unwrap()
    }

    #[test]
    fn alphabet_has_no_ambiguous_glyphs() {
        for ch in [b'0', b'O', b'1', b'I'] {
            assert!(!CODE_ALPHABET.contains(&ch), "{}", ch as char);
        }
        let mut sorted = CODE_ALPHABET.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 32);
    }

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..64 {
            let code = generate_code().unwrap();
            assert_eq!(normalize_code(&code).unwrap(), code);
        }
    }

    #[test]
    fn encode_uses_low_five_bits() {
        assert_eq!(encode_code(&[0, 1, 2, 31, 32, 255]), "ABC9A9");
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_code("  abc23x ").unwrap(), "ABC23X");
        assert_eq!(normalize_code("ABC"), Err(InviteError::Malformed));
        assert_eq!(normalize_code("ABCDE0"), Err(InviteError::Malformed));
        assert_eq!(normalize_code("ABCDEFG"), Err(InviteError::Malformed));
    }

    #[test]
    fn issued_code_expires_after_seven_days() {
        let now = at("2024-05-01 12:00:00");
        let invite = InviteCode::issue("ABCDEF".into(), "owner", now);
        assert_eq!(invite.expires_at, at("2024-05-08 12:00:00"));
        assert!(invite.is_valid(at("2024-05-08 12:00:00")));
        assert!(!invite.is_valid(at("2024-05-08 12:00:01")));
    }

    #[test]
    fn self_redemption_wins_over_other_failures() {
        let now = at("2024-05-01 12:00:00");
        let mut invite = InviteCode::issue("ABCDEF".into(), "owner", now);
        invite.used_at = Some(now);
        let later = now + Duration::days(30);
        assert_eq!(
            invite.check_redeemable("owner", later),
            Err(InviteError::SelfRedemption)
        );
        assert_eq!(
            invite.check_redeemable("partner", later),
            Err(InviteError::AlreadyUsed)
        );
    }

    #[test]
    fn expired_code_reports_expired() {
        let now = at("2024-05-01 12:00:00");
        let invite = InviteCode::issue("ABCDEF".into(), "owner", now);
        assert_eq!(
            invite.check_redeemable("partner", now + Duration::days(8)),
            Err(InviteError::Expired)
        );
        assert_eq!(invite.check_redeemable("partner", now), Ok(()));
    }
}
