//! Invite issuance, dry-run verification and atomic redemption.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::Connection;
use tethered_api::db::{connections, invite_codes, streaks, users};
use tethered_core::invite::{MAX_CODE_ATTEMPTS, generate_code, normalize_code};
use tethered_core::time::format_ts;
use tethered_core::{
    DayClock, Error, FamilyConnection, InviteCode, InviteError, Result, Streak, UserSummary,
};

use crate::db::{
    Db, invite_from_row, is_unique_violation, sq_execute, sq_query_row, user_from_row,
};
use crate::streaks::{load_streak, try_advance};

/// A successful redemption: the new connection seen from the redeemer's side.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub connection: FamilyConnection,
    pub partner: UserSummary,
    pub streak: Streak,
}

#[derive(Clone)]
pub struct InviteService {
    db: Db,
    clock: DayClock,
    pairing_counts: bool,
}

fn load_invite(conn: &Connection, code: &str) -> Result<Option<InviteCode>> {
    sq_query_row(conn, invite_codes::get(code), invite_from_row).map_err(Error::store("get invite"))
}

fn load_user(conn: &Connection, user_id: &str) -> Result<Option<UserSummary>> {
    sq_query_row(conn, users::get_by_id(user_id), user_from_row).map_err(Error::store("get user"))
}

fn is_connected(conn: &Connection, user_id: &str) -> Result<bool> {
    sq_query_row(conn, connections::is_member(user_id), |row| row.get::<_, String>(0))
        .map(|found| found.is_some())
        .map_err(Error::store("check membership"))
}

/// Look the code up and run every redeemability check.
fn check_code(conn: &Connection, raw: &str, requester: &str, now: DateTime<Utc>) -> Result<InviteCode> {
    // Input that could never have been issued names no code at all.
    let code = normalize_code(raw).map_err(|_| InviteError::NotFound)?;
    let invite = load_invite(conn, &code)?.ok_or(InviteError::NotFound)?;
    invite.check_redeemable(requester, now)?;
    Ok(invite)
}

impl InviteService {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            clock: DayClock::utc(),
            pairing_counts: true,
        }
    }

    pub fn with_clock(mut self, clock: DayClock) -> Self {
        self.clock = clock;
        self
    }

    /// Whether redeeming a code also counts as the first interaction of the day.
    pub fn pairing_counts_as_interaction(mut self, counts: bool) -> Self {
        self.pairing_counts = counts;
        self
    }

    /// Return the owner's valid code, minting one only if none exists.
    pub fn request_code(&self, owner_id: &str, now: DateTime<Utc>) -> Result<InviteCode> {
        let now = now.trunc_subsecs(0);
        let now_ts = format_ts(now);
        self.db.write(|tx| {
            if let Some(existing) = sq_query_row(
                tx,
                invite_codes::find_active_for_owner(owner_id, &now_ts),
                invite_from_row,
            )
            .map_err(Error::store("find active invite"))?
            {
                return Ok(existing);
            }

            for attempt in 1..=MAX_CODE_ATTEMPTS {
                let invite = InviteCode::issue(generate_code()?, owner_id, now);
                let inserted = sq_execute(
                    tx,
                    invite_codes::insert(
                        &invite.code,
                        owner_id,
                        &now_ts,
                        &format_ts(invite.expires_at),
                    ),
                );
                match inserted {
                    Ok(_) => {
                        tracing::info!(owner_id, code = %invite.code, "issued invite code");
                        return Ok(invite);
                    }
                    Err(e) if is_unique_violation(&e) => {
                        tracing::debug!(attempt, "invite code collision, regenerating");
                    }
                    Err(e) => return Err(Error::store("insert invite")(e)),
                }
            }
            tracing::error!(owner_id, "invite code space exhausted");
            Err(Error::CodeSpaceExhausted {
                attempts: MAX_CODE_ATTEMPTS,
            })
        })
    }

    /// Read-only check of a code on behalf of `requester`. Returns the
    /// owner's public profile when the code could be redeemed right now.
    pub fn verify_code(&self, raw: &str, requester: &str, now: DateTime<Utc>) -> Result<UserSummary> {
        let conn = self.db.conn();
        let invite = check_code(&conn, raw, requester, now)?;
        load_user(&conn, &invite.owner_id)?.ok_or_else(|| InviteError::NotFound.into())
    }

    /// Consume the code and pair its owner with `requester`.
    ///
    /// Code consumption, connection creation and streak initialisation
    /// commit together or not at all. Validity is re-checked by the
    /// conditional update itself, so of two concurrent redeemers exactly
    /// one wins and the other sees `AlreadyUsed`.
    pub fn redeem_code(&self, raw: &str, requester: &str, now: DateTime<Utc>) -> Result<Redemption> {
        let now = now.trunc_subsecs(0);
        let now_ts = format_ts(now);
        let today = self.clock.today(now);

        let redemption = self.db.write(|tx| {
            let invite = check_code(tx, raw, requester, now)?;

            let claimed = sq_execute(tx, invite_codes::mark_used(&invite.code, requester, &now_ts))
                .map_err(Error::store("consume invite"))?;
            if claimed == 0 {
                // Lost a race since the read above: report what the row says now.
                check_code(tx, raw, requester, now)?;
                return Err(InviteError::AlreadyUsed.into());
            }

            let partner = load_user(tx, &invite.owner_id)?.ok_or(InviteError::NotFound)?;
            if is_connected(tx, requester)? || is_connected(tx, &invite.owner_id)? {
                return Err(Error::AlreadyConnected);
            }

            let connection = FamilyConnection {
                id: uuid::Uuid::new_v4().to_string(),
                party_a: invite.owner_id.clone(),
                party_b: requester.to_string(),
                connected_at: now,
            };
            sq_execute(
                tx,
                connections::insert(&connection.id, &connection.party_a, &connection.party_b, &now_ts),
            )
            .map_err(Error::store("insert connection"))?;
            for party in connection.parties() {
                sq_execute(tx, connections::insert_member(party, &connection.id)).map_err(|e| {
                    if is_unique_violation(&e) {
                        Error::AlreadyConnected
                    } else {
                        Error::store("insert member")(e)
                    }
                })?;
            }
            sq_execute(tx, streaks::insert_zeroed(&connection.id, &now_ts))
                .map_err(Error::store("insert streak"))?;

            let streak = if self.pairing_counts {
                try_advance(tx, &connection.id, today, now)?
                    .map(|(streak, _)| streak)
                    .ok_or_else(|| Error::Store("fresh streak changed during redemption".into()))?
            } else {
                load_streak(tx, &connection.id)?.ok_or(Error::NotFound("streak"))?
            };

            Ok(Redemption {
                connection,
                partner,
                streak,
            })
        });

        match &redemption {
            Ok(r) => tracing::info!(
                connection_id = %r.connection.id,
                requester,
                "invite redeemed, connection created"
            ),
            Err(e) => tracing::debug!(requester, error = %e, "invite redemption refused"),
        }
        redemption
    }
}
