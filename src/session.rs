use crate::auth::SessionId;
use crate::time::Timestamp;
use crate::user::UserId;

/// A logged in user's session, looked up by its token on every request.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created: Timestamp,
    pub expires: Timestamp,
}

impl Session {
    pub fn new(user_id: UserId, now: Timestamp, lifetime_secs: i64) -> (SessionId, Self) {
        let id = SessionId::new();
        let session = Self {
            token: id.to_string(),
            user_id,
            created: now,
            expires: now.plus_secs(lifetime_secs),
        };
        (id, session)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.created.secs_until(self.expires)
    }
}
