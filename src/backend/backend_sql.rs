use std::future::Future;
use std::path::{Path, PathBuf};

use sqlx::{
    migrate::MigrateDatabase, query, query_as, query_scalar, Pool, Sqlite, SqlitePool,
    Transaction,
};

use log::{error, info};

use crate::backend::{FindError, WriteError};
use crate::center::{Center, CenterFields, CenterId, DeletePolicy};
use crate::coach::{Coach, CoachFields, CoachId};
use crate::config::RateLimit;
use crate::leave::{Leave, LeaveFields, LeaveFilter, LeaveId};
use crate::period::PeriodRange;
use crate::record::{MonthlyRecord, RecordFields, RecordId};
use crate::session::Session;
use crate::user::{Role, User, UserId};
use crate::Timestamp;

type Result<T> = std::result::Result<T, ()>;
type WriteResult<T> = std::result::Result<T, WriteError>;

pub struct Backend(pub Pool<Sqlite>);

fn into_sql(path: &Path) -> PathBuf {
    path.join("academy.db")
}

pub async fn init(url: &str) -> std::result::Result<(), sqlx::Error> {
    if !Sqlite::database_exists(url).await? {
        Sqlite::create_database(url).await?;
        info!("Created {url}");
    }
    Ok(())
}

impl Backend {
    pub async fn new(data_dir: &Path) -> std::result::Result<Self, sqlx::Error> {
        let url = format!("sqlite://{}", into_sql(data_dir).display());
        init(&url).await?;
        info!("Using {url}");

        let pool = SqlitePool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self(pool))
    }
}

fn find_err(what: &'static str) -> impl FnOnce(sqlx::Error) -> FindError {
    move |e| {
        if matches!(e, sqlx::Error::RowNotFound) {
            FindError::NotFound
        } else {
            error!("{what}: {e:?}");
            FindError::Internal
        }
    }
}

fn write_err(what: &'static str) -> impl FnOnce(sqlx::Error) -> WriteError {
    move |e| {
        if is_unique_violation(&e) {
            WriteError::Conflict
        } else {
            error!("{what}: {e:?}");
            WriteError::Internal
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = e else {
        return false;
    };

    // SQLITE_CONSTRAINT_UNIQUE, SQLITE_CONSTRAINT_PRIMARYKEY
    matches!(db.code().as_deref(), Some("2067") | Some("1555"))
        || db.message().contains("UNIQUE constraint failed")
}

fn found<T>(rows: u64, value: T) -> WriteResult<T> {
    if rows == 0 {
        Err(WriteError::NotFound)
    } else {
        Ok(value)
    }
}

impl Backend {
    async fn transact<'t, T, R, F>(&self, transaction: T) -> WriteResult<R>
    where
        T: FnOnce(Transaction<'t, Sqlite>) -> F,
        F: Future<Output = WriteResult<(Transaction<'t, Sqlite>, R)>>,
    {
        let tx = self.0.begin().await.map_err(|e| {
            error!("error beginning transaction: {:?}", e);
            WriteError::Internal
        })?;

        // dropping `tx` on the error path rolls back
        let (tx, r) = transaction(tx).await?;

        tx.commit().await.map_err(|e| {
            error!("error committing transaction: {:?}", e);
            WriteError::Internal
        })?;

        Ok(r)
    }
}

impl Backend {
    pub async fn count_users(&self) -> Result<i64> {
        query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.0)
            .await
            .map_err(|e| {
                error!("couldn't count users: {e:?}");
            })
    }

    /// Active users still on a provisional password, like the seeded admin.
    pub async fn users_needing_password_change(&self) -> Result<Vec<String>> {
        query_scalar(
            "
            SELECT username
            FROM users
            WHERE must_change_password = 1
                AND active = 1
            ORDER BY username
            ",
        )
        .fetch_all(&self.0)
        .await
        .map_err(|e| {
            error!("couldn't query users: {e:?}");
        })
    }

    pub async fn find_user(&self, username: &str) -> std::result::Result<User, FindError> {
        query_as(
            "
            SELECT *
            FROM users
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_one(&self.0)
        .await
        .map_err(find_err("find user"))
    }

    pub async fn find_user_by_id(&self, id: UserId) -> std::result::Result<User, FindError> {
        query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.0)
            .await
            .map_err(find_err("find user by id"))
    }

    pub async fn create_user(
        &self,
        username: &str,
        pwhash: &str,
        role: Role,
        must_change_password: bool,
        now: Timestamp,
    ) -> WriteResult<UserId> {
        query(
            "
            INSERT INTO users
            (username, pwhash, role, active, must_change_password, created)
            VALUES
            (?, ?, ?, 1, ?, ?)
            ",
        )
        .bind(username)
        .bind(pwhash)
        .bind(role)
        .bind(must_change_password)
        .bind(now)
        .execute(&self.0)
        .await
        .map(|r| r.last_insert_rowid())
        .map_err(write_err("create user"))
    }

    pub async fn update_password(
        &self,
        id: UserId,
        pwhash: &str,
        must_change_password: bool,
    ) -> WriteResult<()> {
        let r = query("UPDATE users SET pwhash = ?, must_change_password = ? WHERE id = ?")
            .bind(pwhash)
            .bind(must_change_password)
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(write_err("update password"))?;

        found(r.rows_affected(), ())
    }

    pub async fn update_username(&self, id: UserId, username: &str) -> WriteResult<()> {
        let r = query("UPDATE users SET username = ? WHERE id = ?")
            .bind(username)
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(write_err("update username"))?;

        found(r.rows_affected(), ())
    }

    /// Disabling a user also ends their sessions.
    pub async fn set_user_active(&self, username: &str, active: bool) -> WriteResult<()> {
        self.transact(|mut tx| async move {
            let r = query("UPDATE users SET active = ? WHERE username = ?")
                .bind(active)
                .bind(username)
                .execute(&mut *tx)
                .await
                .map_err(write_err("set user active"))?;
            found(r.rows_affected(), ())?;

            if !active {
                query(
                    "
                    DELETE FROM sessions
                    WHERE user_id = (SELECT id FROM users WHERE username = ?)
                    ",
                )
                .bind(username)
                .execute(&mut *tx)
                .await
                .map_err(write_err("drop sessions of disabled user"))?;
            }

            Ok((tx, ()))
        })
        .await
    }
}

impl Backend {
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        query("INSERT INTO sessions (token, user_id, created, expires) VALUES (?, ?, ?, ?)")
            .bind(&session.token)
            .bind(session.user_id)
            .bind(session.created)
            .bind(session.expires)
            .execute(&self.0)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("couldn't create session for user {}: {e:?}", session.user_id);
            })
    }

    pub async fn find_session(&self, token: &str) -> Result<Option<Session>> {
        query_as("SELECT * FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.0)
            .await
            .map_err(|e| {
                error!("couldn't query for session: {e:?}");
            })
    }

    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.0)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(|e| {
                error!("couldn't delete session: {e:?}");
            })
    }

    /// Drops every session of `user_id`, except `keep` if given.
    pub async fn delete_sessions_for_user(&self, user_id: UserId, keep: Option<&str>) -> Result<u64> {
        query("DELETE FROM sessions WHERE user_id = ? AND (? IS NULL OR token <> ?)")
            .bind(user_id)
            .bind(keep)
            .bind(keep)
            .execute(&self.0)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| {
                error!("couldn't delete sessions for user {user_id}: {e:?}");
            })
    }

    pub async fn purge_expired_sessions(&self, now: Timestamp) -> Result<u64> {
        query("DELETE FROM sessions WHERE expires <= ?")
            .bind(now)
            .execute(&self.0)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| {
                error!("couldn't purge sessions: {e:?}");
            })
    }
}

impl Backend {
    /// When `principal` is locked out, until when.
    pub async fn locked_until(&self, principal: &str, now: Timestamp) -> Result<Option<Timestamp>> {
        query_scalar(
            "
            SELECT locked_until
            FROM login_attempts
            WHERE principal = ?
                AND locked_until > ?
            ",
        )
        .bind(principal)
        .bind(now)
        .fetch_optional(&self.0)
        .await
        .map_err(|e| {
            error!("couldn't query login attempts: {e:?}");
        })
    }

    /// Counts a failed login in one statement, so concurrent failures can't be lost.
    pub async fn record_failure(&self, principal: &str, now: Timestamp, limit: &RateLimit) -> Result<()> {
        query(
            "
            INSERT INTO login_attempts
            (principal, failures, window_start, locked_until)
            VALUES
            (?1, 1, ?2, CASE WHEN 1 >= ?3 THEN ?2 + ?5 END)
            ON CONFLICT (principal)
            DO
                UPDATE SET
                    failures = CASE
                        WHEN window_start + ?4 <= ?2 THEN 1
                        ELSE failures + 1
                    END,
                    window_start = CASE
                        WHEN window_start + ?4 <= ?2 THEN ?2
                        ELSE window_start
                    END,
                    locked_until = CASE
                        WHEN (CASE WHEN window_start + ?4 <= ?2 THEN 1 ELSE failures + 1 END) >= ?3
                            THEN ?2 + ?5
                        ELSE locked_until
                    END
            ",
        )
        .bind(principal)
        .bind(now)
        .bind(limit.max_failures)
        .bind(limit.window_secs)
        .bind(limit.lockout_secs)
        .execute(&self.0)
        .await
        .map(|_| ())
        .map_err(|e| {
            error!("couldn't record failed login: {e:?}");
        })
    }

    /// Drops counters whose window has closed and that hold no live lockout.
    pub async fn purge_login_attempts(&self, now: Timestamp, limit: &RateLimit) -> Result<u64> {
        query(
            "
            DELETE FROM login_attempts
            WHERE window_start + ?2 <= ?1
                AND (locked_until IS NULL OR locked_until <= ?1)
            ",
        )
        .bind(now)
        .bind(limit.window_secs)
        .execute(&self.0)
        .await
        .map(|r| r.rows_affected())
        .map_err(|e| {
            error!("couldn't purge login attempts: {e:?}");
        })
    }

    pub async fn clear_failures(&self, principal: &str) -> Result<()> {
        query("DELETE FROM login_attempts WHERE principal = ?")
            .bind(principal)
            .execute(&self.0)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("couldn't clear login attempts: {e:?}");
            })
    }
}

impl Backend {
    pub async fn centers(&self) -> Result<Vec<Center>> {
        query_as("SELECT * FROM centers ORDER BY name, id")
            .fetch_all(&self.0)
            .await
            .map_err(|e| {
                error!("error selecting centers: {e:?}");
            })
    }

    pub async fn find_center(&self, id: CenterId) -> std::result::Result<Center, FindError> {
        query_as("SELECT * FROM centers WHERE id = ?")
            .bind(id)
            .fetch_one(&self.0)
            .await
            .map_err(find_err("find center"))
    }

    pub async fn create_center(&self, fields: &CenterFields) -> WriteResult<Center> {
        let r = query("INSERT INTO centers (name, location) VALUES (?, ?)")
            .bind(&fields.name)
            .bind(&fields.location)
            .execute(&self.0)
            .await
            .map_err(write_err("create center"))?;

        Ok(Center {
            id: r.last_insert_rowid(),
            name: fields.name.clone(),
            location: fields.location.clone(),
        })
    }

    pub async fn update_center(&self, id: CenterId, fields: &CenterFields) -> WriteResult<Center> {
        let r = query("UPDATE centers SET name = ?, location = ? WHERE id = ?")
            .bind(&fields.name)
            .bind(&fields.location)
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(write_err("update center"))?;

        found(
            r.rows_affected(),
            Center {
                id,
                name: fields.name.clone(),
                location: fields.location.clone(),
            },
        )
    }

    pub async fn delete_center(&self, id: CenterId, policy: DeletePolicy) -> WriteResult<()> {
        self.transact(|mut tx| async move {
            center_exists(&mut tx, id).await?;

            if policy == DeletePolicy::Block {
                let dependents: i64 = query_scalar(
                    "
                    SELECT
                        (SELECT COUNT(*) FROM coaches WHERE center_id = ?1)
                        + (SELECT COUNT(*) FROM monthly_records WHERE center_id = ?1)
                    ",
                )
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(write_err("count center dependents"))?;

                if dependents > 0 {
                    return Err(WriteError::HasDependents);
                }
            }

            for statement in [
                "DELETE FROM leaves WHERE coach_id IN (SELECT id FROM coaches WHERE center_id = ?)",
                "DELETE FROM coaches WHERE center_id = ?",
                "DELETE FROM monthly_records WHERE center_id = ?",
                "DELETE FROM centers WHERE id = ?",
            ] {
                query(statement)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(write_err("delete center"))?;
            }

            info!("deleted center {id}");
            Ok((tx, ()))
        })
        .await
    }
}

async fn center_exists(tx: &mut Transaction<'_, Sqlite>, id: CenterId) -> WriteResult<()> {
    let n: i64 = query_scalar("SELECT COUNT(*) FROM centers WHERE id = ?")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(write_err("look up center"))?;

    found(n as u64, ())
}

impl Backend {
    pub async fn coaches(&self, center: Option<CenterId>) -> Result<Vec<Coach>> {
        query_as(
            "
            SELECT *
            FROM coaches
            WHERE ?1 IS NULL OR center_id = ?1
            ORDER BY center_id, name, id
            ",
        )
        .bind(center)
        .fetch_all(&self.0)
        .await
        .map_err(|e| {
            error!("error selecting coaches: {e:?}");
        })
    }

    pub async fn find_coach(&self, id: CoachId) -> std::result::Result<Coach, FindError> {
        query_as("SELECT * FROM coaches WHERE id = ?")
            .bind(id)
            .fetch_one(&self.0)
            .await
            .map_err(find_err("find coach"))
    }

    pub async fn create_coach(&self, center_id: CenterId, fields: &CoachFields) -> WriteResult<Coach> {
        self.transact(|mut tx| async move {
            center_exists(&mut tx, center_id).await?;

            let r = query(
                "
                INSERT INTO coaches
                (center_id, name, monthly_salary, start_date, active)
                VALUES
                (?, ?, ?, ?, ?)
                ",
            )
            .bind(center_id)
            .bind(&fields.name)
            .bind(fields.monthly_salary)
            .bind(fields.start_date)
            .bind(fields.active)
            .execute(&mut *tx)
            .await
            .map_err(write_err("create coach"))?;

            let coach = Coach {
                id: r.last_insert_rowid(),
                center_id,
                name: fields.name.clone(),
                monthly_salary: fields.monthly_salary,
                start_date: fields.start_date,
                active: fields.active,
            };
            Ok((tx, coach))
        })
        .await
    }

    pub async fn update_coach(&self, id: CoachId, fields: &CoachFields) -> WriteResult<Coach> {
        self.transact(|mut tx| async move {
            let current: Coach = query_as("SELECT * FROM coaches WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(write_err("find coach"))?
                .ok_or(WriteError::NotFound)?;

            let center_id = fields.center_id.unwrap_or(current.center_id);
            center_exists(&mut tx, center_id).await?;

            query(
                "
                UPDATE coaches
                SET center_id = ?, name = ?, monthly_salary = ?, start_date = ?, active = ?
                WHERE id = ?
                ",
            )
            .bind(center_id)
            .bind(&fields.name)
            .bind(fields.monthly_salary)
            .bind(fields.start_date)
            .bind(fields.active)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(write_err("update coach"))?;

            let coach = Coach {
                id,
                center_id,
                name: fields.name.clone(),
                monthly_salary: fields.monthly_salary,
                start_date: fields.start_date,
                active: fields.active,
            };
            Ok((tx, coach))
        })
        .await
    }

    /// Removes the coach and their leaves.
    pub async fn delete_coach(&self, id: CoachId) -> WriteResult<()> {
        self.transact(|mut tx| async move {
            query("DELETE FROM leaves WHERE coach_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(write_err("delete coach leaves"))?;

            let r = query("DELETE FROM coaches WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(write_err("delete coach"))?;

            found(r.rows_affected(), ())?;
            Ok((tx, ()))
        })
        .await
    }
}

impl Backend {
    /// Records of one or all centers within `range`, oldest first.
    pub async fn records(&self, center: Option<CenterId>, range: PeriodRange) -> Result<Vec<MonthlyRecord>> {
        let (lo, hi) = range.ordinals();

        query_as(
            "
            SELECT *
            FROM monthly_records
            WHERE (?1 IS NULL OR center_id = ?1)
                AND year * 12 + month - 1 BETWEEN ?2 AND ?3
            ORDER BY year, month, center_id
            ",
        )
        .bind(center)
        .bind(lo)
        .bind(hi)
        .fetch_all(&self.0)
        .await
        .map_err(|e| {
            error!("error selecting monthly records: {e:?}");
        })
    }

    pub async fn find_record(&self, id: RecordId) -> std::result::Result<MonthlyRecord, FindError> {
        query_as("SELECT * FROM monthly_records WHERE id = ?")
            .bind(id)
            .fetch_one(&self.0)
            .await
            .map_err(find_err("find monthly record"))
    }

    /// `Conflict` if the center already has a record for the period.
    pub async fn create_record(&self, center_id: CenterId, fields: &RecordFields) -> WriteResult<MonthlyRecord> {
        self.transact(|mut tx| async move {
            center_exists(&mut tx, center_id).await?;

            let r = query(
                "
                INSERT INTO monthly_records
                (center_id, year, month, revenue, total_salary)
                VALUES
                (?, ?, ?, ?, ?)
                ",
            )
            .bind(center_id)
            .bind(fields.period.year)
            .bind(fields.period.month as i32)
            .bind(fields.revenue)
            .bind(fields.total_salary)
            .execute(&mut *tx)
            .await
            .map_err(write_err("create monthly record"))?;

            let record = MonthlyRecord {
                id: r.last_insert_rowid(),
                center_id,
                year: fields.period.year,
                month: fields.period.month as i32,
                revenue: fields.revenue,
                total_salary: fields.total_salary,
            };
            Ok((tx, record))
        })
        .await
    }

    pub async fn update_record(&self, id: RecordId, fields: &RecordFields) -> WriteResult<MonthlyRecord> {
        self.transact(|mut tx| async move {
            let r = query(
                "
                UPDATE monthly_records
                SET year = ?, month = ?, revenue = ?, total_salary = ?
                WHERE id = ?
                ",
            )
            .bind(fields.period.year)
            .bind(fields.period.month as i32)
            .bind(fields.revenue)
            .bind(fields.total_salary)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(write_err("update monthly record"))?;
            found(r.rows_affected(), ())?;

            let record: MonthlyRecord = query_as("SELECT * FROM monthly_records WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(write_err("reread monthly record"))?;
            Ok((tx, record))
        })
        .await
    }

    pub async fn delete_record(&self, id: RecordId) -> WriteResult<()> {
        let r = query("DELETE FROM monthly_records WHERE id = ?")
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(write_err("delete monthly record"))?;

        found(r.rows_affected(), ())
    }
}

impl Backend {
    pub async fn leaves(&self, coach: Option<CoachId>) -> Result<Vec<Leave>> {
        query_as(
            "
            SELECT *
            FROM leaves
            WHERE ?1 IS NULL OR coach_id = ?1
            ORDER BY from_date DESC, id
            ",
        )
        .bind(coach)
        .fetch_all(&self.0)
        .await
        .map_err(|e| {
            error!("error selecting leaves: {e:?}");
        })
    }

    /// Leaves starting in the filter's year (and month), newest first.
    pub async fn leaves_matching(&self, filter: &LeaveFilter) -> Result<Vec<Leave>> {
        query_as(
            "
            SELECT leaves.*
            FROM leaves
            JOIN coaches ON coaches.id = leaves.coach_id
            WHERE CAST(strftime('%Y', leaves.from_date) AS INTEGER) = ?1
                AND (?2 IS NULL OR CAST(strftime('%m', leaves.from_date) AS INTEGER) = ?2)
                AND (?3 IS NULL OR coaches.center_id = ?3)
                AND (?4 IS NULL OR leaves.coach_id = ?4)
            ORDER BY leaves.from_date DESC, leaves.id
            ",
        )
        .bind(filter.year)
        .bind(filter.month.map(i64::from))
        .bind(filter.center)
        .bind(filter.coach)
        .fetch_all(&self.0)
        .await
        .map_err(|e| {
            error!("error selecting leaves: {e:?}");
        })
    }

    pub async fn find_leave(&self, id: LeaveId) -> std::result::Result<Leave, FindError> {
        query_as("SELECT * FROM leaves WHERE id = ?")
            .bind(id)
            .fetch_one(&self.0)
            .await
            .map_err(find_err("find leave"))
    }

    pub async fn create_leave(&self, coach_id: CoachId, fields: &LeaveFields) -> WriteResult<Leave> {
        self.transact(|mut tx| async move {
            coach_exists(&mut tx, coach_id).await?;

            let r = query(
                "
                INSERT INTO leaves
                (coach_id, from_date, to_date, kind, remarks)
                VALUES
                (?, ?, ?, ?, ?)
                ",
            )
            .bind(coach_id)
            .bind(fields.from_date)
            .bind(fields.to_date)
            .bind(fields.kind)
            .bind(&fields.remarks)
            .execute(&mut *tx)
            .await
            .map_err(write_err("create leave"))?;

            let leave = Leave {
                id: r.last_insert_rowid(),
                coach_id,
                from_date: fields.from_date,
                to_date: fields.to_date,
                kind: fields.kind,
                remarks: fields.remarks.clone(),
            };
            Ok((tx, leave))
        })
        .await
    }

    pub async fn update_leave(&self, id: LeaveId, fields: &LeaveFields) -> WriteResult<Leave> {
        self.transact(|mut tx| async move {
            let current: Leave = query_as("SELECT * FROM leaves WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(write_err("find leave"))?
                .ok_or(WriteError::NotFound)?;

            let coach_id = fields.coach_id.unwrap_or(current.coach_id);
            coach_exists(&mut tx, coach_id).await?;

            query(
                "
                UPDATE leaves
                SET coach_id = ?, from_date = ?, to_date = ?, kind = ?, remarks = ?
                WHERE id = ?
                ",
            )
            .bind(coach_id)
            .bind(fields.from_date)
            .bind(fields.to_date)
            .bind(fields.kind)
            .bind(&fields.remarks)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(write_err("update leave"))?;

            let leave = Leave {
                id,
                coach_id,
                from_date: fields.from_date,
                to_date: fields.to_date,
                kind: fields.kind,
                remarks: fields.remarks.clone(),
            };
            Ok((tx, leave))
        })
        .await
    }

    pub async fn delete_leave(&self, id: LeaveId) -> WriteResult<()> {
        let r = query("DELETE FROM leaves WHERE id = ?")
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(write_err("delete leave"))?;

        found(r.rows_affected(), ())
    }
}

async fn coach_exists(tx: &mut Transaction<'_, Sqlite>, id: CoachId) -> WriteResult<()> {
    let n: i64 = query_scalar("SELECT COUNT(*) FROM coaches WHERE id = ?")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(write_err("look up coach"))?;

    found(n as u64, ())
}
