use std::{fmt, net::IpAddr, result, sync::Arc};

use log::{debug, error, info, trace, warn};
use warp::http;

use crate::analytics::{self, Summary, YearReport};
use crate::auth::{hash_password, verify_password, verify_unknown_user, AuthAttempt, SessionId};
use crate::backend::{Backend, FindError, WriteError};
use crate::center::{Center, CenterFields, CenterId, CenterInput};
use crate::coach::{Coach, CoachFields, CoachId, CoachInput, Payroll};
use crate::config::Config;
use crate::leave::{self, Leave, LeaveFields, LeaveFilter, LeaveId, LeaveInput, LeaveReport};
use crate::period::{PeriodRange, MAX_YEAR, MIN_YEAR};
use crate::record::{MonthlyRecord, RecordFields, RecordId, RecordInput};
use crate::session::Session;
use crate::user::{NewUser, PasswordChange, Role, User, UserInfo, UsernameChange};
use crate::time::Timestamp;
use crate::validate;

pub const DEFAULT_ADMIN: &str = "admin";

pub struct Academy {
    backend: Backend,
    config: Config,
}

/// A request whose session checked out.
pub struct AcademyAuthed {
    academy: Arc<Academy>,
    session: Session,
    user: User,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    Internal,
    BadRequest,
    NotFound,
    Forbidden,
    Conflict,
    InvalidCredentials,
    RateLimited,
    SessionExpired,
    SessionNotFound,
    DuplicatePeriod,
    HasDependents,
    Validation(&'static str),
}

pub type Result<T> = result::Result<T, Error>;

impl Into<http::StatusCode> for Error {
    fn into(self) -> http::StatusCode {
        match self {
            Self::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest => http::StatusCode::BAD_REQUEST,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::Forbidden => http::StatusCode::FORBIDDEN,
            Self::InvalidCredentials | Self::SessionExpired | Self::SessionNotFound => {
                http::StatusCode::UNAUTHORIZED
            }
            Self::RateLimited => http::StatusCode::TOO_MANY_REQUESTS,
            Self::Conflict | Self::DuplicatePeriod | Self::HasDependents => {
                http::StatusCode::CONFLICT
            }
            Self::Validation(_) => http::StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => write!(f, "something went wrong, please try again"),
            Self::BadRequest => write!(f, "bad request"),
            Self::NotFound => write!(f, "not found"),
            Self::Forbidden => write!(f, "not allowed"),
            Self::Conflict => write!(f, "already exists"),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::RateLimited => write!(f, "too many attempts, please wait and try again"),
            Self::SessionExpired => write!(f, "session expired, please log in again"),
            Self::SessionNotFound => write!(f, "not logged in"),
            Self::DuplicatePeriod => write!(f, "a record for this month already exists"),
            Self::HasDependents => write!(f, "center still has coaches or monthly records"),
            Self::Validation(reason) => write!(f, "{reason}"),
        }
    }
}

impl warp::reject::Reject for Error {}

impl From<FindError> for Error {
    fn from(e: FindError) -> Self {
        match e {
            FindError::NotFound => Error::NotFound,
            FindError::Internal => Error::Internal,
        }
    }
}

impl From<WriteError> for Error {
    fn from(e: WriteError) -> Self {
        match e {
            WriteError::NotFound => Error::NotFound,
            WriteError::Conflict => Error::Conflict,
            WriteError::HasDependents => Error::HasDependents,
            WriteError::Internal => Error::Internal,
        }
    }
}

/// Monthly record writes report uniqueness as a duplicate period.
fn period_err(e: WriteError) -> Error {
    match e {
        WriteError::Conflict => Error::DuplicatePeriod,
        e => e.into(),
    }
}

fn internal(_: ()) -> Error {
    Error::Internal
}

/// Result of a successful login.
#[derive(Debug)]
pub struct LoggedIn {
    pub session_id: SessionId,
    pub session: Session,
    pub user: User,
}

impl Academy {
    pub fn new(backend: Backend, config: Config) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the default admin when there are no users at all.
    pub async fn seed(&self) -> Result<()> {
        self.seed_at(now()?).await
    }

    async fn seed_at(&self, now: Timestamp) -> Result<()> {
        if self.backend.count_users().await.map_err(internal)? == 0 {
            let pwhash = hash_password(DEFAULT_ADMIN).map_err(internal)?;
            self.backend
                .create_user(DEFAULT_ADMIN, &pwhash, Role::Admin, true, now)
                .await?;
            info!("created default user {DEFAULT_ADMIN:?} with password \"{DEFAULT_ADMIN}\"");
        }

        for username in self.backend.users_needing_password_change().await.map_err(internal)? {
            warn!("user {username:?} still has a provisional password, change it immediately");
        }

        let purged = self.backend.purge_expired_sessions(now).await.map_err(internal)?;
        if purged > 0 {
            debug!("purged {purged} expired sessions");
        }

        let purged = self
            .backend
            .purge_login_attempts(now, &self.config.rate_limit)
            .await
            .map_err(internal)?;
        if purged > 0 {
            debug!("purged {purged} stale login attempt counters");
        }

        Ok(())
    }

    pub async fn authenticate(
        &self,
        attempt: &AuthAttempt,
        remote: Option<IpAddr>,
    ) -> Result<LoggedIn> {
        self.authenticate_at(attempt, remote, now()?).await
    }

    async fn authenticate_at(
        &self,
        attempt: &AuthAttempt,
        remote: Option<IpAddr>,
        now: Timestamp,
    ) -> Result<LoggedIn> {
        let username = attempt.user();

        let principals: Vec<String> = remote
            .map(|ip| format!("ip:{ip}"))
            .into_iter()
            .chain([format!("user:{username}")])
            .collect();

        for principal in &principals {
            if let Some(until) = self.backend.locked_until(principal, now).await.map_err(internal)? {
                warn!("refusing login for {username}: {principal} locked until {until}");
                return Err(Error::RateLimited);
            }
        }

        if username.is_empty() || attempt.pass().is_empty() {
            return Err(Error::Validation("please enter username and password"));
        }

        let user = match self.backend.find_user(username).await {
            Ok(user) => Some(user),
            Err(FindError::NotFound) => None,
            Err(FindError::Internal) => {
                error!("couldn't authenticate user {username}");
                return Err(Error::Internal);
            }
        };

        let verified = match &user {
            Some(user) => verify_password(attempt.pass(), &user.pwhash).map_err(|()| {
                error!("stored password hash unreadable for user {username}");
                Error::Internal
            })?,
            None => {
                verify_unknown_user(attempt.pass());
                false
            }
        };

        let user = match user {
            Some(user) if verified && user.active => user,
            user => {
                match user {
                    None => error!("rejecting non-existant user {username}"),
                    Some(u) if !u.active => error!("rejecting disabled user {username}"),
                    Some(_) => error!("wrong password for user {username}"),
                }
                for principal in &principals {
                    self.backend
                        .record_failure(principal, now, &self.config.rate_limit)
                        .await
                        .map_err(internal)?;
                }
                return Err(Error::InvalidCredentials);
            }
        };

        for principal in &principals {
            self.backend.clear_failures(principal).await.map_err(internal)?;
        }

        let lifetime = if attempt.remember() {
            self.config.remember_lifetime_secs
        } else {
            self.config.session_lifetime_secs
        };

        let (session_id, session) = Session::new(user.id, now, lifetime);
        self.backend.insert_session(&session).await.map_err(internal)?;

        info!("{username} login: new session until {}", session.expires);
        Ok(LoggedIn {
            session_id,
            session,
            user,
        })
    }

    /// Checks a signed session cookie.
    pub async fn validate_session(self: &Arc<Self>, cookie: &str) -> Result<AcademyAuthed> {
        self.validate_session_at(cookie, now()?).await
    }

    async fn validate_session_at(self: &Arc<Self>, cookie: &str, now: Timestamp) -> Result<AcademyAuthed> {
        let session_id = SessionId::unsign(cookie, &self.config.secret).ok_or_else(|| {
            error!("session cookie failed verification");
            Error::SessionNotFound
        })?;
        let token = session_id.to_string();

        let session = self
            .backend
            .find_session(&token)
            .await
            .map_err(internal)?
            .ok_or_else(|| {
                debug!("no session {session_id}");
                Error::SessionNotFound
            })?;

        if session.is_expired(now) {
            info!("session of user {} expired at {}", session.user_id, session.expires);
            self.backend.delete_session(&token).await.map_err(internal)?;
            return Err(Error::SessionExpired);
        }

        let user = self.backend.find_user_by_id(session.user_id).await.map_err(|e| match e {
            FindError::NotFound => {
                error!("session {session_id} belongs to a missing user");
                Error::SessionNotFound
            }
            FindError::Internal => Error::Internal,
        })?;

        if !user.active {
            info!("session of disabled user {}", user.username);
            return Err(Error::SessionNotFound);
        }

        trace!("found user {} by session", user.username);
        Ok(AcademyAuthed {
            academy: Arc::clone(self),
            session,
            user,
        })
    }

    /// Ends the session behind `cookie`, if there is one.
    pub async fn logout(&self, cookie: &str) -> Result<()> {
        let Some(session_id) = SessionId::unsign(cookie, &self.config.secret) else {
            return Ok(());
        };

        if self.backend.delete_session(&session_id.to_string()).await.map_err(internal)? {
            info!("logout: session ended");
        }
        Ok(())
    }
}

impl AcademyAuthed {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn backend(&self) -> &Backend {
        &self.academy.backend
    }

    fn require_admin(&self) -> Result<()> {
        if self.user.role == Role::Admin {
            Ok(())
        } else {
            warn!("{} is not an admin", self.user.username);
            Err(Error::Forbidden)
        }
    }

    fn check_password(&self, pass: &str) -> Result<()> {
        match verify_password(pass, &self.user.pwhash) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::InvalidCredentials),
            Err(()) => Err(Error::Internal),
        }
    }

    pub async fn change_password(&self, change: PasswordChange) -> Result<()> {
        let username = &self.user.username;

        if change.new_password != change.confirm_password {
            return Err(Error::Validation("new passwords do not match"));
        }
        if change.new_password.chars().count() < self.academy.config.min_password_length {
            return Err(Error::Validation("new password is too short"));
        }
        if change.new_password == change.current_password {
            return Err(Error::Validation("new password must differ from the current one"));
        }
        self.check_password(&change.current_password)?;

        let pwhash = hash_password(&change.new_password).map_err(internal)?;
        self.backend()
            .update_password(self.user.id, &pwhash, false)
            .await?;

        let dropped = self
            .backend()
            .delete_sessions_for_user(self.user.id, Some(&self.session.token))
            .await
            .map_err(internal)?;

        info!("{username} changed password, ended {dropped} other sessions");
        Ok(())
    }

    pub async fn change_username(&self, change: UsernameChange) -> Result<UserInfo> {
        let new_username = validate::sanitize(&change.new_username, 50);
        if new_username.is_empty() {
            return Err(Error::Validation("username must not be empty"));
        }
        self.check_password(&change.current_password)?;

        self.backend()
            .update_username(self.user.id, &new_username)
            .await?;

        info!("{} is now {new_username}", self.user.username);
        let user = self.backend().find_user_by_id(self.user.id).await?;
        Ok(UserInfo::from(&user))
    }

    pub async fn create_user(&self, new: NewUser) -> Result<UserInfo> {
        self.require_admin()?;

        let username = validate::sanitize(&new.username, 50);
        if username.is_empty() {
            return Err(Error::Validation("username must not be empty"));
        }
        if new.password.chars().count() < self.academy.config.min_password_length {
            return Err(Error::Validation("password is too short"));
        }

        let now = now()?;
        let pwhash = hash_password(&new.password).map_err(internal)?;
        self.backend()
            .create_user(&username, &pwhash, new.role, false, now)
            .await?;

        info!("{} created user {username} ({:?})", self.user.username, new.role);
        let user = self.backend().find_user(&username).await?;
        Ok(UserInfo::from(&user))
    }

    pub async fn set_user_active(&self, username: &str, active: bool) -> Result<()> {
        self.require_admin()?;

        if username == self.user.username && !active {
            return Err(Error::Validation("you cannot disable yourself"));
        }

        self.backend().set_user_active(username, active).await?;
        info!("{} set {username} active={active}", self.user.username);
        Ok(())
    }
}

impl AcademyAuthed {
    pub async fn centers(&self) -> Result<Vec<Center>> {
        self.backend().centers().await.map_err(internal)
    }

    pub async fn center(&self, id: CenterId) -> Result<Center> {
        Ok(self.backend().find_center(id).await?)
    }

    pub async fn create_center(&self, input: CenterInput) -> Result<Center> {
        let fields = CenterFields::try_from(input).map_err(Error::Validation)?;
        let center = self.backend().create_center(&fields).await?;

        info!("{} created center {} {:?}", self.user.username, center.id, center.name);
        Ok(center)
    }

    pub async fn update_center(&self, id: CenterId, input: CenterInput) -> Result<Center> {
        let fields = CenterFields::try_from(input).map_err(Error::Validation)?;
        Ok(self.backend().update_center(id, &fields).await?)
    }

    pub async fn delete_center(&self, id: CenterId) -> Result<()> {
        let policy = self.academy.config.center_delete;

        self.backend().delete_center(id, policy).await?;
        info!("{} deleted center {id} ({policy:?})", self.user.username);
        Ok(())
    }
}

impl AcademyAuthed {
    pub async fn coaches(&self, center: CenterId) -> Result<Vec<Coach>> {
        self.center(center).await?;
        self.backend().coaches(Some(center)).await.map_err(internal)
    }

    pub async fn coach(&self, id: CoachId) -> Result<Coach> {
        Ok(self.backend().find_coach(id).await?)
    }

    pub async fn create_coach(&self, center: CenterId, input: CoachInput) -> Result<Coach> {
        let fields = CoachFields::try_from(input).map_err(Error::Validation)?;
        let coach = self.backend().create_coach(center, &fields).await?;

        info!("{} added coach {} to center {center}", self.user.username, coach.id);
        Ok(coach)
    }

    pub async fn update_coach(&self, id: CoachId, input: CoachInput) -> Result<Coach> {
        let fields = CoachFields::try_from(input).map_err(Error::Validation)?;
        Ok(self.backend().update_coach(id, &fields).await?)
    }

    pub async fn delete_coach(&self, id: CoachId) -> Result<()> {
        self.backend().delete_coach(id).await?;
        info!("{} deleted coach {id}", self.user.username);
        Ok(())
    }

    pub async fn payroll(&self, center: CenterId) -> Result<Payroll> {
        let coaches = self.coaches(center).await?;
        Ok(Payroll::of(center, &coaches))
    }
}

impl AcademyAuthed {
    pub async fn records(&self, center: CenterId, range: PeriodRange) -> Result<Vec<MonthlyRecord>> {
        self.center(center).await?;
        self.backend().records(Some(center), range).await.map_err(internal)
    }

    pub async fn record(&self, id: RecordId) -> Result<MonthlyRecord> {
        Ok(self.backend().find_record(id).await?)
    }

    pub async fn create_record(&self, center: CenterId, input: RecordInput) -> Result<MonthlyRecord> {
        let fields = RecordFields::try_from(input).map_err(Error::Validation)?;
        let record = self
            .backend()
            .create_record(center, &fields)
            .await
            .map_err(period_err)?;

        info!(
            "{} recorded {} for center {center}: revenue {}, salary {}",
            self.user.username, fields.period, record.revenue, record.total_salary,
        );
        Ok(record)
    }

    pub async fn update_record(&self, id: RecordId, input: RecordInput) -> Result<MonthlyRecord> {
        let fields = RecordFields::try_from(input).map_err(Error::Validation)?;
        self.backend().update_record(id, &fields).await.map_err(period_err)
    }

    pub async fn delete_record(&self, id: RecordId) -> Result<()> {
        self.backend().delete_record(id).await?;
        info!("{} deleted monthly record {id}", self.user.username);
        Ok(())
    }
}

impl AcademyAuthed {
    /// Totals over `range` for one center, or for all of them.
    pub async fn compute_summary(&self, center: Option<CenterId>, range: PeriodRange) -> Result<Summary> {
        if let Some(id) = center {
            self.center(id).await?;
        }

        let records = self.backend().records(center, range).await.map_err(internal)?;
        let summary = analytics::compute_summary(&records, center, range);

        trace!(
            "summary for {:?} over {:?}: {} records",
            center,
            range,
            summary.months
        );
        Ok(summary)
    }

    pub async fn year_report(&self, year: i32, center: Option<CenterId>, selected: &[u8]) -> Result<YearReport> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::Validation("year out of range"));
        }
        if let Some(id) = center {
            self.center(id).await?;
        }

        let range = PeriodRange::year(year).map_err(Error::Validation)?;
        let records = self.backend().records(center, range).await.map_err(internal)?;

        Ok(analytics::year_report(&records, year, center, selected))
    }
}

impl AcademyAuthed {
    pub async fn leaves(&self, coach: CoachId) -> Result<Vec<Leave>> {
        self.coach(coach).await?;
        self.backend().leaves(Some(coach)).await.map_err(internal)
    }

    pub async fn find_leaves(&self, filter: LeaveFilter) -> Result<Vec<Leave>> {
        if let Some(center) = filter.center {
            self.center(center).await?;
        }
        if let Some(coach) = filter.coach {
            self.coach(coach).await?;
        }

        self.backend().leaves_matching(&filter).await.map_err(internal)
    }

    pub async fn leave(&self, id: LeaveId) -> Result<Leave> {
        Ok(self.backend().find_leave(id).await?)
    }

    pub async fn create_leave(&self, coach: CoachId, input: LeaveInput) -> Result<Leave> {
        let fields = LeaveFields::try_from(input).map_err(Error::Validation)?;
        let leave = self.backend().create_leave(coach, &fields).await?;

        info!(
            "{} recorded {} day(s) of {:?} leave for coach {coach}",
            self.user.username,
            leave.days(),
            leave.kind
        );
        Ok(leave)
    }

    pub async fn update_leave(&self, id: LeaveId, input: LeaveInput) -> Result<Leave> {
        let fields = LeaveFields::try_from(input).map_err(Error::Validation)?;
        Ok(self.backend().update_leave(id, &fields).await?)
    }

    pub async fn delete_leave(&self, id: LeaveId) -> Result<()> {
        Ok(self.backend().delete_leave(id).await?)
    }

    pub async fn leave_report(&self, year: i32) -> Result<LeaveReport> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::Validation("year out of range"));
        }

        let coaches = self.backend().coaches(None).await.map_err(internal)?;
        let leaves = self.backend().leaves(None).await.map_err(internal)?;

        Ok(leave::report(&coaches, &leaves, year))
    }
}

fn now() -> Result<Timestamp> {
    Timestamp::now().map_err(internal)
}
