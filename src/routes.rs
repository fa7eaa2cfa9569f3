use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use cookie::{time::Duration, Cookie, SameSite};
use log::{debug, error, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use warp::{
    http::{header, StatusCode},
    hyper::body::Bytes,
    reply::Response,
    Filter, Rejection, Reply,
};

use crate::academy::{Academy, AcademyAuthed, Error, Result};
use crate::analytics::{self, QueryReport};
use crate::auth::{AuthAttempt, LoginForm, SESSION_COOKIE};
use crate::center::{CenterId, CenterInput};
use crate::coach::{CoachId, CoachInput};
use crate::leave::{LeaveFilter, LeaveId, LeaveInput, LeaveQuery};
use crate::period::{PeriodRange, QueryRange};
use crate::record::{RecordId, RecordInput};
use crate::session::Session;
use crate::time::Timestamp;
use crate::user::{ActiveChange, NewUser, PasswordChange, UserInfo, UsernameChange};

const BODY_LIMIT: u64 = 16 * 1024;

#[derive(Serialize)]
struct SessionReply {
    user: UserInfo,
    expires: Timestamp,
}

#[derive(Serialize)]
struct ErrorReply {
    error: String,
}

#[derive(Debug, Deserialize, Default)]
struct QueryYear {
    year: Option<i32>,
}

/// Every route of the dashboard API, with errors turned into JSON replies.
pub fn routes(
    academy: Arc<Academy>,
    secure: bool,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let authed = authorized(Arc::clone(&academy));

    let session = {
        let login = warp::path!("api" / "login")
            .and(warp::post())
            .and(warp::header::optional::<String>("authorization"))
            .and(
                // basic auth logins may come without a body
                warp::body::content_length_limit(BODY_LIMIT)
                    .and(warp::body::bytes())
                    .or(warp::any().map(Bytes::new))
                    .unify(),
            )
            .and(warp::addr::remote())
            .then({
                let academy = Arc::clone(&academy);
                move |auth: Option<String>, body: Bytes, remote: Option<SocketAddr>| {
                    let academy = Arc::clone(&academy);
                    async move { login(&academy, auth, &body, remote, secure).await }
                }
            });

        let logout = warp::path!("api" / "logout")
            .and(warp::post())
            .and(warp::cookie::optional::<String>(SESSION_COOKIE))
            .then({
                let academy = Arc::clone(&academy);
                move |cookie: Option<String>| {
                    let academy = Arc::clone(&academy);
                    async move {
                        if let Some(cookie) = cookie {
                            if let Err(e) = academy.logout(&cookie).await {
                                return error_reply(e);
                            }
                        }
                        let reply = warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT);
                        warp::reply::with_header(reply, header::SET_COOKIE, removal_cookie(secure))
                            .into_response()
                    }
                }
            });

        let me = warp::path!("api" / "me")
            .and(warp::get())
            .and(authed.clone())
            .map(|a: AcademyAuthed| {
                warp::reply::json(&SessionReply {
                    user: UserInfo::from(a.user()),
                    expires: a.session().expires,
                })
                .into_response()
            });

        login.or(logout).or(me)
    };

    let account = {
        let password = warp::path!("api" / "account" / "password")
            .and(warp::post())
            .and(authed.clone())
            .and(json_body())
            .then(|a: AcademyAuthed, change: PasswordChange| async move {
                no_content(a.change_password(change).await)
            });

        let username = warp::path!("api" / "account" / "username")
            .and(warp::post())
            .and(authed.clone())
            .and(json_body())
            .then(|a: AcademyAuthed, change: UsernameChange| async move {
                reply(a.change_username(change).await)
            });

        let create_user = warp::path!("api" / "users")
            .and(warp::post())
            .and(authed.clone())
            .and(json_body())
            .then(|a: AcademyAuthed, new: NewUser| async move {
                created(a.create_user(new).await)
            });

        let user_active = warp::path!("api" / "users" / String / "active")
            .and(warp::post())
            .and(authed.clone())
            .and(json_body())
            .then(|username: String, a: AcademyAuthed, change: ActiveChange| async move {
                no_content(a.set_user_active(&username, change.active).await)
            });

        password.or(username).or(create_user).or(user_active)
    };

    let centers = {
        let list = warp::path!("api" / "centers")
            .and(warp::get())
            .and(authed.clone())
            .then(|a: AcademyAuthed| async move { reply(a.centers().await) });

        let create = warp::path!("api" / "centers")
            .and(warp::post())
            .and(authed.clone())
            .and(json_body())
            .then(|a: AcademyAuthed, input: CenterInput| async move {
                created(a.create_center(input).await)
            });

        let get = warp::path!("api" / "centers" / CenterId)
            .and(warp::get())
            .and(authed.clone())
            .then(|id: CenterId, a: AcademyAuthed| async move { reply(a.center(id).await) });

        let update = warp::path!("api" / "centers" / CenterId)
            .and(warp::put())
            .and(authed.clone())
            .and(json_body())
            .then(|id: CenterId, a: AcademyAuthed, input: CenterInput| async move {
                reply(a.update_center(id, input).await)
            });

        let delete = warp::path!("api" / "centers" / CenterId)
            .and(warp::delete())
            .and(authed.clone())
            .then(|id: CenterId, a: AcademyAuthed| async move { no_content(a.delete_center(id).await) });

        list.or(create).or(get).or(update).or(delete)
    };

    let center_children = {
        let coaches = warp::path!("api" / "centers" / CenterId / "coaches")
            .and(warp::get())
            .and(authed.clone())
            .then(|id: CenterId, a: AcademyAuthed| async move { reply(a.coaches(id).await) });

        let add_coach = warp::path!("api" / "centers" / CenterId / "coaches")
            .and(warp::post())
            .and(authed.clone())
            .and(json_body())
            .then(|id: CenterId, a: AcademyAuthed, input: CoachInput| async move {
                created(a.create_coach(id, input).await)
            });

        let payroll = warp::path!("api" / "centers" / CenterId / "payroll")
            .and(warp::get())
            .and(authed.clone())
            .then(|id: CenterId, a: AcademyAuthed| async move { reply(a.payroll(id).await) });

        let records = warp::path!("api" / "centers" / CenterId / "records")
            .and(warp::get())
            .and(authed.clone())
            .and(warp::query::<QueryRange>())
            .then(|id: CenterId, a: AcademyAuthed, q: QueryRange| async move {
                match PeriodRange::try_from(&q) {
                    Ok(range) => reply(a.records(id, range).await),
                    Err(reason) => error_reply(Error::Validation(reason)),
                }
            });

        let add_record = warp::path!("api" / "centers" / CenterId / "records")
            .and(warp::post())
            .and(authed.clone())
            .and(json_body())
            .then(|id: CenterId, a: AcademyAuthed, input: RecordInput| async move {
                created(a.create_record(id, input).await)
            });

        let summary = warp::path!("api" / "centers" / CenterId / "summary")
            .and(warp::get())
            .and(authed.clone())
            .and(warp::query::<QueryRange>())
            .then(|id: CenterId, a: AcademyAuthed, q: QueryRange| async move { summary(a, Some(id), q).await });

        coaches
            .or(add_coach)
            .or(payroll)
            .or(records)
            .or(add_record)
            .or(summary)
    };

    let coaches = {
        let get = warp::path!("api" / "coaches" / CoachId)
            .and(warp::get())
            .and(authed.clone())
            .then(|id: CoachId, a: AcademyAuthed| async move { reply(a.coach(id).await) });

        let update = warp::path!("api" / "coaches" / CoachId)
            .and(warp::put())
            .and(authed.clone())
            .and(json_body())
            .then(|id: CoachId, a: AcademyAuthed, input: CoachInput| async move {
                reply(a.update_coach(id, input).await)
            });

        let delete = warp::path!("api" / "coaches" / CoachId)
            .and(warp::delete())
            .and(authed.clone())
            .then(|id: CoachId, a: AcademyAuthed| async move { no_content(a.delete_coach(id).await) });

        let leaves = warp::path!("api" / "coaches" / CoachId / "leaves")
            .and(warp::get())
            .and(authed.clone())
            .then(|id: CoachId, a: AcademyAuthed| async move { reply(a.leaves(id).await) });

        let add_leave = warp::path!("api" / "coaches" / CoachId / "leaves")
            .and(warp::post())
            .and(authed.clone())
            .and(json_body())
            .then(|id: CoachId, a: AcademyAuthed, input: LeaveInput| async move {
                created(a.create_leave(id, input).await)
            });

        get.or(update).or(delete).or(leaves).or(add_leave)
    };

    let records = {
        let get = warp::path!("api" / "records" / RecordId)
            .and(warp::get())
            .and(authed.clone())
            .then(|id: RecordId, a: AcademyAuthed| async move { reply(a.record(id).await) });

        let update = warp::path!("api" / "records" / RecordId)
            .and(warp::put())
            .and(authed.clone())
            .and(json_body())
            .then(|id: RecordId, a: AcademyAuthed, input: RecordInput| async move {
                reply(a.update_record(id, input).await)
            });

        let delete = warp::path!("api" / "records" / RecordId)
            .and(warp::delete())
            .and(authed.clone())
            .then(|id: RecordId, a: AcademyAuthed| async move { no_content(a.delete_record(id).await) });

        get.or(update).or(delete)
    };

    let leaves = {
        let list = warp::path!("api" / "leaves")
            .and(warp::get())
            .and(authed.clone())
            .and(warp::query::<LeaveQuery>())
            .then(|a: AcademyAuthed, q: LeaveQuery| async move {
                match LeaveFilter::new(&q, current_year()) {
                    Ok(filter) => reply(a.find_leaves(filter).await),
                    Err(reason) => error_reply(Error::Validation(reason)),
                }
            });

        let stats = warp::path!("api" / "leaves" / "stats")
            .and(warp::get())
            .and(authed.clone())
            .and(warp::query::<QueryYear>())
            .then(|a: AcademyAuthed, q: QueryYear| async move {
                reply(a.leave_report(q.year.unwrap_or_else(current_year)).await)
            });

        let get = warp::path!("api" / "leaves" / LeaveId)
            .and(warp::get())
            .and(authed.clone())
            .then(|id: LeaveId, a: AcademyAuthed| async move { reply(a.leave(id).await) });

        let update = warp::path!("api" / "leaves" / LeaveId)
            .and(warp::put())
            .and(authed.clone())
            .and(json_body())
            .then(|id: LeaveId, a: AcademyAuthed, input: LeaveInput| async move {
                reply(a.update_leave(id, input).await)
            });

        let delete = warp::path!("api" / "leaves" / LeaveId)
            .and(warp::delete())
            .and(authed.clone())
            .then(|id: LeaveId, a: AcademyAuthed| async move { no_content(a.delete_leave(id).await) });

        list.or(stats).or(get).or(update).or(delete)
    };

    let analytics = {
        let summary = warp::path!("api" / "summary")
            .and(warp::get())
            .and(authed.clone())
            .and(warp::query::<QueryRange>())
            .then(|a: AcademyAuthed, q: QueryRange| async move { summary(a, None, q).await });

        let report = warp::path!("api" / "analytics")
            .and(warp::get())
            .and(authed)
            .and(warp::query::<QueryReport>())
            .then(|a: AcademyAuthed, q: QueryReport| async move { year_report(a, q).await });

        summary.or(report)
    };

    session
        .or(account)
        .or(centers.boxed())
        .or(center_children.boxed())
        .or(coaches.boxed())
        .or(records.boxed())
        .or(leaves.boxed())
        .or(analytics)
        .recover(handle_rejection)
        .with(warp::log("academy"))
}

fn authorized(
    academy: Arc<Academy>,
) -> impl Filter<Extract = (AcademyAuthed,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |cookie: Option<String>| {
        let academy = Arc::clone(&academy);
        async move {
            let Some(cookie) = cookie else {
                debug!("no session cookie");
                return Err(warp::reject::custom(Error::SessionNotFound));
            };

            academy
                .validate_session(&cookie)
                .await
                .map_err(warp::reject::custom)
        }
    })
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json())
}

async fn login(
    academy: &Academy,
    auth: Option<String>,
    body: &[u8],
    remote: Option<SocketAddr>,
    secure: bool,
) -> Response {
    let attempt = match auth {
        Some(header) => header.parse::<AuthAttempt>().map_err(|e| {
            warn!("bad authorization header: {e}");
            Error::BadRequest
        }),
        None => serde_json::from_slice::<LoginForm>(body)
            .map(AuthAttempt::from)
            .map_err(|e| {
                warn!("bad login body: {e}");
                Error::BadRequest
            }),
    };
    let attempt = match attempt {
        Ok(attempt) => attempt,
        Err(e) => return error_reply(e),
    };

    match academy.authenticate(&attempt, remote.map(|addr| addr.ip())).await {
        Ok(logged_in) => {
            let Some(value) = logged_in.session_id.sign(&academy.config().secret) else {
                error!("couldn't sign session for {}", logged_in.user.username);
                return error_reply(Error::Internal);
            };
            let cookie = session_cookie(&value, &logged_in.session, secure);
            let body = warp::reply::json(&SessionReply {
                user: UserInfo::from(&logged_in.user),
                expires: logged_in.session.expires,
            });

            warp::reply::with_header(body, header::SET_COOKIE, cookie).into_response()
        }
        Err(e) => error_reply(e),
    }
}

async fn summary(a: AcademyAuthed, center: Option<CenterId>, q: QueryRange) -> Response {
    match PeriodRange::try_from(&q) {
        Ok(range) => reply(a.compute_summary(center, range).await),
        Err(reason) => error_reply(Error::Validation(reason)),
    }
}

async fn year_report(a: AcademyAuthed, q: QueryReport) -> Response {
    let selected = match q.months.as_deref().map(analytics::parse_months) {
        None => vec![],
        Some(Ok(months)) => months,
        Some(Err(reason)) => return error_reply(Error::Validation(reason)),
    };
    let year = q.year.unwrap_or_else(current_year);

    reply(a.year_report(year, q.center, &selected).await)
}

fn session_cookie(value: &str, session: &Session, secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::seconds(session.lifetime_secs()))
        .build()
        .to_string()
}

fn removal_cookie(secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
        .to_string()
}

fn current_year() -> i32 {
    time::OffsetDateTime::now_utc().year()
}

fn reply<T: Serialize>(r: Result<T>) -> Response {
    match r {
        Ok(body) => warp::reply::json(&body).into_response(),
        Err(e) => error_reply(e),
    }
}

fn created<T: Serialize>(r: Result<T>) -> Response {
    match r {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), StatusCode::CREATED).into_response(),
        Err(e) => error_reply(e),
    }
}

fn no_content(r: Result<()>) -> Response {
    match r {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_reply(e),
    }
}

fn error_reply(e: Error) -> Response {
    let status: StatusCode = e.clone().into();
    json_error(status, e.to_string())
}

fn json_error(status: StatusCode, error: String) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorReply { error }), status).into_response()
}

async fn handle_rejection(err: Rejection) -> std::result::Result<Response, Infallible> {
    use warp::filters::body::BodyDeserializeError;
    use warp::reject::{InvalidQuery, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType};

    if let Some(e) = err.find::<Error>() {
        return Ok(error_reply(e.clone()));
    }

    let (status, message) = if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "invalid query string".into())
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".into())
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected a JSON body".into())
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".into())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, Error::NotFound.to_string())
    } else {
        error!("unhandled rejection: {err:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, Error::Internal.to_string())
    };

    Ok(json_error(status, message))
}

#[cfg(test)]
mod test {
    use super::*;

    use serde_json::{json, Value};
    use warp::http::Response as HttpResponse;

    use crate::backend::{self, Backend};
    use crate::config::Config;

    const SECRET: &str = "route-secret";

    async fn create_routes() -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone + 'static {
        let db = backend::test::create_db().await;
        let academy = Academy::new(
            Backend(db),
            Config {
                secret: SECRET.into(),
                ..Config::default()
            },
        );
        academy.seed().await.unwrap();

        routes(Arc::new(academy), false)
    }

    fn body(res: &HttpResponse<Bytes>) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    async fn login<F>(routes: &F) -> String
    where
        F: Filter + 'static,
        F::Extract: Reply + Send,
    {
        let res = warp::test::request()
            .method("POST")
            .path("/api/login")
            .json(&json!({ "username": "admin", "password": "admin" }))
            .reply(routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        let (pair, _) = set_cookie.split_once(';').unwrap();
        pair.to_string()
    }

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let routes = create_routes().await;

        let res = warp::test::request()
            .method("POST")
            .path("/api/login")
            .json(&json!({ "username": "admin", "password": "admin", "remember_me": true }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("sessionid="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains(&format!("Max-Age={}", 30 * 24 * 60 * 60)));
        assert!(!set_cookie.contains("Secure"));

        let body = body(&res);
        assert_eq!(body["user"]["username"], "admin");
        assert_eq!(body["user"]["role"], "admin");
        assert_eq!(body["user"]["password_change_required"], true);
    }

    #[tokio::test]
    async fn basic_auth_login() {
        let routes = create_routes().await;

        let res = warp::test::request()
            .method("POST")
            .path("/api/login")
            // admin:admin
            .header("authorization", "Basic YWRtaW46YWRtaW4=")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(header::SET_COOKIE));
    }

    #[tokio::test]
    async fn bad_login() {
        let routes = create_routes().await;

        let res = warp::test::request()
            .method("POST")
            .path("/api/login")
            .json(&json!({ "username": "admin", "password": "wrong" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(&res)["error"], "invalid username or password");
        assert!(!res.headers().contains_key(header::SET_COOKIE));

        let res = warp::test::request()
            .method("POST")
            .path("/api/login")
            .body("not json")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_rate_limited() {
        let routes = create_routes().await;
        let addr: SocketAddr = "192.0.2.1:4000".parse().unwrap();

        for _ in 0..5 {
            let res = warp::test::request()
                .method("POST")
                .path("/api/login")
                .remote_addr(addr)
                .json(&json!({ "username": "admin", "password": "wrong" }))
                .reply(&routes)
                .await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }

        let res = warp::test::request()
            .method("POST")
            .path("/api/login")
            .remote_addr(addr)
            .json(&json!({ "username": "admin", "password": "admin" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn session_required() {
        let routes = create_routes().await;

        let res = warp::test::request().path("/api/centers").reply(&routes).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(&res)["error"], "not logged in");

        let cookie = login(&routes).await;
        let (_, value) = cookie.split_once('=').unwrap();
        let (id, _) = value.split_once('.').unwrap();
        let tampered = format!("sessionid={id}.{}", "0".repeat(64));

        let res = warp::test::request()
            .path("/api/me")
            .header("cookie", tampered)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = warp::test::request()
            .path("/api/me")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["user"]["username"], "admin");
    }

    #[tokio::test]
    async fn logout_ends_session() {
        let routes = create_routes().await;
        let cookie = login(&routes).await;

        let res = warp::test::request()
            .method("POST")
            .path("/api/logout")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));

        let res = warp::test::request()
            .path("/api/me")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        // again, without any session
        let res = warp::test::request()
            .method("POST")
            .path("/api/logout")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn records_and_summary() {
        let routes = create_routes().await;
        let cookie = login(&routes).await;

        let res = warp::test::request()
            .method("POST")
            .path("/api/centers")
            .header("cookie", &cookie)
            .json(&json!({ "name": "North", "location": "Pune" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let center = body(&res)["id"].as_i64().unwrap();

        for (month, revenue, salary) in [(1, 10000.0, 2500.0), (2, 12000.0, 3200.0)] {
            let res = warp::test::request()
                .method("POST")
                .path(&format!("/api/centers/{center}/records"))
                .header("cookie", &cookie)
                .json(&json!({ "year": 2026, "month": month, "revenue": revenue, "total_salary": salary }))
                .reply(&routes)
                .await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = warp::test::request()
            .method("POST")
            .path(&format!("/api/centers/{center}/records"))
            .header("cookie", &cookie)
            .json(&json!({ "year": 2026, "month": 1, "revenue": 1.0, "total_salary": 1.0 }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = warp::test::request()
            .path(&format!("/api/centers/{center}/summary?from=2026-01&to=2026-02"))
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let summary = body(&res);
        assert_eq!(summary["total_revenue"], 22000.0);
        assert_eq!(summary["total_salary"], 5700.0);
        assert_eq!(summary["months"], 2);
        let cap = summary["recommended_salary_cap"].as_f64().unwrap();
        assert!((cap - 6578.0).abs() < 1e-9);

        let res = warp::test::request()
            .path(&format!("/api/centers/{center}/records?from=2026-02"))
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(body(&res).as_array().unwrap().len(), 1);

        let res = warp::test::request()
            .path("/api/summary?from=2026-03&to=2026-01")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = warp::test::request()
            .path("/api/analytics?year=2026&months=jan,February")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let report = body(&res);
        assert_eq!(report["months"].as_array().unwrap().len(), 12);
        assert_eq!(report["selected"]["count"], 2);
        assert_eq!(report["selected"]["average_revenue"], 11000.0);
        assert!(report.get("center_id").is_none());

        let res = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/centers/{center}"))
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = warp::test::request()
            .path(&format!("/api/centers/{center}"))
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_input() {
        let routes = create_routes().await;
        let cookie = login(&routes).await;

        let res = warp::test::request()
            .method("POST")
            .path("/api/centers")
            .header("cookie", &cookie)
            .json(&json!({ "name": "  " }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body(&res)["error"], "name must not be empty");

        let res = warp::test::request()
            .method("POST")
            .path("/api/centers")
            .header("cookie", &cookie)
            .json(&json!({ "location": "nowhere" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = warp::test::request()
            .path("/api/nothing/here")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = warp::test::request()
            .path("/api/analytics?months=smarch")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn coach_leaves() {
        let routes = create_routes().await;
        let cookie = login(&routes).await;

        let res = warp::test::request()
            .method("POST")
            .path("/api/centers")
            .header("cookie", &cookie)
            .json(&json!({ "name": "North" }))
            .reply(&routes)
            .await;
        let center = body(&res)["id"].as_i64().unwrap();

        let res = warp::test::request()
            .method("POST")
            .path(&format!("/api/centers/{center}/coaches"))
            .header("cookie", &cookie)
            .json(&json!({ "name": "Asha", "monthly_salary": 2500.0, "start_date": "2025-06-01" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let coach = body(&res);
        assert_eq!(coach["start_date"], "2025-06-01");
        assert_eq!(coach["active"], true);
        let coach = coach["id"].as_i64().unwrap();

        let res = warp::test::request()
            .method("POST")
            .path(&format!("/api/coaches/{coach}/leaves"))
            .header("cookie", &cookie)
            .json(&json!({ "from_date": "2026-03-02", "to_date": "2026-03-04", "kind": "sick" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = warp::test::request()
            .path("/api/leaves/stats?year=2026")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let report = body(&res);
        assert_eq!(report["year"], 2026);
        assert_eq!(report["coaches"][0]["coach_name"], "Asha");
        assert_eq!(report["coaches"][0]["total_days"], 3);
        assert_eq!(report["monthly_days"].as_array().unwrap().len(), 12);
        assert_eq!(report["monthly_days"][2]["days"], 3);
        assert_eq!(report["by_kind"][0]["kind"], "sick");
        assert_eq!(report["totals"]["total_days"], 3);

        let res = warp::test::request()
            .path(&format!("/api/leaves?year=2026&month=3&center={center}"))
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)[0]["coach_id"], coach);

        let res = warp::test::request()
            .path("/api/leaves?year=2026&month=4")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(body(&res).as_array().unwrap().len(), 0);

        let res = warp::test::request()
            .path("/api/leaves?month=13")
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = warp::test::request()
            .path(&format!("/api/centers/{center}/payroll"))
            .header("cookie", &cookie)
            .reply(&routes)
            .await;
        assert_eq!(body(&res)["monthly_salary_total"], 2500.0);
    }

    #[tokio::test]
    async fn staff_cannot_manage_users() {
        let routes = create_routes().await;
        let admin = login(&routes).await;

        let res = warp::test::request()
            .method("POST")
            .path("/api/users")
            .header("cookie", &admin)
            .json(&json!({ "username": "staff1", "password": "staff password" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(body(&res)["role"], "staff");

        let res = warp::test::request()
            .method("POST")
            .path("/api/login")
            .json(&json!({ "username": "staff1", "password": "staff password" }))
            .reply(&routes)
            .await;
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        let staff = set_cookie.split_once(';').unwrap().0.to_string();

        let res = warp::test::request()
            .method("POST")
            .path("/api/users/admin/active")
            .header("cookie", &staff)
            .json(&json!({ "active": false }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = warp::test::request()
            .method("POST")
            .path("/api/users/staff1/active")
            .header("cookie", &admin)
            .json(&json!({ "active": false }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = warp::test::request()
            .path("/api/me")
            .header("cookie", &staff)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
