use std::{fmt, str::FromStr, sync::OnceLock};

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64_light::base64_decode;
use hmac::{Hmac, Mac};
use log::error;
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sessionid";

type HmacSha256 = Hmac<Sha256>;

pub struct AuthAttempt {
    user: String,
    pass: String,
    remember: bool,
}

/// Login body, as an alternative to basic auth.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl FromStr for AuthAttempt {
    type Err = &'static str;

    fn from_str(header: &str) -> Result<Self, Self::Err> {
        let (basic, auth_b64) = header
            .split_once(' ')
            .ok_or("no space in auth header")?;

        if basic != "Basic" {
            return Err("only basic auth supported");
        }

        let auth_bytes = base64_decode(auth_b64.trim());
        let auth = std::str::from_utf8(&auth_bytes)
            .map_err(|e| {
                error!("invalid utf-8 for password: {e:?}");
                "none-utf8 in auth header"
            })?;

        let (user, pass) = auth.split_once(':')
            .ok_or("no colon in auth value")?;

        Ok(Self::new(user, pass, false))
    }
}

impl From<LoginForm> for AuthAttempt {
    fn from(form: LoginForm) -> Self {
        Self::new(&form.username, &form.password, form.remember_me)
    }
}

impl fmt::Debug for AuthAttempt {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("AuthAttempt")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("remember", &self.remember)
            .finish()
    }
}

impl AuthAttempt {
    pub fn new(user: &str, pass: &str, remember: bool) -> Self {
        Self {
            user: crate::validate::sanitize(user, 50),
            pass: pass.into(),
            remember,
        }
    }

    pub fn user(&self) -> &str { &self.user }
    pub fn pass(&self) -> &str { &self.pass }
    pub fn remember(&self) -> bool { self.remember }
}

/// Argon2id PHC string for storage, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`.
pub fn hash_password(pass: &str) -> Result<String, ()> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(pass.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| error!("couldn't hash password: {e}"))
}

/// Checks `pass` against a stored hash; `Err` if the stored hash is unreadable.
pub fn verify_password(pass: &str, stored: &str) -> Result<bool, ()> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!("malformed password hash: {e}");
    })?;

    match Argon2::default().verify_password(pass.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!("couldn't verify password: {e}");
            Err(())
        }
    }
}

/// Spends a verification on a throwaway hash, so a login for a missing
/// user takes as long as one with a wrong password.
pub fn verify_unknown_user(pass: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password(&Uuid::new_v4().to_string()).ok());
    if let Some(hash) = dummy {
        let _ = verify_password(pass, hash);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Cookie value: the id plus a hex HMAC-SHA256 of it keyed by `secret`.
    pub fn sign(&self, secret: &str) -> Option<String> {
        let id = self.to_string();
        let tag = mac(secret, &id)?.finalize().into_bytes();

        Some(format!("{id}.{}", hex::encode(tag)))
    }

    pub fn unsign(cookie: &str, secret: &str) -> Option<Self> {
        let (id, sig) = cookie.split_once('.')?;
        let sig = hex::decode(sig).ok()?;

        mac(secret, id)?.verify_slice(&sig).ok()?;

        id.parse().ok()
    }
}

fn mac(secret: &str, id: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| error!("invalid session key: {e}"))
        .ok()?;
    mac.update(id.as_bytes());
    Some(mac)
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s).map(Self).map_err(|_| ())
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic_auth_header() {
        // "admin:pa:ss"
        let attempt: AuthAttempt = "Basic YWRtaW46cGE6c3M=".parse().unwrap();
        assert_eq!(attempt.user(), "admin");
        assert_eq!(attempt.pass(), "pa:ss");
        assert!(!attempt.remember());

        assert!("Bearer abc".parse::<AuthAttempt>().is_err());
        assert!("Basic".parse::<AuthAttempt>().is_err());
        // "nocolon"
        assert!("Basic bm9jb2xvbg==".parse::<AuthAttempt>().is_err());
    }

    #[test]
    fn debug_hides_password() {
        let attempt = AuthAttempt::new("admin", "hunter2", true);
        let shown = format!("{attempt:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("admin"));
    }

    #[test]
    fn password_hash_roundtrip() {
        let stored = hash_password("hunter2").unwrap();
        assert!(stored.starts_with("$argon2id$v=19$"));
        assert!(!stored.contains("hunter2"));

        assert_eq!(verify_password("hunter2", &stored), Ok(true));
        assert_eq!(verify_password("hunter3", &stored), Ok(false));
        assert_eq!(verify_password("", &stored), Ok(false));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn malformed_hash() {
        assert!(verify_password("x", "not-a-hash").is_err());
        // well-formed PHC string, but not an argon2 one
        assert!(verify_password("x", "$md5$c2FsdHNhbHRzYWx0$aGFzaGhhc2hoYXNoaGFzaA").is_err());
        // the old hand-rolled format is not accepted
        assert!(verify_password("x", "sha256$10000$salt$abc").is_err());
    }

    #[test]
    fn unknown_user_verification_is_harmless() {
        verify_unknown_user("anything");
        verify_unknown_user("");
    }

    #[test]
    fn signed_session_cookie() {
        let id: SessionId = Uuid::try_parse("550e8400-e29b-41d4-a716-446655440000")
            .unwrap()
            .into();

        let cookie = id.sign("secret").unwrap();
        let (value, sig) = cookie.split_once('.').unwrap();
        assert_eq!(value, "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(SessionId::unsign(&cookie, "secret"), Some(id.clone()));

        assert_eq!(SessionId::unsign(&cookie, "other secret"), None);
        assert_eq!(SessionId::unsign("550e8400-e29b-41d4-a716-446655440000", "secret"), None);
        assert_eq!(SessionId::unsign(&format!("{value}.not-hex"), "secret"), None);
        assert_eq!(SessionId::unsign(&format!("{value}.{}", &sig[..32]), "secret"), None);

        let forged = format!("{}.{sig}", SessionId::new());
        assert_eq!(SessionId::unsign(&forged, "secret"), None);
    }
}
