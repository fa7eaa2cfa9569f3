use std::{
    fs, io,
    net::{AddrParseError, IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

use clap::{builder::FalseyValueParser, Parser};
use log::info;
use uuid::Uuid;

use crate::center::DeletePolicy;
use crate::config::{Config, RateLimit};

const SECRET_FILE: &str = ".secret_key";

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Whether clients connect over https.
    /// If so, the sessionid cookie is sent as a secure cookie.
    /// PRODUCTION=1 (or true/yes/on) also enables this.
    #[arg(short, long, env = "PRODUCTION", value_parser = FalseyValueParser::new())]
    secure: bool,

    /// Set by the Render hosting platform, which only serves https.
    #[arg(long, env = "RENDER", hide = true, value_parser = FalseyValueParser::new())]
    render: bool,

    /// The address to listen on. By default
    /// the dashboard listens just on the IPv4 loopback.
    #[arg(short, long, env = "ADDRESS")]
    address: Option<String>,

    /// The port the dashboard listens on.
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Where academy.db and the generated secret key live.
    #[arg(short, long, env = "DATA_DIR", default_value = "instance")]
    data_dir: PathBuf,

    /// Key for signing session cookies. Read from (or generated into)
    /// the data directory when unset.
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// How long a login lasts.
    #[arg(long, default_value_t = 8)]
    session_hours: i64,

    /// How long a "remember me" login lasts.
    #[arg(long, default_value_t = 30)]
    remember_days: i64,

    /// Failed logins allowed per window before the address or account is locked.
    #[arg(long, default_value_t = 5)]
    max_login_attempts: i64,

    /// How long a lockout lasts, which is also the window failures are counted in.
    #[arg(long, default_value_t = 300)]
    lockout_secs: i64,

    /// What deleting a center does to its coaches and records.
    #[arg(long, value_enum, default_value_t = DeletePolicy::Cascade)]
    center_delete: DeletePolicy,
}

impl Args {
    pub fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.address
            .as_deref()
            .unwrap_or("127.0.0.1")
            .parse()
            .map(|addr: IpAddr| (addr, self.port).into())
    }

    pub fn secure(&self) -> bool {
        self.secure || self.render
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> io::Result<Config> {
        let secret = match &self.secret_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => load_secret(&self.data_dir)?,
        };

        Ok(Config {
            secret,
            session_lifetime_secs: self.session_hours * 60 * 60,
            remember_lifetime_secs: self.remember_days * 24 * 60 * 60,
            rate_limit: RateLimit {
                max_failures: self.max_login_attempts,
                window_secs: self.lockout_secs,
                lockout_secs: self.lockout_secs,
            },
            center_delete: self.center_delete,
            ..Config::default()
        })
    }
}

/// Reads the signing key from `dir`, creating one on first start.
fn load_secret(dir: &Path) -> io::Result<String> {
    let path = dir.join(SECRET_FILE);

    match fs::read_to_string(&path) {
        Ok(secret) if !secret.trim().is_empty() => return Ok(secret.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    fs::create_dir_all(dir)?;
    fs::write(&path, &secret)?;
    info!("generated a new secret key in {}", path.display());

    Ok(secret)
}
