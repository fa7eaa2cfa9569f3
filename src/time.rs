use std::fmt;

use log::error;
use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};

#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
#[derive(sqlx::Type)]
#[sqlx(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn now() -> Result<Self, ()> {
        use std::time::SystemTime;

        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|duration| duration.as_secs() as i64)
            .map(Self)
            .map_err(|e| {
                error!("couldn't get time: {e:?}");
            })
    }

    pub fn from_i64(secs: i64) -> Self {
        Self(secs)
    }

    pub fn plus_secs(self, secs: i64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn secs_until(self, later: Timestamp) -> i64 {
        later.0 - self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(fmt, "<epoch>");
        }

        use ::time::{format_description::well_known::Rfc3339, OffsetDateTime};

        let formatted = OffsetDateTime::from_unix_timestamp(self.0)
            .ok()
            .and_then(|when| when.format(&Rfc3339).ok());

        match formatted {
            Some(s) => write!(fmt, "{}", s),
            None => write!(fmt, "{}", self.0),
        }
    }
}

// calendar dates travel as "yyyy-MM-dd"
time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

pub fn parse_date(s: &str) -> Option<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dates_parse_strictly() {
        let d = parse_date("2026-02-28").unwrap();
        assert_eq!(d.year(), 2026);
        assert_eq!(u8::from(d.month()), 2);
        assert_eq!(d.day(), 28);

        assert!(parse_date(" 2026-01-05 ").is_some());
        assert!(parse_date("2026-02-30").is_none());
        assert!(parse_date("05/01/2026").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn dates_serialize_as_iso() {
        #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Dated {
            #[serde(with = "iso_date")]
            on: Date,
        }

        let dated = Dated { on: parse_date("2026-03-09").unwrap() };
        let json = serde_json::to_string(&dated).unwrap();
        assert_eq!(json, r#"{"on":"2026-03-09"}"#);
        assert_eq!(serde_json::from_str::<Dated>(&json).unwrap(), dated);

        assert!(serde_json::from_str::<Dated>(r#"{"on":"09/03/2026"}"#).is_err());
    }

    #[test]
    fn timestamp_arithmetic() {
        let t = Timestamp::from_i64(100);
        assert_eq!(t.plus_secs(50), Timestamp::from_i64(150));
        assert_eq!(t.secs_until(Timestamp::from_i64(130)), 30);
        assert_eq!(Timestamp::from_i64(i64::MAX).plus_secs(1), Timestamp::from_i64(i64::MAX));
    }
}
