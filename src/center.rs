use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::validate;

pub type CenterId = i64;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Center {
    pub id: CenterId,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CenterInput {
    pub name: String,
    pub location: Option<String>,
}

/// A center's fields after boundary validation.
#[derive(Debug, Clone)]
pub struct CenterFields {
    pub name: String,
    pub location: Option<String>,
}

impl TryFrom<CenterInput> for CenterFields {
    type Error = &'static str;

    fn try_from(input: CenterInput) -> Result<Self, Self::Error> {
        let location = input
            .location
            .map(|l| validate::sanitize(&l, validate::MAX_NAME_LEN))
            .filter(|l| !l.is_empty());

        Ok(Self {
            name: validate::name(&input.name)?,
            location,
        })
    }
}

/// What deleting a center does to its coaches and monthly records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DeletePolicy {
    /// Remove records, coaches and their leaves along with the center.
    #[default]
    Cascade,
    /// Refuse while any coach or record still references the center.
    Block,
}
