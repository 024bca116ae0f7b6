//! Loads lookup tables (profiles, advice, doctor assignments) from CSV exports.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::domain::{Doctor, RiskTier, UserId, UserProfile};
use super::memory::InMemoryStores;
use super::repository::StoreError;

pub const USERS_FILE: &str = "users.csv";
pub const ADVICE_FILE: &str = "advice.csv";
pub const DOCTORS_FILE: &str = "doctors.csv";

#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Csv(csv::Error),
    UnknownTier(String),
    InvalidUser(i64),
    Store(StoreError),
}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedError::Io(err) => write!(f, "failed to read seed file: {}", err),
            SeedError::Csv(err) => write!(f, "invalid seed CSV data: {}", err),
            SeedError::UnknownTier(label) => write!(f, "unknown risk level '{}'", label),
            SeedError::InvalidUser(id) => write!(f, "user id must be positive, got {}", id),
            SeedError::Store(err) => write!(f, "could not apply seed data: {}", err),
        }
    }
}

impl std::error::Error for SeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeedError::Io(err) => Some(err),
            SeedError::Csv(err) => Some(err),
            SeedError::Store(err) => Some(err),
            SeedError::UnknownTier(_) | SeedError::InvalidUser(_) => None,
        }
    }
}

impl From<std::io::Error> for SeedError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SeedError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<StoreError> for SeedError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

#[derive(Debug, Deserialize)]
struct UserRow {
    user_id: i64,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdviceRow {
    risk_level: String,
    advice: String,
}

#[derive(Debug, Deserialize)]
struct DoctorRow {
    user_id: i64,
    doctor_id: i64,
    doctor_name: String,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source)
}

fn positive(id: i64) -> Result<UserId, SeedError> {
    if id > 0 {
        Ok(UserId(id))
    } else {
        Err(SeedError::InvalidUser(id))
    }
}

/// Row counts applied by a seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub advice: usize,
    pub doctors: usize,
}

pub fn load_users<R: Read>(source: R, stores: &InMemoryStores) -> Result<usize, SeedError> {
    let mut count = 0;
    for row in reader(source).deserialize::<UserRow>() {
        let row = row?;
        stores.profiles.upsert(UserProfile {
            user_id: positive(row.user_id)?,
            name: row.name,
            email: row.email,
            date_of_birth: row.date_of_birth,
            phone_number: row.phone_number,
            address: row.address,
        })?;
        count += 1;
    }
    Ok(count)
}

pub fn load_advice<R: Read>(source: R, stores: &InMemoryStores) -> Result<usize, SeedError> {
    let mut count = 0;
    for row in reader(source).deserialize::<AdviceRow>() {
        let row = row?;
        let tier = RiskTier::parse(&row.risk_level)
            .ok_or_else(|| SeedError::UnknownTier(row.risk_level.clone()))?;
        stores.advice.set(tier, row.advice)?;
        count += 1;
    }
    Ok(count)
}

pub fn load_doctors<R: Read>(source: R, stores: &InMemoryStores) -> Result<usize, SeedError> {
    let mut count = 0;
    for row in reader(source).deserialize::<DoctorRow>() {
        let row = row?;
        stores.doctors.assign(
            positive(row.user_id)?,
            Doctor {
                doctor_id: row.doctor_id,
                name: row.doctor_name,
            },
        )?;
        count += 1;
    }
    Ok(count)
}

/// Apply every seed file present in `dir`. Absent files are skipped.
pub fn load_dir(dir: &Path, stores: &InMemoryStores) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    if let Some(file) = open_optional(&dir.join(USERS_FILE))? {
        summary.users = load_users(file, stores)?;
    }
    if let Some(file) = open_optional(&dir.join(ADVICE_FILE))? {
        summary.advice = load_advice(file, stores)?;
    }
    if let Some(file) = open_optional(&dir.join(DOCTORS_FILE))? {
        summary.doctors = load_doctors(file, stores)?;
    }

    info!(
        dir = %dir.display(),
        users = summary.users,
        advice = summary.advice,
        doctors = summary.doctors,
        "seed data loaded"
    );
    Ok(summary)
}

fn open_optional(path: &Path) -> Result<Option<File>, SeedError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "seed file absent; skipping");
            Ok(None)
        }
        Err(err) => Err(SeedError::Io(err)),
    }
}
