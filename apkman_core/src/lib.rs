use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod api;
pub mod models;

pub trait StrConversion {
    fn from_str(value: &str) -> Self;
    fn as_str(&self) -> &'static str;
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "USER")]
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}
impl StrConversion for Role {
    fn from_str(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "ADMIN" => Self::Admin,
            _ => Self::User,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

/// Server timestamp. The API emits either RFC 3339 with an offset or a
/// naive ISO-8601 datetime, which is taken as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub chrono::DateTime<chrono::Utc>);

impl Timestamp {
    pub fn parse(value: &str) -> Option<Self> {
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
            return Some(Timestamp(dt.with_timezone(&chrono::Utc)));
        }
        chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| Timestamp(naive.and_utc()))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Timestamp::parse(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", value)))
    }
}
