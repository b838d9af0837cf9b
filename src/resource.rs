//! Resource identifiers of the form
//! `<application_name>/<resource_type>/<resource_id>`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("invalid resource identifier {0:?}: expected <application_name>/<resource_type>/<resource_id>")]
    Malformed(String),
    #[error("{0} must not contain '/'")]
    InvalidPart(&'static str),
}

/// Identifier of a resource owned by some application.
///
/// Only `resource_id` may contain `/`. The empty identifier encodes to the
/// empty string, and back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub application_name: String,
    pub resource_type: String,
    pub resource_id: String,
}

impl Identifier {
    pub fn new(
        application_name: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        let id = Self {
            application_name: application_name.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        };
        if id.application_name.contains('/') {
            return Err(IdentifierError::InvalidPart("application_name"));
        }
        if id.resource_type.contains('/') {
            return Err(IdentifierError::InvalidPart("resource_type"));
        }
        Ok(id)
    }

    pub fn is_empty(&self) -> bool {
        self.application_name.is_empty()
            && self.resource_type.is_empty()
            && self.resource_id.is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(
            f,
            "{}/{}/{}",
            self.application_name, self.resource_type, self.resource_id
        )
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        let mut parts = s.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(application_name), Some(resource_type), Some(resource_id)) => Ok(Self {
                application_name: application_name.to_string(),
                resource_type: resource_type.to_string(),
                resource_id: resource_id.to_string(),
            }),
            _ => Err(IdentifierError::Malformed(s.to_string())),
        }
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
