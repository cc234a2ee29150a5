//! Response envelopes
//!
//! Some API versions wrap every payload in a container key (`{"data": ...}`).
//! [`Envelope::wrap`] and [`Envelope::unwrap`] are inverses for any resource.

use crate::error::{BackupError, Result};
use crate::resource::Resource;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Envelope {
    /// The body is the resource itself
    #[default]
    Bare,
    /// The body is `{ <key>: resource }`
    Keyed(String),
}

impl Envelope {
    pub fn from_key(key: Option<&str>) -> Self {
        match key {
            Some(k) if !k.is_empty() => Self::Keyed(k.to_string()),
            _ => Self::Bare,
        }
    }

    pub fn wrap(&self, resource: Resource) -> Value {
        match self {
            Self::Bare => Value::Object(resource),
            Self::Keyed(key) => {
                let mut outer = Resource::new();
                outer.insert(key.clone(), Value::Object(resource));
                Value::Object(outer)
            }
        }
    }

    pub fn unwrap(&self, body: Value) -> Result<Resource> {
        let inner = match (self, body) {
            (Self::Bare, body) => body,
            (Self::Keyed(key), Value::Object(mut map)) => {
                map.remove(key).ok_or_else(|| self.mismatch())?
            }
            (Self::Keyed(_), _) => return Err(self.mismatch()),
        };

        match inner {
            Value::Object(resource) => Ok(resource),
            _ => Err(self.mismatch()),
        }
    }

    fn mismatch(&self) -> BackupError {
        BackupError::EnvelopeMismatch {
            expected: match self {
                Self::Bare => "object".to_string(),
                Self::Keyed(key) => key.clone(),
            },
        }
    }
}
