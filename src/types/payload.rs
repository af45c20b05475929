//! Request payloads keyed by wire-format field names.
//!
//! A [`Payload`] keeps insertion order, which is also the order of parts
//! in a multipart body and of keys in a JSON body. Keys must already be
//! the snake_case names the Bot API expects; nothing here converts case.

use crate::errors::{RequestError, TelegramResult};
use crate::types::InputFile;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A single payload value
#[derive(Debug)]
pub enum PayloadValue {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(serde_json::Number),
    /// String: a file_id, URL, local path or plain text
    String(String),
    /// Array, e.g. a media group
    Array(Vec<PayloadValue>),
    /// Nested structured object
    Object(Payload),
    /// Binary media
    Media(InputFile),
}

impl PayloadValue {
    /// Null, false, zero and the empty string are skipped by the multipart encoder
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Number(n) => n.as_f64().map_or(false, |v| v == 0.0),
            Self::String(s) => s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Media(_) => false,
        }
    }

    /// Borrow as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value is binary media
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Media(_))
    }
}

impl Serialize for PayloadValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(payload) => payload.serialize(serializer),
            Self::Media(_) => Err(S::Error::custom(
                "binary media cannot be embedded in a JSON body",
            )),
        }
    }
}

impl From<serde_json::Value> for PayloadValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(Payload {
                fields: map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            }),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PayloadValue {
                fn from(value: $ty) -> Self {
                    Self::Number(value.into())
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64);

impl From<f64> for PayloadValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<InputFile> for PayloadValue {
    fn from(value: InputFile) -> Self {
        Self::Media(value)
    }
}

impl From<Payload> for PayloadValue {
    fn from(value: Payload) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<PayloadValue>> From<Vec<T>> for PayloadValue {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PayloadValue>> From<Option<T>> for PayloadValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Insertion-ordered map from wire field name to value
#[derive(Debug, Default)]
pub struct Payload {
    fields: Vec<(String, PayloadValue)>,
}

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn field(mut self, name: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a value, replacing an existing one in place
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PayloadValue>,
    ) -> Option<PayloadValue> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Look up a field
    pub fn get(&self, name: &str) -> Option<&PayloadValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Look up a field mutably
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PayloadValue> {
        self.fields
            .iter_mut()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Remove a field
    pub fn remove(&mut self, name: &str) -> Option<PayloadValue> {
        let index = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(index).1)
    }

    /// Whether a field is present
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PayloadValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate fields mutably in insertion order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut PayloadValue)> {
        self.fields.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build from a JSON object
    pub fn from_json(value: serde_json::Value) -> TelegramResult<Self> {
        match PayloadValue::from(value) {
            PayloadValue::Object(payload) => Ok(payload),
            _ => Err(RequestError::NotAnObject.into()),
        }
    }

    /// Build from any serializable request struct
    pub fn from_serialize<T: Serialize>(value: &T) -> TelegramResult<Self> {
        let json = serde_json::to_value(value).map_err(RequestError::from)?;
        Self::from_json(json)
    }

    /// Reject keys that are not lowercase snake_case, recursing into nested objects
    pub fn validate_field_names(&self) -> TelegramResult<()> {
        for (name, value) in &self.fields {
            let wire_name = !name.is_empty()
                && name
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
            if !wire_name {
                return Err(RequestError::InvalidFieldName { name: name.clone() }.into());
            }
            validate_nested(value)?;
        }
        Ok(())
    }
}

fn validate_nested(value: &PayloadValue) -> TelegramResult<()> {
    match value {
        PayloadValue::Object(payload) => payload.validate_field_names(),
        PayloadValue::Array(items) => items.iter().try_for_each(validate_nested),
        _ => Ok(()),
    }
}

impl IntoIterator for Payload {
    type Item = (String, PayloadValue);
    type IntoIter = std::vec::IntoIter<(String, PayloadValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, PayloadValue)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, PayloadValue)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (name, value) in iter {
            payload.insert(name, value);
        }
        payload
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
