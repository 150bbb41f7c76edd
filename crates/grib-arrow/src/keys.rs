//! Typed, defaulting key lookups over one message.
//!
//! [`KeyAccessor::try_get`] is the single "does this key exist" primitive.
//! The `*_or_default` accessors coerce its result and substitute a default
//! when the key is absent or cannot be coerced. An absent key is never an
//! error.

use grib2_parser::{Grib2Message, KeyValue};
use tracing::{debug, warn};

/// Default for absent integer keys.
pub const MISSING_NUMERIC: i64 = -9999;

/// A type a [`KeyValue`] can be coerced into.
pub trait FromKeyValue: Sized {
    /// Name used in log messages.
    const TYPE_NAME: &'static str;

    fn from_key_value(value: &KeyValue) -> Option<Self>;

    /// Value substituted when a key is absent.
    fn missing() -> Self;
}

impl FromKeyValue for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn from_key_value(value: &KeyValue) -> Option<Self> {
        match value {
            KeyValue::Int(v) => Some(*v),
            KeyValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            KeyValue::Float(_) => None,
            KeyValue::Str(s) => s.trim().parse().ok(),
        }
    }

    fn missing() -> Self {
        MISSING_NUMERIC
    }
}

impl FromKeyValue for f64 {
    const TYPE_NAME: &'static str = "double";

    fn from_key_value(value: &KeyValue) -> Option<Self> {
        match value {
            KeyValue::Int(v) => Some(*v as f64),
            KeyValue::Float(v) => Some(*v),
            KeyValue::Str(s) => s.trim().parse().ok(),
        }
    }

    fn missing() -> Self {
        f64::NAN
    }
}

impl FromKeyValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_key_value(value: &KeyValue) -> Option<Self> {
        Some(value.to_string())
    }

    fn missing() -> Self {
        String::new()
    }
}

/// Key lookups scoped to one message.
#[derive(Debug, Clone, Copy)]
pub struct KeyAccessor<'m> {
    message: &'m Grib2Message,
}

impl<'m> KeyAccessor<'m> {
    pub fn new(message: &'m Grib2Message) -> Self {
        Self { message }
    }

    /// The key's value in its natural type, or `None` if the message does
    /// not carry it.
    pub fn try_get(&self, key: &str) -> Option<KeyValue> {
        self.message.key(key)
    }

    /// The key coerced to `T`, or `None` if absent or not coercible.
    pub fn get<T: FromKeyValue>(&self, key: &str) -> Option<T> {
        let value = self.try_get(key)?;
        let coerced = T::from_key_value(&value);
        if coerced.is_none() {
            debug!(key, value = %value, target_type = T::TYPE_NAME, "Key not coercible");
        }
        coerced
    }

    /// Integer value of `key`, or `default` (-9999 when `None`).
    ///
    /// A key that is present but not an integer, such as `shortName`, also
    /// yields the default, so [`try_get`](Self::try_get) may be `Some` here.
    pub fn get_numeric_or_default(&self, key: &str, default: impl Into<Option<i64>>) -> i64 {
        self.get(key)
            .unwrap_or_else(|| default.into().unwrap_or(MISSING_NUMERIC))
    }

    /// Floating-point value of `key`, or `default` (NaN when `None`).
    ///
    /// A key that is present but not numeric also yields the default.
    pub fn get_double_or_default(&self, key: &str, default: impl Into<Option<f64>>) -> f64 {
        self.get(key)
            .unwrap_or_else(|| default.into().unwrap_or(f64::NAN))
    }

    /// String value of `key`, or `default` (empty when `None`).
    ///
    /// Every present key converts to a string, so only an absent key
    /// yields the default.
    pub fn get_string_or_default<'d>(
        &self,
        key: &str,
        default: impl Into<Option<&'d str>>,
    ) -> String {
        self.get(key)
            .unwrap_or_else(|| default.into().unwrap_or_default().to_string())
    }

    /// Well-known keys every decoded message is expected to carry. Falls
    /// back to the type's missing value, with a warning, if it does not.
    pub(crate) fn required<T: FromKeyValue>(&self, key: &str) -> T {
        match self.get(key) {
            Some(value) => value,
            None => {
                warn!(key, "Expected key missing from message");
                T::missing()
            }
        }
    }

    /// Every key present on the message.
    pub fn keys(&self) -> impl Iterator<Item = (&'static str, KeyValue)> + 'm {
        self.message.keys()
    }
}
