//! Value coercion between engine values and record fields
//!
//! [`FieldValue`] is implemented for the scalar types a record may hold.
//! Enumerations opt in through [`named_enum!`](crate::named_enum), which
//! stores the member name as text and accepts either the name or the ordinal
//! when reading.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::Value;

/// Low-level conversion failures
///
/// Converted into a `Mapping` [`DalError`](crate::errors::DalError) by the
/// mapper, which adds the column name.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    #[error("cannot convert {found} value to {target}")]
    Incompatible {
        target: &'static str,
        found: &'static str,
    },

    #[error("value {value} is out of range for {target}")]
    OutOfRange { target: &'static str, value: String },

    #[error("cannot parse '{text}' as {target}")]
    Unparsable { target: &'static str, text: String },

    #[error("'{name}' is not a member of {target}")]
    UnknownMember { target: &'static str, name: String },

    #[error("null is not allowed for {target}")]
    UnexpectedNull { target: &'static str },

    #[error("intermediate object '{path}' is not set")]
    NullIntermediate { path: String },
}

/// Broad column kind of a field, as declared by its Rust type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Integer,
    Real,
    Boolean,
    Text,
    Blob,
    Uuid,
    Timestamp,
    Date,
    Enum,
}

/// A Rust type that can be stored in a single column
pub trait FieldValue: Sized {
    const KIND: ColumnKind;
    const TYPE_NAME: &'static str;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    /// # Errors
    /// Returns a [`ConvertError`] when `value` cannot represent `Self`.
    fn from_value(value: Value) -> Result<Self, ConvertError>;
}

fn incompatible(target: &'static str, value: &Value) -> ConvertError {
    ConvertError::Incompatible {
        target,
        found: value.type_name(),
    }
}

fn unparsable(target: &'static str, text: &str) -> ConvertError {
    ConvertError::Unparsable {
        target,
        text: text.to_string(),
    }
}

fn integral(target: &'static str, value: Value) -> Result<i64, ConvertError> {
    match value {
        Value::Integer(i) => Ok(i),
        Value::Real(f) if f.is_finite() && f.fract() == 0.0 => {
            // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
            if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(f as i64)
            } else {
                Err(ConvertError::OutOfRange {
                    target,
                    value: f.to_string(),
                })
            }
        }
        Value::Real(f) => Err(ConvertError::OutOfRange {
            target,
            value: f.to_string(),
        }),
        Value::Text(s) => s.trim().parse::<i64>().map_err(|_| unparsable(target, &s)),
        Value::Null => Err(ConvertError::UnexpectedNull { target }),
        other => Err(incompatible(target, &other)),
    }
}

macro_rules! integer_field {
    ($($t:ty),+) => {
        $(
            impl FieldValue for $t {
                const KIND: ColumnKind = ColumnKind::Integer;
                const TYPE_NAME: &'static str = stringify!($t);

                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, ConvertError> {
                    let wide = integral(Self::TYPE_NAME, value)?;
                    <$t>::try_from(wide).map_err(|_| ConvertError::OutOfRange {
                        target: Self::TYPE_NAME,
                        value: wide.to_string(),
                    })
                }
            }
        )+
    };
}

integer_field!(i8, i16, i32, i64, u8, u16, u32);

impl FieldValue for f64 {
    const KIND: ColumnKind = ColumnKind::Real;
    const TYPE_NAME: &'static str = "f64";

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Real(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| unparsable(Self::TYPE_NAME, &s)),
            Value::Null => Err(ConvertError::UnexpectedNull {
                target: Self::TYPE_NAME,
            }),
            other => Err(incompatible(Self::TYPE_NAME, &other)),
        }
    }
}

impl FieldValue for f32 {
    const KIND: ColumnKind = ColumnKind::Real;
    const TYPE_NAME: &'static str = "f32";

    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        f64::from_value(value)
            .map(|f| f as f32)
            .map_err(|e| match e {
                ConvertError::Incompatible { found, .. } => ConvertError::Incompatible {
                    target: Self::TYPE_NAME,
                    found,
                },
                other => other,
            })
    }
}

impl FieldValue for bool {
    const KIND: ColumnKind = ColumnKind::Boolean;
    const TYPE_NAME: &'static str = "bool";

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Integer(i) => Ok(i != 0),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(unparsable(Self::TYPE_NAME, &s)),
            },
            Value::Null => Err(ConvertError::UnexpectedNull {
                target: Self::TYPE_NAME,
            }),
            other => Err(incompatible(Self::TYPE_NAME, &other)),
        }
    }
}

impl FieldValue for String {
    const KIND: ColumnKind = ColumnKind::Text;
    const TYPE_NAME: &'static str = "String";

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Real(f) => Ok(f.to_string()),
            Value::Blob(bytes) => {
                String::from_utf8(bytes).map_err(|_| unparsable(Self::TYPE_NAME, "<binary>"))
            }
            Value::Null => Err(ConvertError::UnexpectedNull {
                target: Self::TYPE_NAME,
            }),
        }
    }
}

impl FieldValue for Uuid {
    const KIND: ColumnKind = ColumnKind::Uuid;
    const TYPE_NAME: &'static str = "Uuid";

    fn to_value(&self) -> Value {
        Value::Text(self.hyphenated().to_string())
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Text(s) => Uuid::parse_str(s.trim()).map_err(|_| unparsable(Self::TYPE_NAME, &s)),
            Value::Blob(bytes) => {
                Uuid::from_slice(&bytes).map_err(|_| ConvertError::OutOfRange {
                    target: Self::TYPE_NAME,
                    value: format!("{} bytes", bytes.len()),
                })
            }
            Value::Null => Err(ConvertError::UnexpectedNull {
                target: Self::TYPE_NAME,
            }),
            other => Err(incompatible(Self::TYPE_NAME, &other)),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    const KIND: ColumnKind = ColumnKind::Timestamp;
    const TYPE_NAME: &'static str = "DateTime<Utc>";

    fn to_value(&self) -> Value {
        Value::Text(self.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Text(s) => parse_timestamp(s.trim()).ok_or_else(|| unparsable(Self::TYPE_NAME, &s)),
            Value::Integer(secs) => {
                Utc.timestamp_opt(secs, 0)
                    .single()
                    .ok_or_else(|| ConvertError::OutOfRange {
                        target: Self::TYPE_NAME,
                        value: secs.to_string(),
                    })
            }
            Value::Null => Err(ConvertError::UnexpectedNull {
                target: Self::TYPE_NAME,
            }),
            other => Err(incompatible(Self::TYPE_NAME, &other)),
        }
    }
}

// RFC 3339 first, then SQLite's own CURRENT_TIMESTAMP layout
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl FieldValue for NaiveDate {
    const KIND: ColumnKind = ColumnKind::Date;
    const TYPE_NAME: &'static str = "NaiveDate";

    fn to_value(&self) -> Value {
        Value::Text(self.format("%Y-%m-%d").to_string())
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| unparsable(Self::TYPE_NAME, &s)),
            Value::Null => Err(ConvertError::UnexpectedNull {
                target: Self::TYPE_NAME,
            }),
            other => Err(incompatible(Self::TYPE_NAME, &other)),
        }
    }
}

impl FieldValue for Vec<u8> {
    const KIND: ColumnKind = ColumnKind::Blob;
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Blob(bytes) => Ok(bytes),
            Value::Text(s) => Ok(s.into_bytes()),
            Value::Null => Err(ConvertError::UnexpectedNull {
                target: Self::TYPE_NAME,
            }),
            other => Err(incompatible(Self::TYPE_NAME, &other)),
        }
    }
}

impl<V: FieldValue> FieldValue for Option<V> {
    const KIND: ColumnKind = V::KIND;
    const TYPE_NAME: &'static str = V::TYPE_NAME;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        if value.is_null() {
            return Ok(None);
        }
        V::from_value(value).map(Some)
    }
}

/// A fieldless enum addressable by member name and ordinal
///
/// Implemented by [`named_enum!`](crate::named_enum).
pub trait NamedEnum: Sized + Copy + 'static {
    const TYPE_NAME: &'static str;

    /// Members in declaration order; the index is the ordinal
    fn members() -> &'static [Self];

    fn name(&self) -> &'static str;

    /// Member whose name equals `name` exactly; letter case counts
    fn from_name(name: &str) -> Option<Self> {
        Self::members().iter().find(|m| m.name() == name).copied()
    }

    fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::members().get(i))
            .copied()
    }
}

/// Store an enum member as its name
pub fn enum_to_value<E: NamedEnum>(member: &E) -> Value {
    Value::Text(member.name().to_string())
}

/// Read an enum member from its name or ordinal
///
/// # Errors
/// [`ConvertError::UnknownMember`] when neither the name nor the ordinal
/// matches a member.
pub fn enum_from_value<E: NamedEnum>(value: Value) -> Result<E, ConvertError> {
    match value {
        Value::Text(s) => {
            let trimmed = s.trim();
            let found = E::from_name(trimmed)
                .or_else(|| trimmed.parse::<i64>().ok().and_then(E::from_ordinal));
            found.ok_or(ConvertError::UnknownMember {
                target: E::TYPE_NAME,
                name: s,
            })
        }
        Value::Integer(i) => E::from_ordinal(i).ok_or_else(|| ConvertError::UnknownMember {
            target: E::TYPE_NAME,
            name: i.to_string(),
        }),
        Value::Null => Err(ConvertError::UnexpectedNull {
            target: E::TYPE_NAME,
        }),
        other => Err(incompatible(E::TYPE_NAME, &other)),
    }
}

/// Declare a fieldless enum usable as a record field
///
/// Generates the enum with `Debug, Clone, Copy, PartialEq, Eq, Hash`, plus
/// [`NamedEnum`] and [`FieldValue`] implementations. Extra attributes
/// (including `#[derive(Default)]` and `#[default]`) pass through.
///
/// ```ignore
/// dalkit_core::named_enum! {
///     #[derive(Default)]
///     pub enum Status { #[default] Active, Discontinued }
/// }
/// ```
#[macro_export]
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::convert::NamedEnum for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn members() -> &'static [Self] {
                &[$( $name::$variant ),+]
            }

            fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant) ),+
                }
            }
        }

        impl $crate::convert::FieldValue for $name {
            const KIND: $crate::convert::ColumnKind = $crate::convert::ColumnKind::Enum;
            const TYPE_NAME: &'static str = stringify!($name);

            fn to_value(&self) -> $crate::model::Value {
                $crate::convert::enum_to_value(self)
            }

            fn from_value(
                value: $crate::model::Value,
            ) -> ::std::result::Result<Self, $crate::convert::ConvertError> {
                $crate::convert::enum_from_value(value)
            }
        }
    };
}
