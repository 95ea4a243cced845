//! Typed attribute values and the codec that decodes them from the wire.
//!
//! Index documents carry every attribute as a `(value, type)` string pair.
//! `convert_attribute` is the only place that interprets the declared type so
//! new types can be added without touching the parser state machine. Decoding
//! is lenient on purpose: anything it cannot interpret stays a plain string.

use std::fmt;
use std::str::FromStr;

const TYPE_STRING: &str = "String";
const TYPE_VERSION: &str = "Version";
const TYPE_LONG: &str = "Long";
const TYPE_DOUBLE: &str = "Double";
const TYPE_STRING_LIST: &str = "List<String>";
const TYPE_VERSION_LIST: &str = "List<Version>";
const TYPE_LONG_LIST: &str = "List<Long>";
const TYPE_DOUBLE_LIST: &str = "List<Double>";

/// Decoded attribute value keyed by name on a capability or requirement.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    String(String),
    Version(Version),
    Long(i64),
    Double(f64),
    Strings(Vec<String>),
    Versions(Vec<Version>),
    Longs(Vec<i64>),
    Doubles(Vec<f64>),
}

impl AttributeValue {
    /// Borrow the value as text when it is a plain string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Wire name of the declared type; `None` for plain strings, which the
    /// format writes without a `type` attribute.
    pub fn declared_type(&self) -> Option<&'static str> {
        match self {
            AttributeValue::String(_) => None,
            AttributeValue::Version(_) => Some(TYPE_VERSION),
            AttributeValue::Long(_) => Some(TYPE_LONG),
            AttributeValue::Double(_) => Some(TYPE_DOUBLE),
            AttributeValue::Strings(_) => Some(TYPE_STRING_LIST),
            AttributeValue::Versions(_) => Some(TYPE_VERSION_LIST),
            AttributeValue::Longs(_) => Some(TYPE_LONG_LIST),
            AttributeValue::Doubles(_) => Some(TYPE_DOUBLE_LIST),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Version> for AttributeValue {
    fn from(value: Version) -> Self {
        AttributeValue::Version(value)
    }
}

impl fmt::Display for AttributeValue {
    /// Renders the wire `value` text; lists are comma separated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(value) => f.write_str(value),
            AttributeValue::Version(value) => write!(f, "{value}"),
            AttributeValue::Long(value) => write!(f, "{value}"),
            AttributeValue::Double(value) => write!(f, "{value}"),
            AttributeValue::Strings(values) => write_list(f, values),
            AttributeValue::Versions(values) => write_list(f, values),
            AttributeValue::Longs(values) => write_list(f, values),
            AttributeValue::Doubles(values) => write_list(f, values),
        }
    }
}

/// Items are comma separated; `,` and `\` inside an item are escaped with `\`.
fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            f.write_str(",")?;
        }
        for c in value.to_string().chars() {
            if matches!(c, ',' | '\\') {
                f.write_str("\\")?;
            }
            write!(f, "{c}")?;
        }
    }
    Ok(())
}

/// Decode a raw attribute value using its declared type.
///
/// Never fails. An absent type means string; an unknown type, or a value that
/// does not parse as its declared type, degrades to the raw string so that
/// documents written by newer generators still load.
pub fn convert_attribute(raw: &str, declared_type: Option<&str>) -> AttributeValue {
    let Some(declared) = declared_type.map(str::trim).filter(|t| !t.is_empty()) else {
        return AttributeValue::String(raw.to_string());
    };

    let decoded = match declared {
        TYPE_STRING => Some(AttributeValue::String(raw.to_string())),
        TYPE_VERSION => raw.parse().ok().map(AttributeValue::Version),
        TYPE_LONG => raw.trim().parse().ok().map(AttributeValue::Long),
        TYPE_DOUBLE => raw.trim().parse().ok().map(AttributeValue::Double),
        TYPE_STRING_LIST => Some(AttributeValue::Strings(split_list(raw))),
        TYPE_VERSION_LIST => parse_list(raw).map(AttributeValue::Versions),
        TYPE_LONG_LIST => parse_list(raw).map(AttributeValue::Longs),
        TYPE_DOUBLE_LIST => parse_list(raw).map(AttributeValue::Doubles),
        _ => None,
    };

    decoded.unwrap_or_else(|| {
        tracing::debug!(
            value = raw,
            declared_type = declared,
            "keeping attribute as string"
        );
        AttributeValue::String(raw.to_string())
    })
}

/// Inverse of `write_list`. An empty value is an empty list; otherwise every
/// item is kept, empty ones included.
fn split_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.push(chars.next().unwrap_or('\\')),
            ',' => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);
    items
}

fn parse_list<T: FromStr>(raw: &str) -> Option<Vec<T>> {
    split_list(raw)
        .iter()
        .map(|item| item.trim().parse().ok())
        .collect()
}

/// OSGi version: `major[.minor[.micro[.qualifier]]]`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
}

impl Version {
    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }
}

/// Returned when text is not a valid OSGi version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version '{0}'")]
pub struct InvalidVersion(pub String);

impl FromStr for Version {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let mut parts = trimmed.splitn(4, '.');
        let mut numeric = [0u32; 3];
        for slot in numeric.iter_mut() {
            match parts.next() {
                Some(part) => *slot = part.parse().map_err(|_| invalid())?,
                None => break,
            }
        }
        let qualifier = parts.next().unwrap_or_default();
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        {
            return Err(invalid());
        }

        Ok(Self {
            major: numeric[0],
            minor: numeric[1],
            micro: numeric[2],
            qualifier: qualifier.to_string(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}
