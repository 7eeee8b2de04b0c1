//! Attribute values carried on nodes and edges.
//!
//! Producers attach whatever they computed upstream (centrality scores, colors,
//! message ids, domain objects) to graph elements. On the way to the wire every
//! value is reduced to JSON by [`make_serializable`], dispatching over a closed
//! set of shapes:
//!
//! - **Atomic** ([`AttrValue::Atomic`]) - emitted unchanged
//! - **Mapping-like** ([`AttrValue::Map`], [`AttrValue::MappingLike`]) - converted,
//!   values recursed, keys preserved
//! - **Field-bearing** ([`AttrValue::FieldBearing`]) - public fields, recursed
//! - **Opaque** ([`AttrValue::Opaque`]) - display string (lossy, best-effort)
//!
//! A falsy top-level value (`null`, `false`, `0`, `0.0`, `""`, empty
//! collections) counts as absent. Values nested inside a mapping or list are
//! kept as they are, so `{x: 3, y: 0}` stays `{"x": 3, "y": 0}`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::warn;

/// Attribute mapping of a node or edge, ordered by key.
pub type Attrs = BTreeMap<String, AttrValue>;

/// Deepest nesting [`make_serializable`] follows before giving up.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Failures while reducing one attribute value to JSON.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The serialization helper was handed no value for a key that required one.
    #[error("No value supplied for attribute '{key}'")]
    MissingValue {
        /// Attribute key that was looked up
        key: String,
    },

    /// Nesting exceeded [`MAX_NESTING_DEPTH`], usually a self-referencing value.
    #[error("Attribute value nested deeper than {limit} levels")]
    TooDeep {
        /// Depth limit that was exceeded
        limit: usize,
    },
}

/// Terminal attribute values.
#[derive(Debug, Clone, PartialEq)]
pub enum Atomic {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Atomic {
    fn is_falsy(&self) -> bool {
        match self {
            Atomic::Bool(b) => !b,
            Atomic::Int(i) => *i == 0,
            Atomic::Float(x) => *x == 0.0,
            Atomic::Str(s) => s.is_empty(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Atomic::Bool(b) => Value::Bool(*b),
            Atomic::Int(i) => Value::Number((*i).into()),
            // NaN and infinities have no JSON number form
            Atomic::Float(x) => Number::from_f64(*x)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(x.to_string())),
            Atomic::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Atomic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atomic::Bool(b) => write!(f, "{}", b),
            Atomic::Int(i) => write!(f, "{}", i),
            Atomic::Float(x) => write!(f, "{}", x),
            Atomic::Str(s) => f.write_str(s),
        }
    }
}

/// A value that can convert itself into an attribute mapping.
///
/// Conversion may fail; the value then degrades to its display string.
pub trait MappingLike: fmt::Debug + fmt::Display + Send + Sync {
    /// Produce the mapping form of this value.
    fn to_mapping(&self) -> anyhow::Result<Attrs>;
}

/// A value that enumerates its own named fields.
///
/// Field names starting with `_` are private and are dropped during encoding.
pub trait FieldBearing: fmt::Debug + fmt::Display + Send + Sync {
    /// All fields of this value, public and private.
    fn fields(&self) -> Vec<(String, AttrValue)>;
}

/// Anything with a display form. Blanket-implemented.
pub trait Opaque: fmt::Debug + fmt::Display + Send + Sync {}

impl<T: fmt::Debug + fmt::Display + Send + Sync> Opaque for T {}

/// An attribute value of any supported shape.
#[derive(Debug, Clone)]
pub enum AttrValue {
    Null,
    Atomic(Atomic),
    /// Plain nested mapping.
    Map(Attrs),
    /// Ordered sequence; elements are encoded individually.
    List(Vec<AttrValue>),
    MappingLike(Arc<dyn MappingLike>),
    FieldBearing(Arc<dyn FieldBearing>),
    Opaque(Arc<dyn Opaque>),
}

impl AttrValue {
    /// Wrap a value exposing a mapping conversion.
    pub fn mapping(value: impl MappingLike + 'static) -> Self {
        AttrValue::MappingLike(Arc::new(value))
    }

    /// Wrap a value exposing its fields.
    pub fn fields(value: impl FieldBearing + 'static) -> Self {
        AttrValue::FieldBearing(Arc::new(value))
    }

    /// Wrap a value that is only ever shown by its display string.
    pub fn opaque(value: impl Opaque + 'static) -> Self {
        AttrValue::Opaque(Arc::new(value))
    }

    /// Whether this value counts as absent.
    pub fn is_falsy(&self) -> bool {
        match self {
            AttrValue::Null => true,
            AttrValue::Atomic(a) => a.is_falsy(),
            AttrValue::Map(m) => m.is_empty(),
            AttrValue::List(items) => items.is_empty(),
            AttrValue::MappingLike(_) | AttrValue::FieldBearing(_) | AttrValue::Opaque(_) => false,
        }
    }

    /// Borrow the string content of an atomic string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Atomic(Atomic::Str(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => f.write_str("null"),
            AttrValue::Atomic(a) => fmt::Display::fmt(a, f),
            AttrValue::Map(_) | AttrValue::List(_) => {
                let json = make_serializable(self).ok().flatten().unwrap_or(Value::Null);
                write!(f, "{}", json)
            }
            AttrValue::MappingLike(v) => fmt::Display::fmt(v, f),
            AttrValue::FieldBearing(v) => fmt::Display::fmt(v, f),
            AttrValue::Opaque(v) => fmt::Display::fmt(v, f),
        }
    }
}

/// Reduce an attribute value to JSON.
///
/// Returns `Ok(None)` when the value itself is falsy. Nested values keep their
/// keys and positions whatever they hold.
///
/// # Errors
///
/// [`EncodeError::TooDeep`] when the value nests deeper than
/// [`MAX_NESTING_DEPTH`].
pub fn make_serializable(value: &AttrValue) -> Result<Option<Value>, EncodeError> {
    if value.is_falsy() {
        return Ok(None);
    }
    to_json(value, 0).map(Some)
}

/// Serialize a looked-up attribute.
///
/// `value` must be present: passing `None` is a caller bug reported as
/// [`EncodeError::MissingValue`]. A present but falsy value yields `Ok(None)`.
pub fn serialize_attr(key: &str, value: Option<&AttrValue>) -> Result<Option<Value>, EncodeError> {
    let value = value.ok_or_else(|| EncodeError::MissingValue {
        key: key.to_string(),
    })?;
    make_serializable(value)
}

fn to_json(value: &AttrValue, depth: usize) -> Result<Value, EncodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(EncodeError::TooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }

    let json = match value {
        AttrValue::Null => Value::Null,
        AttrValue::Atomic(a) => a.to_json(),
        AttrValue::Map(attrs) => Value::Object(entries_to_json(attrs.iter(), depth)?),
        AttrValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| to_json(item, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        AttrValue::MappingLike(v) => match v.to_mapping() {
            Ok(attrs) => Value::Object(entries_to_json(attrs.iter(), depth)?),
            Err(e) => {
                warn!("Mapping conversion failed for {:?}, using display form: {:#}", v, e);
                Value::String(v.to_string())
            }
        },
        AttrValue::FieldBearing(v) => {
            let fields = v.fields();
            let public = fields
                .iter()
                .filter(|(name, _)| !name.starts_with('_'))
                .map(|(name, value)| (name, value));
            Value::Object(entries_to_json(public, depth)?)
        }
        AttrValue::Opaque(v) => Value::String(v.to_string()),
    };

    Ok(json)
}

fn entries_to_json<'a>(
    entries: impl Iterator<Item = (&'a String, &'a AttrValue)>,
    depth: usize,
) -> Result<Map<String, Value>, EncodeError> {
    entries
        .map(|(k, v)| to_json(v, depth + 1).map(|json| (k.clone(), json)))
        .collect()
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Atomic(Atomic::Str(s.to_string()))
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Atomic(Atomic::Str(s))
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Atomic(Atomic::Bool(b))
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for AttrValue {
            fn from(i: $t) -> Self {
                AttrValue::Atomic(Atomic::Int(i64::from(i)))
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! from_wide_int {
    ($($t:ty),*) => {
        $(impl From<$t> for AttrValue {
            fn from(i: $t) -> Self {
                match i64::try_from(i) {
                    Ok(i) => AttrValue::Atomic(Atomic::Int(i)),
                    Err(_) => AttrValue::Atomic(Atomic::Str(i.to_string())),
                }
            }
        })*
    };
}

from_wide_int!(u64, usize, isize);

impl From<f32> for AttrValue {
    fn from(x: f32) -> Self {
        AttrValue::Atomic(Atomic::Float(f64::from(x)))
    }
}

impl From<f64> for AttrValue {
    fn from(x: f64) -> Self {
        AttrValue::Atomic(Atomic::Float(x))
    }
}

impl From<Attrs> for AttrValue {
    fn from(attrs: Attrs) -> Self {
        AttrValue::Map(attrs)
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(items: Vec<T>) -> Self {
        AttrValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttrValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug)]
    struct Position {
        x: i64,
        y: i64,
    }

    impl fmt::Display for Position {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Position({}, {})", self.x, self.y)
        }
    }

    impl MappingLike for Position {
        fn to_mapping(&self) -> anyhow::Result<Attrs> {
            Ok(Attrs::from([
                ("x".to_string(), self.x.into()),
                ("y".to_string(), self.y.into()),
            ]))
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("<broken>")
        }
    }

    impl MappingLike for Broken {
        fn to_mapping(&self) -> anyhow::Result<Attrs> {
            anyhow::bail!("no mapping today")
        }
    }

    #[derive(Debug)]
    struct Sensor {
        kind: String,
        reading: f64,
        calibration: i64,
    }

    impl fmt::Display for Sensor {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Sensor<{}>", self.kind)
        }
    }

    impl FieldBearing for Sensor {
        fn fields(&self) -> Vec<(String, AttrValue)> {
            vec![
                ("kind".to_string(), self.kind.clone().into()),
                ("reading".to_string(), self.reading.into()),
                ("_calibration".to_string(), self.calibration.into()),
            ]
        }
    }

    #[derive(Debug)]
    struct Recursive;

    impl fmt::Display for Recursive {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("recursive")
        }
    }

    impl MappingLike for Recursive {
        fn to_mapping(&self) -> anyhow::Result<Attrs> {
            Ok(Attrs::from([("again".to_string(), AttrValue::mapping(Recursive))]))
        }
    }

    fn serializable(value: &AttrValue) -> Option<Value> {
        make_serializable(value).expect("value should serialize")
    }

    #[test]
    fn test_atomic_values_are_identity() {
        assert_eq!(serializable(&"hello".into()), Some(json!("hello")));
        assert_eq!(serializable(&42i64.into()), Some(json!(42)));
        assert_eq!(serializable(&(-7i32).into()), Some(json!(-7)));
        assert_eq!(serializable(&0.375f64.into()), Some(json!(0.375)));
        assert_eq!(serializable(&true.into()), Some(json!(true)));
    }

    #[test]
    fn test_falsy_values_are_absent() {
        let falsy: Vec<AttrValue> = vec![
            AttrValue::Null,
            "".into(),
            0i64.into(),
            0.0f64.into(),
            false.into(),
            Attrs::new().into(),
            AttrValue::List(Vec::new()),
            Option::<i64>::None.into(),
        ];
        for value in &falsy {
            assert!(value.is_falsy(), "{:?} should be falsy", value);
            assert_eq!(serializable(value), None);
        }
    }

    #[test]
    fn test_mapping_like_keeps_every_key() {
        let value = AttrValue::mapping(Position { x: 3, y: 0 });
        assert_eq!(serializable(&value), Some(json!({"x": 3, "y": 0})));
    }

    #[test]
    fn test_failed_mapping_conversion_falls_back_to_display() {
        let value = AttrValue::mapping(Broken);
        assert_eq!(serializable(&value), Some(json!("<broken>")));
    }

    #[test]
    fn test_field_bearing_drops_private_fields() {
        let value = AttrValue::fields(Sensor {
            kind: "thermal".to_string(),
            reading: 21.5,
            calibration: 3,
        });
        assert_eq!(
            serializable(&value),
            Some(json!({"kind": "thermal", "reading": 21.5}))
        );
    }

    #[test]
    fn test_opaque_uses_display_string() {
        let addr: std::net::Ipv4Addr = "10.0.0.1".parse().unwrap();
        assert_eq!(serializable(&AttrValue::opaque(addr)), Some(json!("10.0.0.1")));
    }

    #[test]
    fn test_nested_map_and_list_keep_falsy_entries() {
        let inner = Attrs::from([
            ("team".to_string(), "qa".into()),
            ("empty".to_string(), "".into()),
            ("missing".to_string(), AttrValue::Null),
        ]);
        let value = AttrValue::Map(Attrs::from([
            ("meta".to_string(), inner.into()),
            ("tags".to_string(), vec!["a", "", "b"].into()),
            ("flags".to_string(), vec![true, false].into()),
        ]));
        assert_eq!(
            serializable(&value),
            Some(json!({
                "meta": {"empty": "", "missing": null, "team": "qa"},
                "tags": ["a", "", "b"],
                "flags": [true, false]
            }))
        );
    }

    #[test]
    fn test_self_referencing_value_is_rejected() {
        let err = make_serializable(&AttrValue::mapping(Recursive)).unwrap_err();
        assert!(matches!(err, EncodeError::TooDeep { limit: MAX_NESTING_DEPTH }));
        assert_eq!(err.to_string(), "Attribute value nested deeper than 32 levels");
    }

    #[test]
    fn test_non_finite_float_becomes_string() {
        assert_eq!(serializable(&f64::NAN.into()), Some(json!("NaN")));
        assert_eq!(serializable(&f64::INFINITY.into()), Some(json!("inf")));
    }

    #[test]
    fn test_wide_integers_that_overflow_become_strings() {
        assert_eq!(serializable(&u64::MAX.into()), Some(json!(u64::MAX.to_string())));
        assert_eq!(serializable(&7usize.into()), Some(json!(7)));
    }

    #[test]
    fn test_serialize_attr_requires_a_value() {
        let err = serialize_attr("color", None).unwrap_err();
        assert_eq!(err.to_string(), "No value supplied for attribute 'color'");

        let value: AttrValue = "red".into();
        assert_eq!(serialize_attr("color", Some(&value)).unwrap(), Some(json!("red")));
        let value: AttrValue = "".into();
        assert_eq!(serialize_attr("color", Some(&value)).unwrap(), None);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(AttrValue::from("X").to_string(), "X");
        assert_eq!(AttrValue::from(5i64).to_string(), "5");
        assert_eq!(AttrValue::mapping(Position { x: 1, y: 2 }).to_string(), "Position(1, 2)");
        let map = AttrValue::Map(Attrs::from([("k".to_string(), 1i64.into())]));
        assert_eq!(map.to_string(), r#"{"k":1}"#);
    }
}
