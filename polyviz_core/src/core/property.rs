//! Declarative property tables
//!
//! A display describes its editable parameters once, as a table of named
//! entries holding a getter/setter closure pair plus a type and valid range.
//! Hosts (inspector panels, config loaders) go through the table and never
//! touch display fields directly.

use crate::error::{VizError, VizResult};
use crate::scene::Color;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// A property value crossing the host boundary
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Float(f32),
    Color(Color),
    Enum(String),
    String(String),
}

impl PropertyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Float(_) => "float",
            PropertyValue::Color(_) => "color",
            PropertyValue::Enum(_) => "enum",
            PropertyValue::String(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            PropertyValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Enum(v) | PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Bool(v) => json!(v),
            PropertyValue::Float(v) => json!(v),
            PropertyValue::Color(c) => json!([c.r, c.g, c.b]),
            PropertyValue::Enum(v) | PropertyValue::String(v) => json!(v),
        }
    }

    /// Parse a config value according to the declared kind
    ///
    /// Colors are accepted as `[r, g, b]` or `{r, g, b}`.
    pub fn from_json(property: &str, kind: &PropertyKind, value: &Value) -> VizResult<Self> {
        let mismatch = || VizError::PropertyType {
            property: property.to_string(),
            expected: kind.type_name(),
            found: json_type_name(value),
        };

        match kind {
            PropertyKind::Bool => value.as_bool().map(PropertyValue::Bool).ok_or_else(mismatch),
            PropertyKind::Float { .. } => value
                .as_f64()
                .map(|v| PropertyValue::Float(v as f32))
                .ok_or_else(mismatch),
            PropertyKind::Color => match value {
                Value::Array(items) if items.len() == 3 => {
                    let mut rgb = [0.0f32; 3];
                    for (slot, item) in rgb.iter_mut().zip(items) {
                        *slot = item.as_f64().ok_or_else(mismatch)? as f32;
                    }
                    Ok(PropertyValue::Color(Color::new(rgb[0], rgb[1], rgb[2])))
                }
                Value::Object(_) => Ok(PropertyValue::Color(serde_json::from_value(value.clone())?)),
                _ => Err(mismatch()),
            },
            PropertyKind::Enum(_) => value
                .as_str()
                .map(|s| PropertyValue::Enum(s.to_string()))
                .ok_or_else(mismatch),
            PropertyKind::String | PropertyKind::Topic => value
                .as_str()
                .map(|s| PropertyValue::String(s.to_string()))
                .ok_or_else(mismatch),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Float(v) => write!(f, "{:.3}", v),
            PropertyValue::Color(c) => write!(f, "({:.2}, {:.2}, {:.2})", c.r, c.g, c.b),
            PropertyValue::Enum(v) | PropertyValue::String(v) => write!(f, "{}", v),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declared type of a property, with its valid range where relevant
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Bool,
    Float { min: f32, max: f32 },
    Color,
    Enum(Vec<&'static str>),
    String,
    /// Name of a bus topic
    Topic,
}

impl PropertyKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyKind::Bool => "bool",
            PropertyKind::Float { .. } => "float",
            PropertyKind::Color => "color",
            PropertyKind::Enum(_) => "enum",
            PropertyKind::String | PropertyKind::Topic => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub kind: PropertyKind,
    pub help: &'static str,
}

/// Callback notified with the applied value after every successful set
pub type PropertyObserver = Arc<dyn Fn(&str, &PropertyValue) + Send + Sync>;

type Getter<D> = Box<dyn Fn(&D) -> PropertyValue + Send + Sync>;
type Setter<D> = Box<dyn Fn(&mut D, PropertyValue) -> VizResult<()> + Send + Sync>;

struct PropertyEntry<D> {
    descriptor: PropertyDescriptor,
    get: Getter<D>,
    set: Setter<D>,
}

/// Name -> {getter, setter, type, range} table for one display type `D`
///
/// Built once per display instance and shared behind an `Arc`, so callers
/// clone the `Arc` before handing `&mut D` to [`PropertyTable::set`].
pub struct PropertyTable<D> {
    entries: Vec<PropertyEntry<D>>,
}

impl<D: 'static> Default for PropertyTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for PropertyTable<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.descriptor.name))
            .finish()
    }
}

impl<D: 'static> PropertyTable<D> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn push(mut self, descriptor: PropertyDescriptor, get: Getter<D>, set: Setter<D>) -> Self {
        self.entries.push(PropertyEntry {
            descriptor,
            get,
            set,
        });
        self
    }

    pub fn bool<G, S>(self, name: &'static str, help: &'static str, get: G, set: S) -> Self
    where
        G: Fn(&D) -> bool + Send + Sync + 'static,
        S: Fn(&mut D, bool) + Send + Sync + 'static,
    {
        self.push(
            PropertyDescriptor {
                name,
                kind: PropertyKind::Bool,
                help,
            },
            Box::new(move |d| PropertyValue::Bool(get(d))),
            Box::new(move |d, v| {
                if let PropertyValue::Bool(v) = v {
                    set(d, v);
                }
                Ok(())
            }),
        )
    }

    /// Float property; values outside `[min, max]` are clamped on set
    pub fn float<G, S>(
        self,
        name: &'static str,
        help: &'static str,
        range: (f32, f32),
        get: G,
        set: S,
    ) -> Self
    where
        G: Fn(&D) -> f32 + Send + Sync + 'static,
        S: Fn(&mut D, f32) + Send + Sync + 'static,
    {
        self.push(
            PropertyDescriptor {
                name,
                kind: PropertyKind::Float {
                    min: range.0,
                    max: range.1,
                },
                help,
            },
            Box::new(move |d| PropertyValue::Float(get(d))),
            Box::new(move |d, v| {
                if let PropertyValue::Float(v) = v {
                    set(d, v);
                }
                Ok(())
            }),
        )
    }

    pub fn color<G, S>(self, name: &'static str, help: &'static str, get: G, set: S) -> Self
    where
        G: Fn(&D) -> Color + Send + Sync + 'static,
        S: Fn(&mut D, Color) + Send + Sync + 'static,
    {
        self.push(
            PropertyDescriptor {
                name,
                kind: PropertyKind::Color,
                help,
            },
            Box::new(move |d| PropertyValue::Color(get(d))),
            Box::new(move |d, v| {
                if let PropertyValue::Color(v) = v {
                    set(d, v);
                }
                Ok(())
            }),
        )
    }

    /// Choice among fixed labels; the setter only ever sees a listed label
    pub fn enumeration<G, S>(
        self,
        name: &'static str,
        help: &'static str,
        options: &[&'static str],
        get: G,
        set: S,
    ) -> Self
    where
        G: Fn(&D) -> &'static str + Send + Sync + 'static,
        S: Fn(&mut D, &str) + Send + Sync + 'static,
    {
        self.push(
            PropertyDescriptor {
                name,
                kind: PropertyKind::Enum(options.to_vec()),
                help,
            },
            Box::new(move |d| PropertyValue::Enum(get(d).to_string())),
            Box::new(move |d, v| {
                if let Some(label) = v.as_str() {
                    set(d, label);
                }
                Ok(())
            }),
        )
    }

    pub fn string<G, S>(self, name: &'static str, help: &'static str, get: G, set: S) -> Self
    where
        G: Fn(&D) -> String + Send + Sync + 'static,
        S: Fn(&mut D, &str) + Send + Sync + 'static,
    {
        self.push(
            PropertyDescriptor {
                name,
                kind: PropertyKind::String,
                help,
            },
            Box::new(move |d| PropertyValue::String(get(d))),
            Box::new(move |d, v| {
                if let Some(s) = v.as_str() {
                    set(d, s);
                }
                Ok(())
            }),
        )
    }

    /// Topic name; the setter may fail (for example on a type mismatch)
    pub fn topic<G, S>(self, name: &'static str, help: &'static str, get: G, set: S) -> Self
    where
        G: Fn(&D) -> String + Send + Sync + 'static,
        S: Fn(&mut D, &str) -> VizResult<()> + Send + Sync + 'static,
    {
        self.push(
            PropertyDescriptor {
                name,
                kind: PropertyKind::Topic,
                help,
            },
            Box::new(move |d| PropertyValue::String(get(d))),
            Box::new(move |d, v| match v.as_str() {
                Some(s) => set(d, s),
                None => Ok(()),
            }),
        )
    }

    fn entry(&self, name: &str) -> VizResult<&PropertyEntry<D>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.name == name)
            .ok_or_else(|| VizError::UnknownProperty(name.to_string()))
    }

    pub fn descriptors(&self) -> Vec<PropertyDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.entry(name).ok().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, target: &D, name: &str) -> VizResult<PropertyValue> {
        Ok((self.entry(name)?.get)(target))
    }

    /// Validate `value` against the declared kind and apply it
    ///
    /// Returns the value actually applied (floats are clamped into range).
    pub fn set(&self, target: &mut D, name: &str, value: PropertyValue) -> VizResult<PropertyValue> {
        let entry = self.entry(name)?;
        let value = coerce(name, &entry.descriptor.kind, value)?;
        (entry.set)(target, value.clone())?;
        Ok(value)
    }

    /// Apply a raw config value, parsing it by the declared kind
    pub fn set_json(&self, target: &mut D, name: &str, value: &Value) -> VizResult<PropertyValue> {
        let kind = self.entry(name)?.descriptor.kind.clone();
        let value = PropertyValue::from_json(name, &kind, value)?;
        self.set(target, name, value)
    }
}

fn coerce(name: &str, kind: &PropertyKind, value: PropertyValue) -> VizResult<PropertyValue> {
    let mismatch = |found: &PropertyValue| VizError::PropertyType {
        property: name.to_string(),
        expected: kind.type_name(),
        found: found.type_name(),
    };

    match (kind, value) {
        (PropertyKind::Bool, v @ PropertyValue::Bool(_)) => Ok(v),
        (PropertyKind::Float { min, max }, PropertyValue::Float(v)) => {
            if v.is_nan() {
                return Err(VizError::PropertyType {
                    property: name.to_string(),
                    expected: "float",
                    found: "NaN",
                });
            }
            Ok(PropertyValue::Float(v.clamp(*min, *max)))
        }
        (PropertyKind::Color, v @ PropertyValue::Color(_)) => Ok(v),
        (PropertyKind::Enum(options), PropertyValue::Enum(label) | PropertyValue::String(label)) => {
            if options.iter().any(|o| *o == label) {
                Ok(PropertyValue::Enum(label))
            } else {
                Err(VizError::InvalidOption {
                    property: name.to_string(),
                    value: label,
                })
            }
        }
        (PropertyKind::String | PropertyKind::Topic, PropertyValue::String(s)) => {
            Ok(PropertyValue::String(s))
        }
        (_, other) => Err(mismatch(&other)),
    }
}
