// The inference lattice.
//
// A Value is a type tag, an optional compile-time-known payload, and the
// container type parameters (extension types). Indeterminate is the top of
// the lattice; fully-known leaves are the bottom. The analysis pass folds
// expressions over these.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Closed set of value type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Indeterminate,

    // trivial types
    None,
    Bool,
    Int,
    Float,

    // built-in class types
    Bytes,
    Unicode,
    List,
    Tuple,
    Set,
    Dict,

    // static object types
    Function,
    Class,
    Instance,
    Module,

    // meta-types
    ExtensionTypeReference,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Indeterminate => "Indeterminate",
            ValueType::None => "None",
            ValueType::Bool => "Bool",
            ValueType::Int => "Int",
            ValueType::Float => "Float",
            ValueType::Bytes => "Bytes",
            ValueType::Unicode => "Unicode",
            ValueType::List => "List",
            ValueType::Tuple => "Tuple",
            ValueType::Set => "Set",
            ValueType::Dict => "Dict",
            ValueType::Function => "Function",
            ValueType::Class => "Class",
            ValueType::Instance => "Instance",
            ValueType::Module => "Module",
            ValueType::ExtensionTypeReference => "ExtensionTypeReference",
        }
    }

    /// Whether values of this type live on the refcounted heap.
    pub fn has_refcount(&self) -> bool {
        matches!(
            self,
            ValueType::Bytes
                | ValueType::Unicode
                | ValueType::List
                | ValueType::Tuple
                | ValueType::Set
                | ValueType::Dict
                | ValueType::Instance
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Type tag plus payload. The payload is present exactly when the value is
/// compile-time known; Instance carries its class id as part of the type
/// and an optional opaque instance handle as the payload.
#[derive(Debug, Clone, Default)]
pub enum ValueKind {
    #[default]
    Indeterminate,
    None,
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Bytes(Option<Vec<u8>>),
    Unicode(Option<String>),
    List(Option<Vec<Value>>),
    Tuple(Option<Vec<Value>>),
    Set(Option<HashSet<Value>>),
    Dict(Option<HashMap<Value, Value>>),
    Function(Option<i64>),
    Class(Option<i64>),
    Instance {
        class_id: i64,
        instance: Option<u64>,
    },
    Module(Option<String>),
    ExtensionTypeReference(Option<i64>),
}

#[derive(Debug, Clone, Default)]
pub struct Value {
    pub kind: ValueKind,
    /// Container type parameters: one element type for List/Set, per-slot
    /// types for Tuple, key and value types for Dict. Types only, never
    /// values.
    pub extension_types: Vec<Value>,
}

impl Value {
    // unknown-value constructors

    pub fn indeterminate() -> Self {
        Value::default()
    }

    pub fn unknown(value_type: ValueType) -> Self {
        let kind = match value_type {
            ValueType::Indeterminate => ValueKind::Indeterminate,
            ValueType::None => ValueKind::None,
            ValueType::Bool => ValueKind::Bool(None),
            ValueType::Int => ValueKind::Int(None),
            ValueType::Float => ValueKind::Float(None),
            ValueType::Bytes => ValueKind::Bytes(None),
            ValueType::Unicode => ValueKind::Unicode(None),
            ValueType::List => ValueKind::List(None),
            ValueType::Tuple => ValueKind::Tuple(None),
            ValueType::Set => ValueKind::Set(None),
            ValueType::Dict => ValueKind::Dict(None),
            ValueType::Function => ValueKind::Function(None),
            ValueType::Class => ValueKind::Class(None),
            ValueType::Instance => ValueKind::Instance {
                class_id: 0,
                instance: None,
            },
            ValueType::Module => ValueKind::Module(None),
            ValueType::ExtensionTypeReference => ValueKind::ExtensionTypeReference(None),
        };
        Value {
            kind,
            extension_types: Vec::new(),
        }
    }

    pub fn unknown_with_extension_types(value_type: ValueType, extension_types: Vec<Value>) -> Self {
        let mut v = Value::unknown(value_type);
        v.extension_types = extension_types;
        v
    }

    // known-value constructors

    pub fn none() -> Self {
        Value {
            kind: ValueKind::None,
            extension_types: Vec::new(),
        }
    }

    pub fn bool_value(b: bool) -> Self {
        Value {
            kind: ValueKind::Bool(Some(b)),
            extension_types: Vec::new(),
        }
    }

    pub fn int(i: i64) -> Self {
        Value {
            kind: ValueKind::Int(Some(i)),
            extension_types: Vec::new(),
        }
    }

    pub fn float(f: f64) -> Self {
        Value {
            kind: ValueKind::Float(Some(f)),
            extension_types: Vec::new(),
        }
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value {
            kind: ValueKind::Bytes(Some(data.into())),
            extension_types: Vec::new(),
        }
    }

    pub fn unicode(data: impl Into<String>) -> Self {
        Value {
            kind: ValueKind::Unicode(Some(data.into())),
            extension_types: Vec::new(),
        }
    }

    /// A module value; the payload is the module name.
    pub fn module(name: impl Into<String>) -> Self {
        Value {
            kind: ValueKind::Module(Some(name.into())),
            extension_types: Vec::new(),
        }
    }

    pub fn function(id: i64) -> Self {
        Value {
            kind: ValueKind::Function(Some(id)),
            extension_types: Vec::new(),
        }
    }

    pub fn class(id: i64) -> Self {
        Value {
            kind: ValueKind::Class(Some(id)),
            extension_types: Vec::new(),
        }
    }

    pub fn instance(class_id: i64, instance: Option<u64>) -> Self {
        Value {
            kind: ValueKind::Instance { class_id, instance },
            extension_types: Vec::new(),
        }
    }

    /// Known list; the element extension type is derived from the items.
    pub fn list(items: Vec<Value>) -> Self {
        let ext = compute_list_extension_type(&items);
        Value {
            kind: ValueKind::List(Some(items)),
            extension_types: vec![ext],
        }
    }

    /// Known tuple; one extension type per slot.
    pub fn tuple(items: Vec<Value>) -> Self {
        let ext = compute_tuple_extension_types(&items);
        Value {
            kind: ValueKind::Tuple(Some(items)),
            extension_types: ext,
        }
    }

    pub fn set(items: HashSet<Value>) -> Self {
        let ext = compute_set_extension_type(&items);
        Value {
            kind: ValueKind::Set(Some(items)),
            extension_types: vec![ext],
        }
    }

    pub fn dict(items: HashMap<Value, Value>) -> Self {
        let (key_ext, value_ext) = compute_dict_extension_types(&items);
        Value {
            kind: ValueKind::Dict(Some(items)),
            extension_types: vec![key_ext, value_ext],
        }
    }

    pub fn value_type(&self) -> ValueType {
        match &self.kind {
            ValueKind::Indeterminate => ValueType::Indeterminate,
            ValueKind::None => ValueType::None,
            ValueKind::Bool(_) => ValueType::Bool,
            ValueKind::Int(_) => ValueType::Int,
            ValueKind::Float(_) => ValueType::Float,
            ValueKind::Bytes(_) => ValueType::Bytes,
            ValueKind::Unicode(_) => ValueType::Unicode,
            ValueKind::List(_) => ValueType::List,
            ValueKind::Tuple(_) => ValueType::Tuple,
            ValueKind::Set(_) => ValueType::Set,
            ValueKind::Dict(_) => ValueType::Dict,
            ValueKind::Function(_) => ValueType::Function,
            ValueKind::Class(_) => ValueType::Class,
            ValueKind::Instance { .. } => ValueType::Instance,
            ValueKind::Module(_) => ValueType::Module,
            ValueKind::ExtensionTypeReference(_) => ValueType::ExtensionTypeReference,
        }
    }

    pub fn value_known(&self) -> bool {
        match &self.kind {
            ValueKind::Indeterminate => false,
            ValueKind::None => true,
            ValueKind::Bool(v) => v.is_some(),
            ValueKind::Int(v) => v.is_some(),
            ValueKind::Float(v) => v.is_some(),
            ValueKind::Bytes(v) => v.is_some(),
            ValueKind::Unicode(v) => v.is_some(),
            ValueKind::List(v) => v.is_some(),
            ValueKind::Tuple(v) => v.is_some(),
            ValueKind::Set(v) => v.is_some(),
            ValueKind::Dict(v) => v.is_some(),
            ValueKind::Function(v) => v.is_some(),
            ValueKind::Class(v) => v.is_some(),
            ValueKind::Instance { instance, .. } => instance.is_some(),
            ValueKind::Module(v) => v.is_some(),
            ValueKind::ExtensionTypeReference(v) => v.is_some(),
        }
    }

    /// Drop the payload, keeping the type and extension types. For Instance
    /// the class id is part of the type and survives.
    pub fn clear_value(&mut self) {
        self.kind = match std::mem::take(&mut self.kind) {
            ValueKind::Indeterminate => ValueKind::Indeterminate,
            ValueKind::None => ValueKind::None,
            ValueKind::Bool(_) => ValueKind::Bool(None),
            ValueKind::Int(_) => ValueKind::Int(None),
            ValueKind::Float(_) => ValueKind::Float(None),
            ValueKind::Bytes(_) => ValueKind::Bytes(None),
            ValueKind::Unicode(_) => ValueKind::Unicode(None),
            ValueKind::List(_) => ValueKind::List(None),
            ValueKind::Tuple(_) => ValueKind::Tuple(None),
            ValueKind::Set(_) => ValueKind::Set(None),
            ValueKind::Dict(_) => ValueKind::Dict(None),
            ValueKind::Function(_) => ValueKind::Function(None),
            ValueKind::Class(_) => ValueKind::Class(None),
            ValueKind::Instance { class_id, .. } => ValueKind::Instance {
                class_id,
                instance: None,
            },
            ValueKind::Module(_) => ValueKind::Module(None),
            ValueKind::ExtensionTypeReference(_) => ValueKind::ExtensionTypeReference(None),
        };
    }

    pub fn type_only(&self) -> Value {
        let mut v = self.clone();
        v.clear_value();
        v
    }

    /// Static truthiness. None when the type is Indeterminate or the value
    /// is unknown; Function/Class/Module values are always truthy even when
    /// unknown.
    pub fn truth_value(&self) -> Option<bool> {
        match &self.kind {
            ValueKind::Indeterminate => None,
            ValueKind::None => Some(false),
            ValueKind::Bool(v) => *v,
            ValueKind::Int(v) => v.map(|i| i != 0),
            ValueKind::Float(v) => v.map(|f| f != 0.0),
            ValueKind::Bytes(v) => v.as_ref().map(|b| !b.is_empty()),
            ValueKind::Unicode(v) => v.as_ref().map(|s| !s.is_empty()),
            ValueKind::List(v) => v.as_ref().map(|l| !l.is_empty()),
            ValueKind::Tuple(v) => v.as_ref().map(|l| !l.is_empty()),
            ValueKind::Set(v) => v.as_ref().map(|s| !s.is_empty()),
            ValueKind::Dict(v) => v.as_ref().map(|d| !d.is_empty()),
            ValueKind::Function(_) | ValueKind::Class(_) | ValueKind::Module(_) => Some(true),
            ValueKind::Instance { .. } => Some(true),
            ValueKind::ExtensionTypeReference(_) => None,
        }
    }

    /// Type-level equality: payloads are ignored, but the type tags and
    /// extension types must match (and class ids for Instance values).
    pub fn types_equal(&self, other: &Value) -> bool {
        if self.value_type() != other.value_type() {
            return false;
        }
        if let (
            ValueKind::Instance { class_id: a, .. },
            ValueKind::Instance { class_id: b, .. },
        ) = (&self.kind, &other.kind)
        {
            if a != b {
                return false;
            }
        }
        if self.extension_types.len() != other.extension_types.len() {
            return false;
        }
        self.extension_types
            .iter()
            .zip(other.extension_types.iter())
            .all(|(a, b)| a.types_equal(b))
    }

    // payload accessors used by the analysis pass

    pub fn as_int(&self) -> Option<i64> {
        match &self.kind {
            ValueKind::Bool(Some(b)) => Some(*b as i64),
            ValueKind::Int(Some(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match &self.kind {
            ValueKind::Float(Some(f)) => Some(*f),
            _ => None,
        }
    }

    pub fn as_function_id(&self) -> Option<i64> {
        match &self.kind {
            ValueKind::Function(id) => *id,
            _ => None,
        }
    }

    pub fn as_class_id(&self) -> Option<i64> {
        match &self.kind {
            ValueKind::Class(id) => *id,
            _ => None,
        }
    }
}

/// Value equality for lattice merges: the types must match and both
/// payloads must be known and equal. An unknown Value never compares equal
/// to anything, itself included.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::None, ValueKind::None) => true,
            (ValueKind::Bool(Some(a)), ValueKind::Bool(Some(b))) => a == b,
            (ValueKind::Int(Some(a)), ValueKind::Int(Some(b))) => a == b,
            (ValueKind::Float(Some(a)), ValueKind::Float(Some(b))) => a == b,
            (ValueKind::Bytes(Some(a)), ValueKind::Bytes(Some(b))) => a == b,
            (ValueKind::Unicode(Some(a)), ValueKind::Unicode(Some(b))) => a == b,
            (ValueKind::List(Some(a)), ValueKind::List(Some(b))) => a == b,
            (ValueKind::Tuple(Some(a)), ValueKind::Tuple(Some(b))) => a == b,
            (ValueKind::Set(Some(a)), ValueKind::Set(Some(b))) => a == b,
            (ValueKind::Dict(Some(a)), ValueKind::Dict(Some(b))) => a == b,
            (ValueKind::Function(Some(a)), ValueKind::Function(Some(b))) => a == b,
            (ValueKind::Class(Some(a)), ValueKind::Class(Some(b))) => a == b,
            (
                ValueKind::Instance {
                    class_id: a,
                    instance: Some(ai),
                },
                ValueKind::Instance {
                    class_id: b,
                    instance: Some(bi),
                },
            ) => a == b && ai == bi,
            (ValueKind::Module(Some(a)), ValueKind::Module(Some(b))) => a == b,
            (
                ValueKind::ExtensionTypeReference(Some(a)),
                ValueKind::ExtensionTypeReference(Some(b)),
            ) => a == b,
            _ => false,
        }
    }
}

// Eq is required by the hash containers holding Values. The no-reflexivity
// of unknown Values is intentional lattice behavior: hash containers will
// never merge two unknown Values.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_type().hash(state);
        // unknown values hash degenerately by type tag; equality decides
        match &self.kind {
            ValueKind::Bool(Some(b)) => b.hash(state),
            ValueKind::Int(Some(i)) => i.hash(state),
            ValueKind::Float(Some(f)) => f.to_bits().hash(state),
            ValueKind::Bytes(Some(b)) => b.hash(state),
            ValueKind::Unicode(Some(s)) => s.hash(state),
            ValueKind::Module(Some(s)) => s.hash(state),
            ValueKind::List(Some(items)) | ValueKind::Tuple(Some(items)) => {
                for item in items {
                    item.hash(state);
                }
            }
            ValueKind::Set(Some(items)) => items.len().hash(state),
            ValueKind::Dict(Some(items)) => items.len().hash(state),
            ValueKind::Function(Some(id)) => id.hash(state),
            ValueKind::Class(Some(id)) => id.hash(state),
            ValueKind::Instance {
                class_id,
                instance: Some(i),
            } => {
                class_id.hash(state);
                i.hash(state);
            }
            ValueKind::ExtensionTypeReference(Some(i)) => i.hash(state),
            _ => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ValueKind::Indeterminate => write!(f, "Indeterminate"),
            ValueKind::None => write!(f, "None"),
            ValueKind::Bool(Some(b)) => write!(f, "{}", if *b { "True" } else { "False" }),
            ValueKind::Int(Some(i)) => write!(f, "{}", i),
            ValueKind::Float(Some(v)) => write!(f, "{}", v),
            ValueKind::Bytes(Some(b)) => {
                write!(f, "b'")?;
                for ch in b {
                    if (*ch < 0x20) || (*ch > 0x7E) || (*ch == b'\'') {
                        write!(f, "\\x{:02X}", ch)?;
                    } else {
                        write!(f, "{}", *ch as char)?;
                    }
                }
                write!(f, "'")
            }
            ValueKind::Unicode(Some(s)) => {
                write!(f, "'")?;
                for ch in s.chars() {
                    let cp = ch as u32;
                    if !(0x20..=0x7E).contains(&cp) || (ch == '\'') {
                        write!(f, "\\x{:02X}", cp)?;
                    } else {
                        write!(f, "{}", ch)?;
                    }
                }
                write!(f, "'")
            }
            ValueKind::List(Some(items)) => {
                write!(f, "[")?;
                for (x, item) in items.iter().enumerate() {
                    if x > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ValueKind::Tuple(Some(items)) => {
                write!(f, "(")?;
                for (x, item) in items.iter().enumerate() {
                    if x > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            ValueKind::Set(Some(items)) => {
                write!(f, "{{")?;
                for (x, item) in items.iter().enumerate() {
                    if x > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            ValueKind::Dict(Some(items)) => {
                write!(f, "{{")?;
                for (x, (key, value)) in items.iter().enumerate() {
                    if x > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            ValueKind::Function(Some(id)) => write!(f, "Function:{}", id),
            ValueKind::Class(Some(id)) => write!(f, "Class:{}", id),
            ValueKind::Instance { class_id, .. } => write!(f, "Instance:{}", class_id),
            ValueKind::Module(Some(name)) => write!(f, "Module:{}", name),
            _ => write!(f, "{}", self.value_type().name()),
        }
    }
}

// ==================== Extension type computation ====================

/// Common element type of a list's items: the shared type if every item
/// agrees (types_equal), else Indeterminate.
pub fn compute_list_extension_type(items: &[Value]) -> Value {
    let mut common: Option<Value> = None;
    for item in items {
        let item_type = item.type_only();
        if item_type.value_type() == ValueType::Indeterminate {
            return Value::indeterminate();
        }
        match &common {
            None => common = Some(item_type),
            Some(t) => {
                if !t.types_equal(&item_type) {
                    return Value::indeterminate();
                }
            }
        }
    }
    common.unwrap_or_else(Value::indeterminate)
}

/// Per-slot extension types for a tuple.
pub fn compute_tuple_extension_types(items: &[Value]) -> Vec<Value> {
    items.iter().map(Value::type_only).collect()
}

pub fn compute_set_extension_type(items: &HashSet<Value>) -> Value {
    let items: Vec<Value> = items.iter().cloned().collect();
    compute_list_extension_type(&items)
}

pub fn compute_dict_extension_types(items: &HashMap<Value, Value>) -> (Value, Value) {
    let keys: Vec<Value> = items.keys().cloned().collect();
    let values: Vec<Value> = items.values().cloned().collect();
    (
        compute_list_extension_type(&keys),
        compute_list_extension_type(&values),
    )
}

/// Compact signature string for a list of argument types, used in logs and
/// debug dumps: `i` Int, `f` Float, `L<i>` list-of-Int, and so on.
pub fn type_signature(values: &[Value]) -> String {
    let mut out = String::new();
    for value in values {
        if !out.is_empty() {
            out.push(',');
        }
        out.push_str(&single_signature(value));
    }
    out
}

fn single_signature(value: &Value) -> String {
    let base = match value.value_type() {
        ValueType::Indeterminate => "?",
        ValueType::None => "n",
        ValueType::Bool => "b",
        ValueType::Int => "i",
        ValueType::Float => "f",
        ValueType::Bytes => "B",
        ValueType::Unicode => "U",
        ValueType::List => "L",
        ValueType::Tuple => "T",
        ValueType::Set => "S",
        ValueType::Dict => "D",
        ValueType::Function => "F",
        ValueType::Class => "C",
        ValueType::Instance => "I",
        ValueType::Module => "M",
        ValueType::ExtensionTypeReference => "X",
    };
    if value.extension_types.is_empty() {
        return base.to_string();
    }
    format!("{}<{}>", base, type_signature(&value.extension_types))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_never_equal() {
        let a = Value::unknown(ValueType::Int);
        let b = Value::unknown(ValueType::Int);
        assert_ne!(a, b);
        assert_ne!(a, a.clone());
        assert!(a.types_equal(&b));
    }

    #[test]
    fn test_known_equality() {
        assert_eq!(Value::int(3), Value::int(3));
        assert_ne!(Value::int(3), Value::int(4));
        assert_ne!(Value::int(3), Value::float(3.0));
        assert_eq!(Value::bytes(b"x".to_vec()), Value::bytes(b"x".to_vec()));
    }

    #[test]
    fn test_list_extension_types() {
        let v = Value::list(vec![Value::int(1), Value::int(2)]);
        assert_eq!(v.extension_types.len(), 1);
        assert_eq!(v.extension_types[0].value_type(), ValueType::Int);
        assert!(!v.extension_types[0].value_known());

        let mixed = Value::list(vec![Value::int(1), Value::unicode("s")]);
        assert_eq!(
            mixed.extension_types[0].value_type(),
            ValueType::Indeterminate
        );
    }

    #[test]
    fn test_types_equal_recurses_extension_types() {
        let ints = Value::list(vec![Value::int(1)]);
        let floats = Value::list(vec![Value::float(1.0)]);
        assert!(!ints.types_equal(&floats));
        assert!(ints.types_equal(&Value::list(vec![Value::int(9)])));
    }

    #[test]
    fn test_instance_type_identity() {
        let a = Value::instance(4, None);
        let b = Value::instance(4, None);
        let c = Value::instance(5, None);
        assert!(a.types_equal(&b));
        assert!(!a.types_equal(&c));

        let mut cleared = Value::instance(4, Some(1));
        cleared.clear_value();
        assert!(cleared.types_equal(&a));
        assert!(!cleared.value_known());
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(Value::int(0).truth_value(), Some(false));
        assert_eq!(Value::int(2).truth_value(), Some(true));
        assert_eq!(Value::none().truth_value(), Some(false));
        assert_eq!(Value::unknown(ValueType::Int).truth_value(), None);
        assert_eq!(Value::unknown(ValueType::Function).truth_value(), Some(true));
        assert_eq!(Value::bytes(Vec::new()).truth_value(), Some(false));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::int(42).to_string(), "42");
        assert_eq!(Value::unknown(ValueType::Int).to_string(), "Int");
        assert_eq!(Value::bool_value(true).to_string(), "True");
        assert_eq!(Value::bytes(b"hi".to_vec()).to_string(), "b'hi'");
        assert_eq!(
            Value::list(vec![Value::int(1), Value::int(2)]).to_string(),
            "[1, 2]"
        );
        assert_eq!(Value::module("math").to_string(), "Module:math");
    }

    #[test]
    fn test_type_signature() {
        let sig = type_signature(&[
            Value::int(1),
            Value::list(vec![Value::int(1)]),
            Value::unknown(ValueType::Indeterminate),
        ]);
        assert_eq!(sig, "i,L<i>,?");
    }

    #[test]
    fn test_set_dedupes_known_only() {
        let mut set = HashSet::new();
        set.insert(Value::int(1));
        set.insert(Value::int(1));
        set.insert(Value::unknown(ValueType::Int));
        set.insert(Value::unknown(ValueType::Int));
        // known duplicates merge; unknown values never do
        assert_eq!(set.len(), 3);
    }
}
