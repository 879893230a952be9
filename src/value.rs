//! Runtime value representation.
//!
//! The core [`RuntimeValue`] type and the object, class, and function records
//! behind it. References use `Arc` + `parking_lot::RwLock` so values can be
//! inspected from the host side while an evaluation session is suspended.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::ast::{ArrowBody, BlockStatement, Pattern};

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// Makes it explicit when a clone only bumps a reference count. Regular
/// `.clone()` still works but a `cheap_clone()` call documents the cost.
pub trait CheapClone: Clone {
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Arc<T> {}

/// An immutable, cheaply clonable string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Arc<str>);

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl CheapClone for JsString {}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(Arc::from(s))
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(Arc::from(s.as_str()))
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for JsString {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type ObjectRef = Arc<RwLock<JsObject>>;
pub type FunctionRef = Arc<FunctionRecord>;
pub type ClassRef = Arc<ClassRecord>;

/// A guest-language value.
#[derive(Clone, Default)]
pub enum RuntimeValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(ObjectRef),
    Function(FunctionRef),
}

/// Wrap a host value as a [`RuntimeValue`].
///
/// Wrapping an already-wrapped value is the identity, so `wrap(wrap(x))` is
/// observably the same as `wrap(x)`.
pub fn wrap(value: impl Into<RuntimeValue>) -> RuntimeValue {
    value.into()
}

impl RuntimeValue {
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, RuntimeValue::Null | RuntimeValue::Undefined)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, RuntimeValue::Function(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, RuntimeValue::Object(_))
    }

    /// The `typeof` result for this value.
    pub fn type_of(&self) -> &'static str {
        match self {
            RuntimeValue::Undefined => "undefined",
            RuntimeValue::Null => "object", // historical quirk
            RuntimeValue::Boolean(_) => "boolean",
            RuntimeValue::Number(_) => "number",
            RuntimeValue::String(_) => "string",
            RuntimeValue::Object(_) => "object",
            RuntimeValue::Function(_) => "function",
        }
    }

    /// ToBoolean.
    pub fn to_boolean(&self) -> bool {
        match self {
            RuntimeValue::Undefined | RuntimeValue::Null => false,
            RuntimeValue::Boolean(b) => *b,
            RuntimeValue::Number(n) => *n != 0.0 && !n.is_nan(),
            RuntimeValue::String(s) => !s.is_empty(),
            RuntimeValue::Object(_) | RuntimeValue::Function(_) => true,
        }
    }

    /// ToNumber.
    pub fn to_number(&self) -> f64 {
        match self {
            RuntimeValue::Undefined => f64::NAN,
            RuntimeValue::Null => 0.0,
            RuntimeValue::Boolean(true) => 1.0,
            RuntimeValue::Boolean(false) => 0.0,
            RuntimeValue::Number(n) => *n,
            RuntimeValue::String(s) => string_to_number(s),
            RuntimeValue::Object(obj) => {
                // ToPrimitive on arrays yields the joined-element string.
                if obj.read().kind == ObjectKind::Array {
                    string_to_number(&self.to_js_string())
                } else {
                    f64::NAN
                }
            }
            RuntimeValue::Function(_) => f64::NAN,
        }
    }

    /// ToString.
    pub fn to_js_string(&self) -> JsString {
        match self {
            RuntimeValue::Undefined => JsString::from("undefined"),
            RuntimeValue::Null => JsString::from("null"),
            RuntimeValue::Boolean(true) => JsString::from("true"),
            RuntimeValue::Boolean(false) => JsString::from("false"),
            RuntimeValue::Number(n) => JsString::from(number_to_string(*n)),
            RuntimeValue::String(s) => s.cheap_clone(),
            RuntimeValue::Object(obj) => {
                let obj = obj.read();
                if obj.kind == ObjectKind::Array {
                    let parts: Vec<String> = obj
                        .array_elements()
                        .iter()
                        .map(|v| {
                            if v.is_null_or_undefined() {
                                String::new()
                            } else {
                                v.to_js_string().as_str().to_string()
                            }
                        })
                        .collect();
                    JsString::from(parts.join(","))
                } else {
                    JsString::from("[object Object]")
                }
            }
            RuntimeValue::Function(func) => {
                let name = func.name().unwrap_or("anonymous");
                JsString::from(format!("function {name}() {{ [native code] }}"))
            }
        }
    }

    /// Strict equality (`===`).
    pub fn strict_equals(&self, other: &RuntimeValue) -> bool {
        match (self, other) {
            (RuntimeValue::Undefined, RuntimeValue::Undefined) => true,
            (RuntimeValue::Null, RuntimeValue::Null) => true,
            (RuntimeValue::Boolean(a), RuntimeValue::Boolean(b)) => a == b,
            // NaN !== NaN
            (RuntimeValue::Number(a), RuntimeValue::Number(b)) => {
                !a.is_nan() && !b.is_nan() && a == b
            }
            (RuntimeValue::String(a), RuntimeValue::String(b)) => a == b,
            (RuntimeValue::Object(a), RuntimeValue::Object(b)) => Arc::ptr_eq(a, b),
            (RuntimeValue::Function(a), RuntimeValue::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Undefined => write!(f, "undefined"),
            RuntimeValue::Null => write!(f, "null"),
            RuntimeValue::Boolean(b) => write!(f, "{b}"),
            RuntimeValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            RuntimeValue::String(s) => write!(f, "\"{s}\""),
            RuntimeValue::Object(obj) => {
                if obj.read().kind == ObjectKind::Array {
                    write!(f, "[...]")
                } else {
                    write!(f, "{{...}}")
                }
            }
            RuntimeValue::Function(func) => {
                write!(f, "[Function: {}]", func.name().unwrap_or("anonymous"))
            }
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from host types. `From<RuntimeValue>` is covered by the blanket
// identity impl, which is what makes `wrap` idempotent.

impl From<bool> for RuntimeValue {
    fn from(b: bool) -> Self {
        RuntimeValue::Boolean(b)
    }
}

impl From<f64> for RuntimeValue {
    fn from(n: f64) -> Self {
        RuntimeValue::Number(n)
    }
}

impl From<i32> for RuntimeValue {
    fn from(n: i32) -> Self {
        RuntimeValue::Number(f64::from(n))
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        RuntimeValue::String(JsString::from(s))
    }
}

impl From<String> for RuntimeValue {
    fn from(s: String) -> Self {
        RuntimeValue::String(JsString::from(s))
    }
}

impl From<JsString> for RuntimeValue {
    fn from(s: JsString) -> Self {
        RuntimeValue::String(s)
    }
}

/// JavaScript number-to-string formatting for the common cases.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// JavaScript string-to-number coercion: trimmed, empty string is zero,
/// `Infinity` spellings and radix prefixes are honored.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    // Rust's float parser also accepts "inf"/"infinity"/"nan" spellings, which
    // the host rejects. Only digits, sign, dot, and exponent may remain here.
    if trimmed
        .bytes()
        .any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// ============ OBJECTS ============

/// A property key: either an interned name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Index(u32),
}

impl PropertyKey {
    /// The key a value coerces to in a computed-member position.
    pub fn from_value(value: &RuntimeValue) -> PropertyKey {
        if let RuntimeValue::Number(n) = value {
            if n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX) {
                return PropertyKey::Index(*n as u32);
            }
        }
        PropertyKey::String(value.to_js_string())
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(JsString::from(s))
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        PropertyKey::String(s)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => f.write_str(s),
            PropertyKey::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A property slot: a plain value or an accessor pair.
#[derive(Debug, Clone)]
pub enum Property {
    Data(RuntimeValue),
    Accessor {
        get: Option<FunctionRef>,
        set: Option<FunctionRef>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Ordinary,
    Array,
}

/// An object record: an ordered property table, optionally linked to a class
/// for method lookup.
#[derive(Debug)]
pub struct JsObject {
    pub kind: ObjectKind,
    pub properties: IndexMap<PropertyKey, Property>,
    pub class: Option<ClassRef>,
}

impl JsObject {
    pub fn new() -> Self {
        Self {
            kind: ObjectKind::Ordinary,
            properties: IndexMap::new(),
            class: None,
        }
    }

    pub fn instance_of(class: ClassRef) -> Self {
        Self {
            kind: ObjectKind::Ordinary,
            properties: IndexMap::new(),
            class: Some(class),
        }
    }

    /// Look up an own property slot.
    pub fn get_property(&self, key: &PropertyKey) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Write a plain data property, replacing any previous slot.
    pub fn set_property(&mut self, key: PropertyKey, value: RuntimeValue) {
        self.properties.insert(key, Property::Data(value));
    }

    pub fn delete_property(&mut self, key: &PropertyKey) -> bool {
        self.properties.shift_remove(key).is_some()
    }

    pub fn has_property(&self, key: &PropertyKey) -> bool {
        if self.properties.contains_key(key) {
            return true;
        }
        if let PropertyKey::String(name) = key {
            let mut class = self.class.clone();
            while let Some(c) = class {
                if c.methods.contains_key(name) {
                    return true;
                }
                class = c.parent.clone();
            }
        }
        false
    }

    /// Enumerable own keys, in insertion order.
    pub fn enumerable_keys(&self) -> Vec<PropertyKey> {
        self.properties.keys().cloned().collect()
    }

    /// Array element list. Only meaningful for `ObjectKind::Array`.
    pub fn array_elements(&self) -> Vec<RuntimeValue> {
        let length = self.array_length();
        (0..length)
            .map(|i| match self.properties.get(&PropertyKey::Index(i)) {
                Some(Property::Data(v)) => v.clone(),
                _ => RuntimeValue::Undefined,
            })
            .collect()
    }

    pub fn array_length(&self) -> u32 {
        self.properties
            .keys()
            .filter_map(|k| match k {
                PropertyKey::Index(i) => Some(*i + 1),
                PropertyKey::String(_) => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl Default for JsObject {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_object() -> ObjectRef {
    Arc::new(RwLock::new(JsObject::new()))
}

pub fn create_array(elements: Vec<RuntimeValue>) -> ObjectRef {
    let mut obj = JsObject::new();
    obj.kind = ObjectKind::Array;
    for (i, value) in elements.into_iter().enumerate() {
        obj.set_property(PropertyKey::Index(i as u32), value);
    }
    Arc::new(RwLock::new(obj))
}

// ============ CLASSES ============

/// A class record: single-parent inheritance, a constructor closure, and
/// instance/static method tables.
#[derive(Debug)]
pub struct ClassRecord {
    pub name: JsString,
    pub parent: Option<ClassRef>,
    pub constructor: Option<FunctionRef>,
    pub methods: IndexMap<JsString, FunctionRef>,
    pub static_methods: IndexMap<JsString, FunctionRef>,
}

impl ClassRecord {
    /// Resolve an instance method through the inheritance chain.
    pub fn lookup_method(self: &Arc<Self>, name: &JsString) -> Option<FunctionRef> {
        let mut class = Some(self.cheap_clone());
        while let Some(c) = class {
            if let Some(method) = c.methods.get(name) {
                return Some(method.cheap_clone());
            }
            class = c.parent.clone();
        }
        None
    }

    /// The constructor to run for `new`, walking up when a subclass declares
    /// none of its own.
    pub fn lookup_constructor(self: &Arc<Self>) -> Option<FunctionRef> {
        let mut class = Some(self.cheap_clone());
        while let Some(c) = class {
            if let Some(ctor) = &c.constructor {
                return Some(ctor.cheap_clone());
            }
            class = c.parent.clone();
        }
        None
    }

    /// Whether `self` is `other` or inherits from it.
    pub fn derives_from(self: &Arc<Self>, other: &Arc<Self>) -> bool {
        let mut class = Some(self.cheap_clone());
        while let Some(c) = class {
            if Arc::ptr_eq(&c, other) {
                return true;
            }
            class = c.parent.clone();
        }
        false
    }
}

// ============ FUNCTIONS ============

/// How a closure resolves `this` when invoked.
#[derive(Debug, Clone)]
pub enum ThisMode {
    /// Plain functions and methods: the call-time receiver.
    Dynamic,
    /// Arrow functions: the context captured at creation time.
    Captured(RuntimeValue),
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Arc<BlockStatement>),
    Expression(Arc<crate::ast::Expression>),
}

impl From<&ArrowBody> for FunctionBody {
    fn from(body: &ArrowBody) -> Self {
        match body {
            ArrowBody::Block(block) => FunctionBody::Block(Arc::new(block.clone())),
            ArrowBody::Expression(expr) => FunctionBody::Expression(Arc::new((**expr).clone())),
        }
    }
}

/// An interpreted closure.
#[derive(Debug)]
pub struct ClosureRecord {
    pub name: Option<JsString>,
    pub params: Vec<Pattern>,
    pub body: FunctionBody,
    pub this_mode: ThisMode,
}

/// A callable value.
#[derive(Debug)]
pub enum Callable {
    Closure(ClosureRecord),
    Class(ClassRef),
}

#[derive(Debug)]
pub struct FunctionRecord {
    pub callable: Callable,
    /// Expando properties assigned onto the function value itself, like
    /// `f.cache = {}`.
    pub properties: RwLock<IndexMap<PropertyKey, RuntimeValue>>,
}

impl FunctionRecord {
    pub fn closure(closure: ClosureRecord) -> FunctionRef {
        Arc::new(FunctionRecord {
            callable: Callable::Closure(closure),
            properties: RwLock::new(IndexMap::new()),
        })
    }

    pub fn class(class: ClassRef) -> FunctionRef {
        Arc::new(FunctionRecord {
            callable: Callable::Class(class),
            properties: RwLock::new(IndexMap::new()),
        })
    }

    pub fn name(&self) -> Option<&str> {
        match &self.callable {
            Callable::Closure(c) => c.name.as_deref(),
            Callable::Class(c) => Some(&c.name),
        }
    }

    pub fn as_class(&self) -> Option<&ClassRef> {
        match &self.callable {
            Callable::Class(c) => Some(c),
            Callable::Closure(_) => None,
        }
    }
}

// ============ JSON INTEROP ============

/// Build a runtime value from host-provided JSON.
pub fn from_json(json: &serde_json::Value) -> RuntimeValue {
    match json {
        serde_json::Value::Null => RuntimeValue::Null,
        serde_json::Value::Bool(b) => RuntimeValue::Boolean(*b),
        serde_json::Value::Number(n) => RuntimeValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => RuntimeValue::String(JsString::from(s.as_str())),
        serde_json::Value::Array(items) => {
            RuntimeValue::Object(create_array(items.iter().map(from_json).collect()))
        }
        serde_json::Value::Object(map) => {
            let obj = create_object();
            {
                let mut guard = obj.write();
                for (key, value) in map {
                    guard.set_property(PropertyKey::from(key.as_str()), from_json(value));
                }
            }
            RuntimeValue::Object(obj)
        }
    }
}

/// Export a runtime value as JSON for host tooling. Functions and accessor
/// slots become `null`, matching `JSON.stringify` behavior closely enough for
/// diagnostics.
pub fn to_json(value: &RuntimeValue) -> serde_json::Value {
    match value {
        RuntimeValue::Undefined | RuntimeValue::Null | RuntimeValue::Function(_) => {
            serde_json::Value::Null
        }
        RuntimeValue::Boolean(b) => serde_json::Value::Bool(*b),
        RuntimeValue::Number(n) => serde_json::Number::from_f64(*n)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        RuntimeValue::String(s) => serde_json::Value::String(s.as_str().to_string()),
        RuntimeValue::Object(obj) => {
            let obj = obj.read();
            if obj.kind == ObjectKind::Array {
                serde_json::Value::Array(obj.array_elements().iter().map(to_json).collect())
            } else {
                let mut map = serde_json::Map::new();
                for (key, prop) in &obj.properties {
                    if let Property::Data(v) = prop {
                        map.insert(key.to_string(), to_json(v));
                    }
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_idempotent() {
        let once = wrap(42.0);
        let twice = wrap(wrap(42.0));
        assert!(once.strict_equals(&twice));

        let s_once = wrap("hi");
        let s_twice = wrap(wrap("hi"));
        assert!(s_once.strict_equals(&s_twice));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        let nan = RuntimeValue::Number(f64::NAN);
        assert!(!nan.strict_equals(&nan));
    }

    #[test]
    fn object_identity_equality() {
        let a = RuntimeValue::Object(create_object());
        let b = RuntimeValue::Object(create_object());
        assert!(a.strict_equals(&a.clone()));
        assert!(!a.strict_equals(&b));
    }

    #[test]
    fn string_coercion() {
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("  2 "), 2.0);
        assert_eq!(string_to_number("Infinity"), f64::INFINITY);
        assert!(string_to_number("hi").is_nan());
        assert_eq!(string_to_number("0xff"), 255.0);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(number_to_string(7.0), "7");
        assert_eq!(number_to_string(3.5), "3.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_to_string(-0.0), "0");
    }

    #[test]
    fn array_length_tracks_highest_index() {
        let arr = create_array(vec![wrap(1.0), wrap(2.0)]);
        assert_eq!(arr.read().array_length(), 2);
        arr.write()
            .set_property(PropertyKey::Index(5), wrap("x"));
        assert_eq!(arr.read().array_length(), 6);
    }

    #[test]
    fn json_round_trip() {
        let json: serde_json::Value =
            serde_json::json!({ "a": 1, "b": [true, "x"], "c": null });
        let value = from_json(&json);
        assert_eq!(to_json(&value), json);
    }
}
