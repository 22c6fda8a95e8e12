//! Object records and the property algorithms that never run script code.
//!
//! Everything here operates on a single [`JsObject`] (or walks prototype
//! links without invoking accessors). Operations that may call getters,
//! setters or `valueOf` live on the interpreter in `properties.rs`.

use std::{
    cell::{Ref, RefCell, RefMut},
    collections::HashSet,
    fmt,
    rc::Rc,
};

use indexmap::IndexMap;

use crate::{
    conversions::same_value,
    value::{Callable, Value},
};

pub type PropertyKey = Rc<str>;

/// The writable/enumerable/configurable triple used when installing data
/// properties directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Attributes {
    pub const ALL: Attributes = Attributes::new(true, true, true);
    pub const NONE: Attributes = Attributes::new(false, false, false);
    /// Built-in methods and `constructor` links.
    pub const HIDDEN: Attributes = Attributes::new(true, false, true);

    pub const fn new(writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            writable,
            enumerable,
            configurable,
        }
    }
}

#[derive(Clone)]
pub enum PropertyKind {
    Data { value: Value, writable: bool },
    Accessor {
        get: Option<ObjectRef>,
        set: Option<ObjectRef>,
    },
}

/// A complete property descriptor as stored on an object.
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub kind: PropertyKind,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertyDescriptor {
    pub fn data(value: Value, attributes: Attributes) -> Self {
        Self {
            kind: PropertyKind::Data {
                value,
                writable: attributes.writable,
            },
            enumerable: attributes.enumerable,
            configurable: attributes.configurable,
        }
    }

    pub fn accessor(
        get: Option<ObjectRef>,
        set: Option<ObjectRef>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            kind: PropertyKind::Accessor { get, set },
            enumerable,
            configurable,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self.kind, PropertyKind::Data { .. })
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self.kind, PropertyKind::Accessor { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            PropertyKind::Data { value, .. } => Some(value),
            PropertyKind::Accessor { .. } => None,
        }
    }

    pub fn writable(&self) -> Option<bool> {
        match &self.kind {
            PropertyKind::Data { writable, .. } => Some(*writable),
            PropertyKind::Accessor { .. } => None,
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("PropertyDescriptor");
        match &self.kind {
            PropertyKind::Data { value, writable } => {
                debug.field("value", value).field("writable", writable);
            }
            PropertyKind::Accessor { get, set } => {
                debug.field("get", get).field("set", set);
            }
        }
        debug
            .field("enumerable", &self.enumerable)
            .field("configurable", &self.configurable)
            .finish()
    }
}

/// A partial descriptor, the input of `DefineOwnProperty`.
///
/// `get`/`set` use `Some(None)` for an explicitly absent accessor function
/// (`get: undefined`) and `None` when the field is missing entirely.
#[derive(Clone, Default)]
pub struct DescriptorPatch {
    pub value: Option<Value>,
    pub writable: Option<bool>,
    pub get: Option<Option<ObjectRef>>,
    pub set: Option<Option<ObjectRef>>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl DescriptorPatch {
    pub fn data(value: Value, attributes: Attributes) -> Self {
        Self {
            value: Some(value),
            writable: Some(attributes.writable),
            enumerable: Some(attributes.enumerable),
            configurable: Some(attributes.configurable),
            ..Self::default()
        }
    }

    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_accessor_descriptor() && !self.is_data_descriptor()
    }

    pub fn is_empty(&self) -> bool {
        self.is_generic_descriptor() && self.enumerable.is_none() && self.configurable.is_none()
    }
}

impl From<PropertyDescriptor> for DescriptorPatch {
    fn from(desc: PropertyDescriptor) -> Self {
        let mut patch = DescriptorPatch {
            enumerable: Some(desc.enumerable),
            configurable: Some(desc.configurable),
            ..DescriptorPatch::default()
        };
        match desc.kind {
            PropertyKind::Data { value, writable } => {
                patch.value = Some(value);
                patch.writable = Some(writable);
            }
            PropertyKind::Accessor { get, set } => {
                patch.get = Some(get);
                patch.set = Some(set);
            }
        }
        patch
    }
}

/// Internal slots distinguishing exotic and built-in objects.
#[derive(Clone)]
pub enum ObjectKind {
    Ordinary,
    Array,
    Arguments,
    Error,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Function(Callable),
}

pub struct JsObject {
    prototype: Option<ObjectRef>,
    pub extensible: bool,
    pub kind: ObjectKind,
    properties: IndexMap<PropertyKey, PropertyDescriptor>,
}

impl JsObject {
    pub fn new(prototype: Option<ObjectRef>, kind: ObjectKind) -> Self {
        Self {
            prototype,
            extensible: true,
            kind,
            properties: IndexMap::new(),
        }
    }

    pub fn class(&self) -> &'static str {
        match self.kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array => "Array",
            ObjectKind::Arguments => "Arguments",
            ObjectKind::Error => "Error",
            ObjectKind::Boolean(_) => "Boolean",
            ObjectKind::Number(_) => "Number",
            ObjectKind::String(_) => "String",
            ObjectKind::Function(_) => "Function",
        }
    }

    pub fn prototype(&self) -> Option<&ObjectRef> {
        self.prototype.as_ref()
    }

    /// `[[GetOwnProperty]]`, including the character indices of String
    /// wrapper objects.
    pub fn get_own_property(&self, key: &str) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.properties.get(key) {
            return Some(desc.clone());
        }
        if let ObjectKind::String(text) = &self.kind {
            let index = array_index(key)? as usize;
            let unit = text.encode_utf16().nth(index)?;
            let ch = String::from_utf16_lossy(&[unit]);
            return Some(PropertyDescriptor::data(
                Value::string(ch),
                Attributes::new(false, true, false),
            ));
        }
        None
    }

    /// Own keys in enumeration order: String wrapper indices, then insertion
    /// order.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut keys = Vec::with_capacity(self.properties.len());
        if let ObjectKind::String(text) = &self.kind {
            let len = text.encode_utf16().count();
            keys.extend((0..len).map(|idx| PropertyKey::from(idx.to_string())));
        }
        keys.extend(
            self.properties
                .keys()
                .filter(|key| !keys.contains(key))
                .cloned()
                .collect::<Vec<_>>(),
        );
        keys
    }

    /// Installs a property without validation. Intended for building fresh
    /// objects whose shape is known to be valid.
    pub fn insert_property(&mut self, key: impl Into<PropertyKey>, desc: PropertyDescriptor) {
        self.properties.insert(key.into(), desc);
    }

    pub fn insert_data(&mut self, key: impl Into<PropertyKey>, value: Value, attributes: Attributes) {
        self.insert_property(key, PropertyDescriptor::data(value, attributes));
    }

    /// `[[DefineOwnProperty]]` without the throw flag: `false` means rejected.
    ///
    /// For arrays, a `length` value in `patch` must already be a Number that is
    /// a valid array length.
    pub fn define_own_property(&mut self, key: &str, patch: &DescriptorPatch) -> bool {
        if matches!(self.kind, ObjectKind::Array) {
            self.array_define_own_property(key, patch)
        } else {
            self.ordinary_define_own_property(key, patch)
        }
    }

    fn ordinary_define_own_property(&mut self, key: &str, patch: &DescriptorPatch) -> bool {
        let Some(current) = self.get_own_property(key) else {
            if !self.extensible {
                return false;
            }
            let enumerable = patch.enumerable.unwrap_or(false);
            let configurable = patch.configurable.unwrap_or(false);
            let desc = if patch.is_accessor_descriptor() {
                PropertyDescriptor::accessor(
                    patch.get.clone().flatten(),
                    patch.set.clone().flatten(),
                    enumerable,
                    configurable,
                )
            } else {
                PropertyDescriptor::data(
                    patch.value.clone().unwrap_or(Value::Undefined),
                    Attributes::new(patch.writable.unwrap_or(false), enumerable, configurable),
                )
            };
            self.properties.insert(PropertyKey::from(key), desc);
            return true;
        };

        if patch.is_empty() || patch_matches(&current, patch) {
            return true;
        }

        if !current.configurable {
            if patch.configurable == Some(true) {
                return false;
            }
            if patch.enumerable.is_some_and(|e| e != current.enumerable) {
                return false;
            }
        }

        let mut updated = current.clone();
        if patch.is_generic_descriptor() {
            // Only attribute flags change.
        } else if current.is_data() != patch.is_data_descriptor() {
            if !current.configurable {
                return false;
            }
            updated.kind = if current.is_data() {
                PropertyKind::Accessor {
                    get: None,
                    set: None,
                }
            } else {
                PropertyKind::Data {
                    value: Value::Undefined,
                    writable: false,
                }
            };
        } else if let PropertyKind::Data { value, writable } = &current.kind {
            if !current.configurable && !*writable {
                if patch.writable == Some(true) {
                    return false;
                }
                if let Some(new_value) = &patch.value {
                    if !same_value(new_value, value) {
                        return false;
                    }
                }
            }
        } else if let PropertyKind::Accessor { get, set } = &current.kind {
            if !current.configurable {
                if let Some(new_get) = &patch.get {
                    if !same_function(new_get, get) {
                        return false;
                    }
                }
                if let Some(new_set) = &patch.set {
                    if !same_function(new_set, set) {
                        return false;
                    }
                }
            }
        }

        match &mut updated.kind {
            PropertyKind::Data { value, writable } => {
                if let Some(new_value) = &patch.value {
                    *value = new_value.clone();
                }
                if let Some(new_writable) = patch.writable {
                    *writable = new_writable;
                }
            }
            PropertyKind::Accessor { get, set } => {
                if let Some(new_get) = &patch.get {
                    *get = new_get.clone();
                }
                if let Some(new_set) = &patch.set {
                    *set = new_set.clone();
                }
            }
        }
        if let Some(enumerable) = patch.enumerable {
            updated.enumerable = enumerable;
        }
        if let Some(configurable) = patch.configurable {
            updated.configurable = configurable;
        }
        match self.properties.get_mut(key) {
            Some(slot) => *slot = updated,
            None => {
                self.properties.insert(PropertyKey::from(key), updated);
            }
        }
        true
    }

    fn array_length(&self) -> (u32, bool) {
        match self.properties.get("length").map(|desc| &desc.kind) {
            Some(PropertyKind::Data {
                value: Value::Number(n),
                writable,
            }) => (*n as u32, *writable),
            _ => (0, true),
        }
    }

    fn set_array_length(&mut self, len: u32) {
        if let Some(PropertyKind::Data { value, .. }) =
            self.properties.get_mut("length").map(|desc| &mut desc.kind)
        {
            *value = Value::Number(len as f64);
        }
    }

    fn array_define_own_property(&mut self, key: &str, patch: &DescriptorPatch) -> bool {
        let (old_len, old_len_writable) = self.array_length();

        if key == "length" {
            let Some(Value::Number(requested)) = &patch.value else {
                return self.ordinary_define_own_property(key, patch);
            };
            let new_len = *requested as u32;
            if new_len >= old_len {
                return self.ordinary_define_own_property(key, patch);
            }
            if !old_len_writable {
                return false;
            }
            let keep_writable = patch.writable != Some(false);
            let mut staged = patch.clone();
            if !keep_writable {
                staged.writable = Some(true);
            }
            if !self.ordinary_define_own_property(key, &staged) {
                return false;
            }

            let mut doomed: Vec<(u32, PropertyKey)> = self
                .properties
                .keys()
                .filter_map(|k| array_index(k).map(|idx| (idx, k.clone())))
                .filter(|(idx, _)| *idx >= new_len)
                .collect();
            doomed.sort_by(|a, b| b.0.cmp(&a.0));
            for (idx, element) in doomed {
                if !self.delete(&element) {
                    self.set_array_length(idx + 1);
                    if !keep_writable {
                        self.mark_length_read_only();
                    }
                    return false;
                }
            }
            if !keep_writable {
                self.mark_length_read_only();
            }
            return true;
        }

        if let Some(idx) = array_index(key) {
            if idx >= old_len && !old_len_writable {
                return false;
            }
            if !self.ordinary_define_own_property(key, patch) {
                return false;
            }
            if idx >= old_len {
                self.set_array_length(idx + 1);
            }
            return true;
        }

        self.ordinary_define_own_property(key, patch)
    }

    fn mark_length_read_only(&mut self) {
        if let Some(PropertyKind::Data { writable, .. }) =
            self.properties.get_mut("length").map(|desc| &mut desc.kind)
        {
            *writable = false;
        }
    }

    /// `[[Delete]]` without the throw flag: `false` means the property exists
    /// and is non-configurable.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.get_own_property(key) {
            None => true,
            Some(desc) if desc.configurable => {
                self.properties.shift_remove(key);
                true
            }
            Some(_) => false,
        }
    }
}

fn same_function(a: &Option<ObjectRef>, b: &Option<ObjectRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

/// True when every field present in `patch` already holds the same value.
fn patch_matches(current: &PropertyDescriptor, patch: &DescriptorPatch) -> bool {
    if patch.enumerable.is_some_and(|e| e != current.enumerable)
        || patch.configurable.is_some_and(|c| c != current.configurable)
    {
        return false;
    }
    match &current.kind {
        PropertyKind::Data { value, writable } => {
            patch.get.is_none()
                && patch.set.is_none()
                && patch.writable.map_or(true, |w| w == *writable)
                && patch.value.as_ref().map_or(true, |v| same_value(v, value))
        }
        PropertyKind::Accessor { get, set } => {
            patch.value.is_none()
                && patch.writable.is_none()
                && patch.get.as_ref().map_or(true, |g| same_function(g, get))
                && patch.set.as_ref().map_or(true, |s| same_function(s, set))
        }
    }
}

/// Parses a canonical array index (`0` to `2^32 - 2`, no leading zeros).
pub fn array_index(key: &str) -> Option<u32> {
    let bytes = key.as_bytes();
    if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == b'0') {
        return None;
    }
    let mut value: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u64::from(b - b'0');
        if value >= u64::from(u32::MAX) {
            return None;
        }
    }
    Some(value as u32)
}

/// Shared handle to an object record. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<JsObject>>);

impl ObjectRef {
    pub fn new(object: JsObject) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    pub fn borrow(&self) -> Ref<'_, JsObject> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, JsObject> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn prototype(&self) -> Option<ObjectRef> {
        self.0.borrow().prototype.clone()
    }

    /// Re-links the prototype. Returns `false`, leaving the object untouched,
    /// when the new link would make the chain cyclic.
    pub fn set_prototype(&self, prototype: Option<ObjectRef>) -> bool {
        let mut cursor = prototype.clone();
        while let Some(object) = cursor {
            if object.ptr_eq(self) {
                return false;
            }
            cursor = object.prototype();
        }
        self.0.borrow_mut().prototype = prototype;
        true
    }

    pub fn class(&self) -> &'static str {
        self.0.borrow().class()
    }

    pub fn extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    pub fn callable(&self) -> Option<Callable> {
        match &self.0.borrow().kind {
            ObjectKind::Function(callable) => Some(callable.clone()),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Array)
    }

    /// The wrapped value of a Boolean, Number or String object.
    pub fn primitive_value(&self) -> Option<Value> {
        match &self.0.borrow().kind {
            ObjectKind::Boolean(b) => Some(Value::Boolean(*b)),
            ObjectKind::Number(n) => Some(Value::Number(*n)),
            ObjectKind::String(s) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    pub fn get_own_property(&self, key: &str) -> Option<PropertyDescriptor> {
        self.0.borrow().get_own_property(key)
    }

    /// `[[GetProperty]]`: the first descriptor for `key` along the chain.
    pub fn find_property(&self, key: &str) -> Option<PropertyDescriptor> {
        let mut cursor = Some(self.clone());
        while let Some(object) = cursor {
            let next = {
                let record = object.borrow();
                if let Some(desc) = record.get_own_property(key) {
                    return Some(desc);
                }
                record.prototype.clone()
            };
            cursor = next;
        }
        None
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.find_property(key).is_some()
    }

    pub fn own_keys(&self) -> Vec<PropertyKey> {
        self.0.borrow().own_keys()
    }

    pub fn enumerate(&self) -> PropertyNames {
        PropertyNames::new(self.clone())
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(record) => write!(f, "[object {}]", record.class()),
            Err(_) => write!(f, "[object <borrowed>]"),
        }
    }
}

/// Lazy `for-in` key sequence: own-then-inherited enumerable keys, skipping
/// keys shadowed by a more-derived object and keys deleted before they are
/// reached.
pub struct PropertyNames {
    origin: ObjectRef,
    current: Option<ObjectRef>,
    pending: Vec<PropertyKey>,
    position: usize,
    loaded: bool,
    shadowed: HashSet<PropertyKey>,
}

impl PropertyNames {
    pub fn new(origin: ObjectRef) -> Self {
        Self {
            current: Some(origin.clone()),
            origin,
            pending: Vec::new(),
            position: 0,
            loaded: false,
            shadowed: HashSet::new(),
        }
    }

    /// Rewinds to the start of the sequence, observing the current state of
    /// the chain.
    pub fn restart(&mut self) {
        self.current = Some(self.origin.clone());
        self.pending.clear();
        self.position = 0;
        self.loaded = false;
        self.shadowed.clear();
    }
}

impl Iterator for PropertyNames {
    type Item = PropertyKey;

    fn next(&mut self) -> Option<PropertyKey> {
        loop {
            let object = self.current.clone()?;
            if !self.loaded {
                self.pending = object.own_keys();
                self.position = 0;
                self.loaded = true;
            }
            while self.position < self.pending.len() {
                let key = self.pending[self.position].clone();
                self.position += 1;
                if self.shadowed.contains(&key) {
                    continue;
                }
                if let Some(desc) = object.get_own_property(&key) {
                    if desc.enumerable {
                        return Some(key);
                    }
                }
            }
            self.shadowed.extend(self.pending.drain(..));
            self.current = object.prototype();
            self.loaded = false;
        }
    }
}
