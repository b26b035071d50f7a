//! Built-in functions for VoidScript
//!
//! The standard library is organized by category:
//! - Types: type, str, int, float, bool, is_*
//! - Math: abs, min, max, clamp, floor, ceil, round, sqrt, pow, sin, cos, lerp
//! - Strings: upper, lower, trim, split, join, contains, replace
//! - Collections: len, push, pop, first, last, keys, values, get, set, range, sum
//!
//! Natives are registered into a [`NativeTable`], which a host turns into
//! an importable module. Nothing here performs I/O; output belongs to the
//! host that owns the table.

pub mod collections;
pub mod math;
pub mod strings;
pub mod types;

use std::collections::BTreeMap;

use crate::value::{NativeFunction, Value};

/// Named set of native functions
#[derive(Debug, Clone, Default)]
pub struct NativeTable {
    functions: BTreeMap<String, NativeFunction>,
}

impl NativeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variadic native function
    pub fn register_native<F>(&mut self, name: &str, func: F)
    where
        F: Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register_native_with_arity(name, -1, func);
    }

    /// Register a native function with known arity
    pub fn register_native_with_arity<F>(&mut self, name: &str, arity: i32, func: F)
    where
        F: Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.insert(NativeFunction::new(name, arity, func));
    }

    /// Insert an existing native, replacing any of the same name
    pub fn insert(&mut self, native: NativeFunction) {
        self.functions.insert(native.name.clone(), native);
    }

    /// Merge every function from another table
    pub fn extend(&mut self, other: &NativeTable) {
        for native in other.functions.values() {
            self.insert(native.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Function names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NativeFunction> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Build the standard library table
pub fn standard_library() -> NativeTable {
    let mut table = NativeTable::new();

    types::register(&mut table);
    math::register(&mut table);
    strings::register(&mut table);
    collections::register(&mut table);

    table
}
