// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime values, objects and the class hierarchy.

use std::fmt;

use rustc_hash::FxHashMap;

/// A value on the operand stack or in a local slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// int (also booleans, as 0/1)
    Int(i32),
    /// long
    Long(i64),
    /// double
    Double(f64),
    /// null reference
    Null,
    /// Reference to a heap object
    Ref(usize),
}

impl Value {
    /// The int payload, if any.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this is int/long/double zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(v) => *v == 0,
            Value::Long(v) => *v == 0,
            Value::Double(v) => *v == 0.0,
            Value::Null | Value::Ref(_) => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Double(v) => write!(f, "{:?}", v),
            Value::Null => write!(f, "null"),
            Value::Ref(r) => write!(f, "@{}", r),
        }
    }
}

/// A heap object.
#[derive(Debug, Clone, Default)]
pub struct Object {
    /// The object's class
    pub class: String,
    /// Field values by name
    pub fields: FxHashMap<String, Value>,
}

/// Superclass links for exception matching.
#[derive(Debug, Clone)]
pub struct ClassHierarchy {
    parents: FxHashMap<String, String>,
}

/// Classes without a registered parent extend this one.
const DEFAULT_PARENT: &str = "Exception";

impl Default for ClassHierarchy {
    fn default() -> Self {
        let mut hierarchy = Self {
            parents: FxHashMap::default(),
        };
        hierarchy.register("Exception", "Throwable");
        hierarchy.register("Error", "Throwable");
        hierarchy.register("RuntimeException", "Exception");
        hierarchy.register("ArithmeticException", "RuntimeException");
        hierarchy.register("NullPointerException", "RuntimeException");
        hierarchy.register("IllegalStateException", "RuntimeException");
        hierarchy
    }
}

impl ClassHierarchy {
    /// Declares `class` as a direct subclass of `parent`.
    pub fn register(&mut self, class: &str, parent: &str) {
        self.parents.insert(class.to_string(), parent.to_string());
    }

    fn parent(&self, class: &str) -> Option<&str> {
        if class == "Throwable" {
            return None;
        }
        Some(
            self.parents
                .get(class)
                .map(String::as_str)
                .unwrap_or(DEFAULT_PARENT),
        )
    }

    /// Whether `class` is `ancestor` or inherits from it.
    pub fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        // Bounded so a cyclic registration cannot hang the lookup.
        let mut current = Some(class);
        for _ in 0..=self.parents.len() + 1 {
            match current {
                Some(c) if c == ancestor => return true,
                Some(c) => current = self.parent(c),
                None => return false,
            }
        }
        false
    }
}
