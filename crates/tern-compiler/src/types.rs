// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The slice of the static type system the control-flow core depends on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;

/// A static type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 64-bit float
    Double,
    /// boolean
    Boolean,
    /// No value
    Void,
    /// The type of the `null` literal
    Null,
    /// An object of the named class
    Reference(String),
    /// Placeholder after an error; matches everything
    Any,
}

impl Type {
    /// Whether a value of this type can be used where `expected` is required.
    pub fn matches(&self, expected: &Type) -> bool {
        match (self, expected) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Null, Type::Reference(_)) | (Type::Reference(_), Type::Null) => true,
            // Class hierarchy lives outside this crate.
            (Type::Reference(_), Type::Reference(_)) => true,
            (a, b) => a == b,
        }
    }

    /// Checks `self` against `expected`, reporting a diagnostic on mismatch.
    pub fn must_match_expected(&self, line: u32, expected: &Type, diags: &mut Diagnostics) -> bool {
        if self.matches(expected) {
            return true;
        }
        diags.report(line, format!("expected type {}, found {}", expected, self));
        false
    }

    /// Checks `self` against each of `options`, reporting a diagnostic if none fit.
    pub fn must_match_one_of(&self, line: u32, options: &[Type], diags: &mut Diagnostics) -> bool {
        if options.iter().any(|t| self.matches(t)) {
            return true;
        }
        let names: Vec<String> = options.iter().map(Type::to_string).collect();
        diags.report(
            line,
            format!("expected one of {}, found {}", names.join(", "), self),
        );
        false
    }

    /// int, long or double.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Long | Type::Double)
    }

    /// Reference or null.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference(_) | Type::Null)
    }

    /// Numeric types that ++/-- accept. `Any` passes so errors do not cascade.
    pub fn is_incrementable(&self) -> bool {
        matches!(self, Type::Int | Type::Long | Type::Double | Type::Any)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Double => write!(f, "double"),
            Type::Boolean => write!(f, "boolean"),
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Reference(name) => write!(f, "{}", name),
            Type::Any => write!(f, "<error>"),
        }
    }
}
