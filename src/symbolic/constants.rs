//! Reserved constant names.
//!
//! A variable whose name is registered here is a constant: it never shows up in free-variable
//! sets and the compiler folds it into a literal unless the caller declares it as an argument.
use crate::symbolic::numbers::Number;
use std::collections::HashMap;
use std::f64::consts::{E, PI};
use std::sync::OnceLock;

#[derive(Clone, Debug)]
pub struct ConstantRegistry {
    values: HashMap<String, Number>,
}

impl ConstantRegistry {
    /// `pi` and `e`.
    pub fn standard() -> Self {
        ConstantRegistry::empty()
            .with("pi", Number::real(PI))
            .with("e", Number::real(E))
    }

    pub fn empty() -> Self {
        ConstantRegistry {
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: Number) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn value(&self, name: &str) -> Option<&Number> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|name| name.as_str())
    }

    /// Process-wide registry used by the memoized node properties.
    pub fn global() -> &'static ConstantRegistry {
        static GLOBAL: OnceLock<ConstantRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ConstantRegistry::standard)
    }
}

impl Default for ConstantRegistry {
    fn default() -> Self {
        ConstantRegistry::standard()
    }
}
