use crate::error::StyleError;
use crate::fn_types::is_interpolated;
use crate::function::{FnDef, MAX_FN_DEPTH, Resolved};
use serde_json::{Map, Value};

/// Declarative style object: every field is a constant or a function
/// definition of zoom and/or feature properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Symbol {
    fields: Map<String, Value>,
}

impl Symbol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self, StyleError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(StyleError::NotAnObject),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Fold zoom-only functions into constants for `zoom`. Property-driven
    /// definitions stay in place; fields resolving to nothing are removed.
    pub fn at_zoom(&self, zoom: f64) -> Result<Symbol, StyleError> {
        let mut fields = Map::new();
        for (name, value) in &self.fields {
            let Some(def) = FnDef::parse(name, value)? else {
                fields.insert(name.clone(), value.clone());
                continue;
            };
            if let Some(folded) = fold_zoom(def, is_interpolated(name), zoom) {
                fields.insert(name.clone(), folded);
            }
        }
        Ok(Symbol { fields })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_fn(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(FnDef::is_definition)
    }

    /// The field's value when it is a constant.
    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.fields
            .get(name)
            .filter(|v| !v.is_null() && !FnDef::is_definition(v))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.constant(name).and_then(Value::as_f64)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.constant(name).and_then(Value::as_str)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.constant(name).and_then(Value::as_bool)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

fn fold_zoom(def: FnDef, interpolated: bool, zoom: f64) -> Option<Value> {
    let mut current = def;
    for _ in 0..MAX_FN_DEPTH {
        if !current.is_zoom_only() {
            return Some(current.to_value());
        }
        let input = Value::from(zoom);
        let step = if interpolated {
            current.resolve_interpolated(&input)
        } else {
            current.resolve_piecewise(&input)
        };
        match step? {
            Resolved::Value(v) => return Some(v),
            Resolved::Deferred(next) => current = next,
        }
    }
    None
}
