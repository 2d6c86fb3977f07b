use crate::error::StyleError;
use crate::function::{FnDef, PropertySource, evaluate};
use crate::symbol::Symbol;
use serde_json::Value;
use std::collections::BTreeMap;

/// Fields whose functions blend between stops; everything else steps.
pub const INTERPOLATED_FIELDS: &[&str] = &[
    "lineWidth",
    "lineStrokeWidth",
    "lineDx",
    "lineDy",
    "lineOpacity",
    "linePatternAnimSpeed",
    "markerWidth",
    "markerHeight",
    "markerDx",
    "markerDy",
    "markerSpacing",
    "markerOpacity",
    "markerRotation",
    "textWrapWidth",
    "textSpacing",
    "textSize",
    "textHaloRadius",
    "textHaloOpacity",
    "textDx",
    "textDy",
    "textOpacity",
    "textRotation",
    "polygonOpacity",
    "textFill",
    "textHaloFill",
    "lineColor",
    "markerFill",
];

pub fn is_interpolated(name: &str) -> bool {
    INTERPOLATED_FIELDS.contains(&name)
}

#[derive(Debug, Clone)]
struct FieldFn {
    def: FnDef,
    interpolated: bool,
}

/// Compiled resolvers for the property-driven fields of one symbol.
#[derive(Debug, Clone, Default)]
pub struct FnTypes {
    fns: BTreeMap<String, FieldFn>,
}

impl FnTypes {
    pub fn compile(symbol: &Symbol) -> Result<Self, StyleError> {
        let mut fns = BTreeMap::new();
        for (name, value) in symbol.fields() {
            let Some(def) = FnDef::parse(name, value)? else {
                continue;
            };
            if def.reads_properties() {
                fns.insert(
                    name.clone(),
                    FieldFn {
                        def,
                        interpolated: is_interpolated(name),
                    },
                );
            }
        }
        Ok(Self { fns })
    }

    pub fn is_dynamic(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn dynamic_fields(&self) -> impl Iterator<Item = &str> {
        self.fns.keys().map(String::as_str)
    }

    /// Resolve a property-driven field for one feature.
    pub fn resolve(&self, name: &str, zoom: f64, props: &dyn PropertySource) -> Option<Value> {
        let field = self.fns.get(name)?;
        evaluate(&field.def, field.interpolated, zoom, props)
    }

    /// Value of `name` for one feature: the resolver output for dynamic
    /// fields, otherwise the symbol's value (zoom functions evaluated).
    pub fn value(
        &self,
        symbol: &Symbol,
        name: &str,
        zoom: f64,
        props: &dyn PropertySource,
    ) -> Option<Value> {
        if self.is_dynamic(name) {
            return self.resolve(name, zoom, props);
        }
        let raw = symbol.get(name)?;
        match FnDef::parse(name, raw) {
            Ok(Some(def)) => evaluate(&def, is_interpolated(name), zoom, props),
            Ok(None) => (!raw.is_null()).then(|| raw.clone()),
            Err(_) => None,
        }
    }

    pub fn number(
        &self,
        symbol: &Symbol,
        name: &str,
        zoom: f64,
        props: &dyn PropertySource,
    ) -> Option<f64> {
        self.value(symbol, name, zoom, props)
            .and_then(|v| v.as_f64())
    }

    pub fn string(
        &self,
        symbol: &Symbol,
        name: &str,
        zoom: f64,
        props: &dyn PropertySource,
    ) -> Option<String> {
        match self.value(symbol, name, zoom, props)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn boolean(
        &self,
        symbol: &Symbol,
        name: &str,
        zoom: f64,
        props: &dyn PropertySource,
    ) -> Option<bool> {
        self.value(symbol, name, zoom, props)
            .and_then(|v| v.as_bool())
    }
}

/// Replace `{key}` placeholders with property values; unresolved keys are
/// replaced by `missing`.
pub fn replace_template(template: &str, props: &dyn PropertySource, missing: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let key = &rest[open + 1..open + close];
        match props.property(key) {
            Some(Value::String(s)) => out.push_str(&s),
            Some(Value::Null) | None => out.push_str(missing),
            Some(other) => out.push_str(&other.to_string()),
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}
