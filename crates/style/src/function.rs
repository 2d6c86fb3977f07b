use crate::color::parse_color;
use crate::error::StyleError;
use formats::TileFeature;
use serde_json::{Map, Value};

/// Nested definitions deeper than this resolve to nothing.
pub const MAX_FN_DEPTH: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FnKind {
    Interval,
    Categorical,
    Exponential,
    Identity,
}

impl FnKind {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "interval" => Some(FnKind::Interval),
            "categorical" => Some(FnKind::Categorical),
            "exponential" => Some(FnKind::Exponential),
            "identity" => Some(FnKind::Identity),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            FnKind::Interval => "interval",
            FnKind::Categorical => "categorical",
            FnKind::Exponential => "exponential",
            FnKind::Identity => "identity",
        }
    }
}

/// Outcome of one resolution step. A stop output may itself be a function
/// definition, which the caller evaluates against the same inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    Deferred(FnDef),
}

impl Resolved {
    fn to_value(&self) -> Value {
        match self {
            Resolved::Value(v) => v.clone(),
            Resolved::Deferred(def) => def.to_value(),
        }
    }
}

/// Zoom- or property-driven style function.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDef {
    pub kind: Option<FnKind>,
    pub property: Option<String>,
    pub stops: Vec<(Value, Resolved)>,
    pub default: Option<Value>,
    pub base: f64,
}

/// Anything a property-driven function can read its input from.
pub trait PropertySource {
    fn property(&self, key: &str) -> Option<Value>;
}

impl PropertySource for Map<String, Value> {
    fn property(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl PropertySource for TileFeature {
    fn property(&self, key: &str) -> Option<Value> {
        self.property_or_meta(key)
    }
}

impl FnDef {
    /// Whether a style value is a function definition rather than a constant.
    pub fn is_definition(value: &Value) -> bool {
        match value {
            Value::Object(obj) => {
                obj.contains_key("stops")
                    || obj.get("type").and_then(Value::as_str) == Some("identity")
            }
            _ => false,
        }
    }

    /// Parse `value` as a definition; constants give `Ok(None)`.
    pub fn parse(field: &str, value: &Value) -> Result<Option<FnDef>, StyleError> {
        if !Self::is_definition(value) {
            return Ok(None);
        }
        let invalid = |reason: String| StyleError::InvalidFunction {
            field: field.to_string(),
            reason,
        };
        let Value::Object(obj) = value else {
            return Ok(None);
        };

        let kind = match obj.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(
                FnKind::parse(name).ok_or_else(|| invalid(format!("unknown type {name}")))?,
            ),
            Some(other) => return Err(invalid(format!("type must be a string, got {other}"))),
        };

        let property = match obj.get("property") {
            None | Some(Value::Null) => None,
            Some(Value::String(p)) => Some(p.clone()),
            Some(other) => return Err(invalid(format!("property must be a string, got {other}"))),
        };

        let mut stops = Vec::new();
        match obj.get("stops") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    let pair = item
                        .as_array()
                        .filter(|pair| pair.len() == 2)
                        .ok_or_else(|| invalid("each stop must be a [input, output] pair".into()))?;
                    if pair[0].is_object() || pair[0].is_array() {
                        return Err(invalid(format!("unsupported stop input {}", pair[0])));
                    }
                    let output = match FnDef::parse(field, &pair[1])? {
                        Some(nested) => Resolved::Deferred(nested),
                        None => Resolved::Value(pair[1].clone()),
                    };
                    stops.push((pair[0].clone(), output));
                }
            }
            Some(_) => return Err(invalid("stops must be an array".into())),
        }

        let base = match obj.get("base") {
            None | Some(Value::Null) => 1.0,
            Some(v) => v
                .as_f64()
                .ok_or_else(|| invalid(format!("base must be a number, got {v}")))?,
        };

        Ok(Some(FnDef {
            kind,
            property,
            stops,
            default: obj.get("default").filter(|v| !v.is_null()).cloned(),
            base,
        }))
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(kind) = self.kind {
            obj.insert("type".into(), Value::from(kind.name()));
        }
        if let Some(property) = &self.property {
            obj.insert("property".into(), Value::from(property.clone()));
        }
        let stops = self
            .stops
            .iter()
            .map(|(input, output)| Value::Array(vec![input.clone(), output.to_value()]))
            .collect();
        obj.insert("stops".into(), Value::Array(stops));
        if let Some(default) = &self.default {
            obj.insert("default".into(), default.clone());
        }
        if self.base != 1.0 {
            obj.insert("base".into(), Value::from(self.base));
        }
        Value::Object(obj)
    }

    pub fn is_zoom_only(&self) -> bool {
        self.property.is_none()
    }

    /// True when this definition or any nested output reads a property.
    pub fn reads_properties(&self) -> bool {
        self.property.is_some()
            || self.stops.iter().any(|(_, output)| match output {
                Resolved::Deferred(nested) => nested.reads_properties(),
                Resolved::Value(_) => false,
            })
    }

    fn fallback(&self) -> Option<Resolved> {
        self.default.clone().map(Resolved::Value)
    }

    /// Step-wise resolution: interval lookup on numbers, exact match otherwise.
    pub fn resolve_piecewise(&self, input: &Value) -> Option<Resolved> {
        if input.is_null() {
            return self.fallback();
        }
        match self.kind {
            Some(FnKind::Identity) => Some(Resolved::Value(input.clone())),
            Some(FnKind::Categorical) => self.categorical(input),
            Some(FnKind::Interval) | Some(FnKind::Exponential) => self.interval(input),
            None => {
                let numeric_stops = self.stops.iter().all(|(k, _)| k.is_number());
                if input.is_number() && numeric_stops {
                    self.interval(input)
                } else {
                    self.categorical(input)
                }
            }
        }
    }

    /// Exponential interpolation between numeric stops; numbers, colors and
    /// numeric arrays blend, any other output steps like an interval.
    pub fn resolve_interpolated(&self, input: &Value) -> Option<Resolved> {
        if input.is_null() {
            return self.fallback();
        }
        match self.kind {
            Some(FnKind::Identity) => return Some(Resolved::Value(input.clone())),
            Some(FnKind::Categorical) => return self.categorical(input),
            Some(FnKind::Interval) => return self.interval(input),
            Some(FnKind::Exponential) | None => {}
        }
        let Some(x) = input.as_f64() else {
            return self.fallback();
        };
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return self.fallback(),
        };
        if x <= first.0.as_f64()? {
            return Some(first.1.clone());
        }
        if x >= last.0.as_f64()? {
            return Some(last.1.clone());
        }
        for pair in self.stops.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            let (lo_x, hi_x) = (lo.0.as_f64()?, hi.0.as_f64()?);
            if x >= lo_x && x < hi_x {
                let t = interpolation_factor(x, self.base, lo_x, hi_x);
                return Some(blend(&lo.1, &hi.1, t));
            }
        }
        Some(last.1.clone())
    }

    fn categorical(&self, input: &Value) -> Option<Resolved> {
        self.stops
            .iter()
            .find(|(key, _)| same_key(key, input))
            .map(|(_, output)| output.clone())
            .or_else(|| self.fallback())
    }

    fn interval(&self, input: &Value) -> Option<Resolved> {
        let Some(x) = input.as_f64() else {
            return self.fallback();
        };
        let first = self.stops.first()?;
        if first.0.as_f64().is_some_and(|k| x < k) {
            return Some(first.1.clone());
        }
        self.stops
            .iter()
            .rev()
            .find(|(key, _)| key.as_f64().is_some_and(|k| k <= x))
            .map(|(_, output)| output.clone())
            .or_else(|| self.fallback())
    }
}

fn same_key(key: &Value, input: &Value) -> bool {
    match (key.as_f64(), input.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => key == input,
    }
}

fn interpolation_factor(x: f64, base: f64, lower: f64, upper: f64) -> f64 {
    let diff = upper - lower;
    let progress = x - lower;
    if diff == 0.0 {
        0.0
    } else if base == 1.0 {
        progress / diff
    } else {
        (base.powf(progress) - 1.0) / (base.powf(diff) - 1.0)
    }
}

fn blend(lo: &Resolved, hi: &Resolved, t: f64) -> Resolved {
    let (Resolved::Value(a), Resolved::Value(b)) = (lo, hi) else {
        return lo.clone();
    };
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return Resolved::Value(Value::from(a + (b - a) * t));
    }
    if let (Value::Array(xs), Value::Array(ys)) = (a, b)
        && xs.len() == ys.len()
    {
        let blended: Option<Vec<Value>> = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| Some(Value::from(x.as_f64()? + (y.as_f64()? - x.as_f64()?) * t)))
            .collect();
        if let Some(values) = blended {
            return Resolved::Value(Value::Array(values));
        }
    }
    if let (Some(ca), Some(cb)) = (parse_color(a), parse_color(b)) {
        let mixed: Vec<Value> = ca
            .iter()
            .zip(cb)
            .map(|(x, y)| Value::from(x + (y - x) * t))
            .collect();
        return Resolved::Value(Value::Array(mixed));
    }
    lo.clone()
}

/// Evaluate a definition for one zoom and feature, following nested
/// definitions up to [`MAX_FN_DEPTH`].
pub fn evaluate(
    def: &FnDef,
    interpolated: bool,
    zoom: f64,
    props: &dyn PropertySource,
) -> Option<Value> {
    let mut current = def.clone();
    for _ in 0..MAX_FN_DEPTH {
        let input = match &current.property {
            Some(key) => props.property(key).unwrap_or(Value::Null),
            None => Value::from(zoom),
        };
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
    tracing::trace!(depth = MAX_FN_DEPTH, "nested style function too deep");
    None
}

#[cfg(test)]
mod tests {
    use super::{FnDef, FnKind, Resolved, evaluate};
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value, json};

    fn def(v: Value) -> FnDef {
        FnDef::parse("field", &v).expect("valid").expect("definition")
    }

    fn value(r: Option<Resolved>) -> Option<Value> {
        match r {
            Some(Resolved::Value(v)) => Some(v),
            _ => None,
        }
    }

    #[test]
    fn constants_are_not_definitions() {
        assert_eq!(FnDef::parse("f", &json!(3)).expect("ok"), None);
        assert_eq!(FnDef::parse("f", &json!({"a": 1})).expect("ok"), None);
        let err = FnDef::parse("f", &json!({"stops": [[1]]})).expect_err("bad stop");
        assert!(err.to_string().contains("f"));
    }

    #[test]
    fn interval_lookup() {
        let f = def(json!({"stops": [[5, "a"], [10, "b"]]}));
        assert_eq!(value(f.resolve_piecewise(&json!(1))), Some(json!("a")));
        assert_eq!(value(f.resolve_piecewise(&json!(5))), Some(json!("a")));
        assert_eq!(value(f.resolve_piecewise(&json!(9.9))), Some(json!("a")));
        assert_eq!(value(f.resolve_piecewise(&json!(12))), Some(json!("b")));
    }

    #[test]
    fn categorical_falls_back_to_default() {
        let f = def(json!({
            "type": "categorical", "property": "kind",
            "stops": [["road", 1], ["rail", 2]], "default": 9
        }));
        assert_eq!(f.kind, Some(FnKind::Categorical));
        assert_eq!(value(f.resolve_piecewise(&json!("rail"))), Some(json!(2)));
        assert_eq!(value(f.resolve_piecewise(&json!("path"))), Some(json!(9)));
        assert_eq!(value(f.resolve_piecewise(&Value::Null)), Some(json!(9)));
    }

    #[test]
    fn exponential_interpolation() {
        let linear = def(json!({"stops": [[0, 0], [10, 100]]}));
        assert_eq!(value(linear.resolve_interpolated(&json!(2.5))), Some(json!(25.0)));
        assert_eq!(value(linear.resolve_interpolated(&json!(-1))), Some(json!(0)));
        assert_eq!(value(linear.resolve_interpolated(&json!(11))), Some(json!(100)));

        let curved = def(json!({"base": 2, "stops": [[0, 0], [2, 3]]}));
        assert_eq!(value(curved.resolve_interpolated(&json!(1))), Some(json!(1.0)));
    }

    #[test]
    fn colors_interpolate_componentwise() {
        let f = def(json!({"stops": [[0, "#000000"], [10, "#ffffff"]]}));
        assert_eq!(
            value(f.resolve_interpolated(&json!(5))),
            Some(json!([0.5, 0.5, 0.5, 1.0]))
        );
    }

    #[test]
    fn nested_definitions_are_followed() {
        let f = def(json!({
            "stops": [[0, {"property": "h", "stops": [[0, 1], [10, 2]]}]]
        }));
        assert!(f.reads_properties());
        let mut props = Map::new();
        props.insert("h".into(), json!(20));
        assert_eq!(evaluate(&f, false, 3.0, &props), Some(json!(2)));
    }

    #[test]
    fn nesting_depth_is_capped() {
        let mut v = json!(7);
        for _ in 0..5 {
            v = json!({"stops": [[0, v]]});
        }
        let f = def(v);
        assert_eq!(evaluate(&f, false, 1.0, &Map::new()), None);

        let mut shallow = json!(7);
        for _ in 0..4 {
            shallow = json!({"stops": [[0, shallow]]});
        }
        assert_eq!(evaluate(&def(shallow), false, 1.0, &Map::new()), Some(json!(7)));
    }

    #[test]
    fn definitions_round_trip_to_json() {
        let source = json!({"type": "interval", "property": "p", "stops": [[1, "x"]], "default": "y"});
        assert_eq!(def(source.clone()).to_value(), source);
    }
}
