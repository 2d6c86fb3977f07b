use formats::{GeometryType, TileFeature};
use serde_json::Value;
use std::collections::BTreeMap;

fn group_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Indices of `features` grouped by the value of `key`, in order of first
/// appearance. Only line features carrying the property are grouped; every
/// other feature forms its own group.
pub fn group_by_property(features: &[TileFeature], key: &str) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_value: BTreeMap<String, usize> = BTreeMap::new();
    for (i, feature) in features.iter().enumerate() {
        let value = feature
            .property(key)
            .filter(|_| feature.kind == GeometryType::LineString);
        let Some(value) = value else {
            groups.push(vec![i]);
            continue;
        };
        match by_value.get(&group_key(value)) {
            Some(&g) => groups[g].push(i),
            None => {
                by_value.insert(group_key(value), groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

/// Merge line features sharing `key` into one multi-line feature each.
///
/// The merged feature keeps the first member's properties, id and index.
/// A part that starts where the previous one ended extends it.
pub fn merge_line_features(features: Vec<TileFeature>, key: &str) -> Vec<TileFeature> {
    let groups = group_by_property(&features, key);
    let mut slots: Vec<Option<TileFeature>> = features.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        let mut members = group.iter().filter_map(|&i| slots[i].take());
        let Some(mut merged) = members.next() else {
            continue;
        };
        let mut lines = std::mem::take(&mut merged.geometry);
        for member in members {
            for part in member.geometry {
                match lines.last_mut() {
                    Some(last) if !part.is_empty() && last.last() == part.first() => {
                        last.extend_from_slice(&part[1..]);
                    }
                    _ => lines.push(part),
                }
            }
        }
        merged.geometry = lines;
        out.push(merged);
    }
    out
}
