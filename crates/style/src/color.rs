use serde_json::Value;

/// Linear RGBA with components in `0..=1`.
pub type Rgba = [f64; 4];

const NAMED: &[(&str, [u8; 4])] = &[
    ("transparent", [0, 0, 0, 0]),
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 128, 0, 255]),
    ("lime", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("orange", [255, 165, 0, 255]),
    ("purple", [128, 0, 128, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("gray", [128, 128, 128, 255]),
    ("grey", [128, 128, 128, 255]),
];

/// Parse a style color: CSS hex, `rgb()`/`rgba()`, a small named set, or an
/// `[r, g, b(, a)]` array with components in `0..=1`.
pub fn parse_color(value: &Value) -> Option<Rgba> {
    match value {
        Value::String(s) => parse_color_str(s),
        Value::Array(items) => {
            if items.len() < 3 || items.len() > 4 {
                return None;
            }
            let mut out = [0.0, 0.0, 0.0, 1.0];
            for (slot, item) in out.iter_mut().zip(items) {
                *slot = item.as_f64()?.clamp(0.0, 1.0);
            }
            Some(out)
        }
        _ => None,
    }
}

pub fn parse_color_str(s: &str) -> Option<Rgba> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = s.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let mut out = [0.0, 0.0, 0.0, 1.0];
        for (i, part) in parts.iter().enumerate() {
            let v: f64 = part.parse().ok()?;
            out[i] = if i < 3 { v / 255.0 } else { v };
            out[i] = out[i].clamp(0.0, 1.0);
        }
        return Some(out);
    }
    NAMED
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, c)| from_rgba8(*c))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let rgba = match hex.len() {
        3 | 4 => {
            let mut c = [255u8; 4];
            for (i, slot) in c.iter_mut().enumerate().take(hex.len()) {
                *slot = digit(i)? * 17;
            }
            c
        }
        6 | 8 => {
            let mut c = [255u8; 4];
            for (i, slot) in c.iter_mut().enumerate().take(hex.len() / 2) {
                *slot = byte(i * 2)?;
            }
            c
        }
        _ => return None,
    };
    Some(from_rgba8(rgba))
}

pub fn from_rgba8(c: [u8; 4]) -> Rgba {
    [
        f64::from(c[0]) / 255.0,
        f64::from(c[1]) / 255.0,
        f64::from(c[2]) / 255.0,
        f64::from(c[3]) / 255.0,
    ]
}

pub fn to_rgba8(c: Rgba) -> [u8; 4] {
    c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::{parse_color, to_rgba8};
    use serde_json::json;

    fn rgba8(v: serde_json::Value) -> Option<[u8; 4]> {
        parse_color(&v).map(to_rgba8)
    }

    #[test]
    fn hex_forms() {
        assert_eq!(rgba8(json!("#f00")), Some([255, 0, 0, 255]));
        assert_eq!(rgba8(json!("#0f08")), Some([0, 255, 0, 136]));
        assert_eq!(rgba8(json!("#102030")), Some([16, 32, 48, 255]));
        assert_eq!(rgba8(json!("#10203040")), Some([16, 32, 48, 64]));
        assert_eq!(rgba8(json!("#12345")), None);
    }

    #[test]
    fn functional_named_and_array_forms() {
        assert_eq!(rgba8(json!("rgb(1, 2, 3)")), Some([1, 2, 3, 255]));
        assert_eq!(rgba8(json!("RGBA(10,20,30,0.5)")), Some([10, 20, 30, 128]));
        assert_eq!(rgba8(json!("white")), Some([255, 255, 255, 255]));
        assert_eq!(rgba8(json!([1, 0, 0.5])), Some([255, 0, 128, 255]));
        assert_eq!(rgba8(json!([1, 0])), None);
        assert_eq!(rgba8(json!("not-a-color")), None);
    }
}
