//! Unicode script checks used by text shaping.

fn in_ranges(c: char, ranges: &[(u32, u32)]) -> bool {
    let c = c as u32;
    ranges.iter().any(|&(lo, hi)| c >= lo && c <= hi)
}

const ARABIC: &[(u32, u32)] = &[
    (0x0600, 0x06FF),
    (0x0750, 0x077F),
    (0x08A0, 0x08FF),
    (0xFB50, 0xFDFF),
    (0xFE70, 0xFEFF),
];

/// Scripts whose glyphs stay upright in vertical text.
const UPRIGHT_VERTICAL: &[(u32, u32)] = &[
    (0x1100, 0x11FF), // Hangul Jamo
    (0x2E80, 0x2FDF), // CJK radicals, Kangxi
    (0x2FF0, 0x2FFF), // ideographic description
    (0x3000, 0x303F), // CJK symbols and punctuation
    (0x3040, 0x30FF), // Hiragana, Katakana
    (0x3100, 0x312F), // Bopomofo
    (0x3130, 0x318F), // Hangul compatibility Jamo
    (0x3190, 0x31FF), // Kanbun .. Katakana phonetic extensions
    (0x3200, 0x4DBF), // enclosed CJK .. CJK extension A
    (0x4E00, 0x9FFF), // CJK unified ideographs
    (0xA000, 0xA4CF), // Yi
    (0xAC00, 0xD7AF), // Hangul syllables
    (0xF900, 0xFAFF), // CJK compatibility ideographs
    (0xFE30, 0xFE4F), // CJK compatibility forms
    (0xFF00, 0xFFEF), // halfwidth and fullwidth forms
    (0x20000, 0x2FA1F), // CJK extensions B..
];

pub fn char_has_upright_vertical_orientation(c: char) -> bool {
    in_ranges(c, UPRIGHT_VERTICAL)
}

pub fn allows_vertical_writing_mode(text: &str) -> bool {
    text.chars().any(char_has_upright_vertical_orientation)
}

/// Cursive scripts break when glyphs are spaced apart.
pub fn allows_letter_spacing(text: &str) -> bool {
    !text.chars().any(|c| in_ranges(c, ARABIC))
}

/// Whether a line may be broken after `c`.
pub fn is_break_opportunity(c: char) -> bool {
    c.is_whitespace() || c == '-' || char_has_upright_vertical_orientation(c)
}

#[cfg(test)]
mod tests {
    use super::{allows_letter_spacing, allows_vertical_writing_mode};

    #[test]
    fn scripts() {
        assert!(allows_vertical_writing_mode("東京"));
        assert!(!allows_vertical_writing_mode("Tokyo"));
        assert!(allows_letter_spacing("Cairo"));
        assert!(!allows_letter_spacing("القاهرة"));
    }
}
