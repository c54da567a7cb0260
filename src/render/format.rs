//! Small formatting helpers shared by the miners

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+):(\d+)").expect("location pattern"));
static BUILD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+)\.(.+)").expect("build pattern"));

/// `"12.38:1234567"` -> `"Chr 12 1,234,567"`; bare numbers just get commas.
/// The build suffix after the last dot of the chromosome is dropped.
pub fn pretty_location(loc: &str) -> String {
    let mut bits: Vec<String> = Vec::new();
    let mut digits = loc;
    if let Some(caps) = LOCATION_RE.captures(loc) {
        let mut chr = caps.get(1).map_or("", |m| m.as_str());
        digits = caps.get(2).map_or("", |m| m.as_str());
        if let Some(build) = BUILD_RE.captures(chr) {
            chr = build.get(1).map_or(chr, |m| m.as_str());
        }
        bits.push(format!("Chr {}", chr));
    }
    bits.push(group_thousands(digits));
    let out = bits.join(" ");
    if out.trim().is_empty() {
        loc.to_string()
    } else {
        out
    }
}

/// Insert a comma every three characters from the right
pub fn group_thousands(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let head = chars.len() % 3;
    let mut out = String::with_capacity(chars.len() + chars.len() / 3);
    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && i >= head && (i - head) % 3 == 0 {
            out.push(',');
        }
        out.push(*ch);
    }
    out
}

/// Grayscale background for a fraction; dark cells get white bold text
pub fn frac_to_gray(fv: f64) -> String {
    let rgb = (0.5 + (1.0 - fv) * 255.0).floor().clamp(0.0, 255.0) as u8;
    let mut style = format!("background-color: rgb({},{},{})", rgb, rgb, rgb);
    if fv >= 0.5 {
        style.push_str("; color: white; font-weight: bold;");
    }
    style
}

/// Escape text for a single-quoted HTML attribute
pub fn esc_attr(text: &str) -> String {
    text.replace('\'', "&apos;")
        .replace('"', "&quot;")
        .replace('>', "&gt;")
        .replace('<', "&lt;")
}

/// Allow-list sanitizer for values placed in `class`/`style` attributes.
/// Keeps letters, digits and `_:;.-#` plus spaces.
pub fn unxss(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | ';' | '.' | '-' | '#' | ' '))
        .collect()
}

/// Percentage right-aligned to three characters so text sorting follows value
pub fn padded_percent(fv: f64) -> String {
    format!("{:>3}%", (0.5 + fv * 100.0).floor() as i64)
}

/// Drop repeats, keeping first occurrences in order
pub fn unique(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}

/// Browser-style number text (`0.1`, `3`, `0.005`)
pub fn float_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_location_with_build() {
        assert_eq!(pretty_location("12.38:1234567"), "Chr 12 1,234,567");
    }

    #[test]
    fn test_pretty_location_plain_number() {
        assert_eq!(pretty_location("1234"), "1,234");
        assert_eq!(pretty_location("123"), "123");
        assert_eq!(pretty_location("X:100"), "Chr X 100");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1234567"), "1,234,567");
        assert_eq!(group_thousands("123456"), "123,456");
        assert_eq!(group_thousands(""), "");
    }

    #[test]
    fn test_frac_to_gray() {
        assert_eq!(frac_to_gray(0.0), "background-color: rgb(255,255,255)");
        assert_eq!(
            frac_to_gray(1.0),
            "background-color: rgb(0,0,0); color: white; font-weight: bold;"
        );
        assert_eq!(frac_to_gray(0.25), "background-color: rgb(191,191,191)");
        assert_eq!(frac_to_gray(-1.0), "background-color: rgb(255,255,255)");
    }

    #[test]
    fn test_esc_attr() {
        assert_eq!(esc_attr("a'b\"<c>"), "a&apos;b&quot;&lt;c&gt;");
    }

    #[test]
    fn test_unxss_strips_markup() {
        assert_eq!(unxss("color: red;<script>"), "color: red;script");
        assert_eq!(unxss("url('x')"), "urlx");
    }

    #[test]
    fn test_padded_percent() {
        assert_eq!(padded_percent(0.25), " 25%");
        assert_eq!(padded_percent(0.004), "  0%");
        assert_eq!(padded_percent(1.0), "100%");
    }

    #[test]
    fn test_unique_keeps_order() {
        let v = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(unique(&v), vec!["b", "a"]);
    }
}
