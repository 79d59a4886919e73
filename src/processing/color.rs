use std::str::FromStr;

use palette::Srgb;

/// Parses `#rgb`, `rgb`, `#rrggbb` or `rrggbb` into an RGB triple.
///
/// Alpha-bearing forms (`#rgba`, `#rrggbbaa`) and anything else are rejected.
pub fn parse_hex_rgb(input: &str) -> Option<[u8; 3]> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !matches!(digits.len(), 3 | 6) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let rgb = Srgb::<u8>::from_str(digits).ok()?;
    Some([rgb.red, rgb.green, rgb.blue])
}

/// Renders the canonical `#rrggbb` form.
pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}
