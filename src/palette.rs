//! Highlight colors and the order → color policy
//!
//! Every highlighted term gets a color from the palette by its insertion order:
//! `palette[order % palette.len()]`. An empty palette never reaches the
//! modulo; [`DEFAULT_PALETTE`] is substituted first.

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color from RGB values (alpha defaults to 255)
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse from "#RRGGBB" (the leading `#` is optional)
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let s = s.trim_start_matches('#');
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("Invalid color format: {}", s));
        }
        Ok(Color {
            r: u8::from_str_radix(&s[0..2], 16).map_err(|e| e.to_string())?,
            g: u8::from_str_radix(&s[2..4], 16).map_err(|e| e.to_string())?,
            b: u8::from_str_radix(&s[4..6], 16).map_err(|e| e.to_string())?,
            a: 255,
        })
    }

    /// Format as uppercase "#RRGGBB" (alpha is dropped)
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Built-in highlight palette, used whenever the configured one is empty
pub const DEFAULT_PALETTE: [Color; 10] = [
    Color::rgb(0xFF, 0xB7, 0x4D),
    Color::rgb(0x81, 0xC7, 0x84),
    Color::rgb(0x64, 0xB5, 0xF6),
    Color::rgb(0xBA, 0x68, 0xC8),
    Color::rgb(0xE5, 0x73, 0x73),
    Color::rgb(0x4D, 0xD0, 0xE1),
    Color::rgb(0xAE, 0xD5, 0x81),
    Color::rgb(0xFF, 0xD5, 0x4F),
    Color::rgb(0xF0, 0x62, 0x92),
    Color::rgb(0x90, 0xA4, 0xAE),
];

/// Text color drawn on top of highlight backgrounds unless configured
pub const DEFAULT_FOREGROUND: Color = Color::rgb(0xFF, 0xFF, 0xFF);

/// Color for the term with the given insertion order
pub fn color_for(order: u64, palette: &[Color]) -> Color {
    let palette = if palette.is_empty() {
        &DEFAULT_PALETTE[..]
    } else {
        palette
    };
    palette[(order % palette.len() as u64) as usize]
}

/// Normalize a user-supplied color string to `#RRGGBB`
///
/// Trims, adds a missing `#` and uppercases. Returns `None` for blank or
/// malformed input.
pub fn normalize_hex(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", digits.to_ascii_uppercase()))
}

/// Parse a palette, dropping malformed entries
///
/// Falls back to [`DEFAULT_PALETTE`] when nothing valid remains.
pub fn sanitize_palette<S: AsRef<str>>(values: &[S]) -> Vec<Color> {
    let colors: Vec<Color> = values
        .iter()
        .filter_map(|v| normalize_hex(v.as_ref()))
        .filter_map(|hex| Color::from_hex(&hex).ok())
        .collect();
    if colors.is_empty() {
        DEFAULT_PALETTE.to_vec()
    } else {
        colors
    }
}

/// Parse a foreground color, falling back to [`DEFAULT_FOREGROUND`]
pub fn sanitize_foreground(value: &str) -> Color {
    normalize_hex(value)
        .and_then(|hex| Color::from_hex(&hex).ok())
        .unwrap_or(DEFAULT_FOREGROUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(0xFF, 0, 0);
    const GREEN: Color = Color::rgb(0, 0xFF, 0);

    #[test]
    fn test_color_for_wraps_around_palette() {
        let palette = [RED, GREEN];
        assert_eq!(color_for(0, &palette), RED);
        assert_eq!(color_for(1, &palette), GREEN);
        assert_eq!(color_for(2, &palette), RED);
        assert_eq!(color_for(7, &palette), GREEN);
    }

    #[test]
    fn test_color_for_empty_palette_uses_default() {
        assert_eq!(color_for(0, &[]), color_for(0, &DEFAULT_PALETTE));
        assert_eq!(color_for(13, &[]), DEFAULT_PALETTE[3]);
    }

    #[test]
    fn test_adjacent_orders_get_distinct_colors() {
        for order in 0..DEFAULT_PALETTE.len() as u64 - 1 {
            assert_ne!(
                color_for(order, &DEFAULT_PALETTE),
                color_for(order + 1, &DEFAULT_PALETTE)
            );
        }
    }

    #[test]
    fn test_from_hex_round_trips_through_to_hex() {
        let color = Color::from_hex("#64B5F6").unwrap();
        assert_eq!(color, Color::rgb(0x64, 0xB5, 0xF6));
        assert_eq!(color.to_hex(), "#64B5F6");
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#GGGGGG").is_err());
        assert!(Color::from_hex("").is_err());
    }

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex("  ffb74d "), Some("#FFB74D".to_string()));
        assert_eq!(normalize_hex("#abcdef"), Some("#ABCDEF".to_string()));
        assert_eq!(normalize_hex("#abc"), None);
        assert_eq!(normalize_hex("   "), None);
        assert_eq!(normalize_hex("#12345G"), None);
        // Non-ASCII must not panic on slicing
        assert_eq!(normalize_hex("#ÄÄÄ"), None);
    }

    #[test]
    fn test_sanitize_palette_drops_invalid_entries() {
        let palette = sanitize_palette(&["#FF0000", "nope", "00ff00"]);
        assert_eq!(palette, vec![RED, GREEN]);
    }

    #[test]
    fn test_sanitize_palette_falls_back_to_default() {
        let empty: [&str; 0] = [];
        assert_eq!(sanitize_palette(&empty), DEFAULT_PALETTE.to_vec());
        assert_eq!(sanitize_palette(&["", "zzz"]), DEFAULT_PALETTE.to_vec());
    }

    #[test]
    fn test_sanitize_foreground() {
        assert_eq!(sanitize_foreground("#000000"), Color::rgb(0, 0, 0));
        assert_eq!(sanitize_foreground("black"), DEFAULT_FOREGROUND);
    }
}
