use crate::cell::PlayerId;

/// Upper bound on players a board is generated for.
pub const MAX_PLAYERS: u8 = 32;

/// Fill and accent for the first six players.
const PALETTE: [((u8, u8, u8), (u8, u8, u8)); 6] = [
    ((0xED, 0x55, 0x65), (0xDA, 0x44, 0x53)),
    ((0xFF, 0xCE, 0x54), (0xF6, 0xBB, 0x42)),
    ((0xA0, 0xD4, 0x68), (0x8C, 0xC1, 0x52)),
    ((0x4F, 0xC1, 0xE9), (0x3B, 0xAF, 0xDA)),
    ((0x5D, 0x9C, 0xEC), (0x4A, 0x89, 0xDC)),
    ((0xEC, 0x87, 0xC0), (0xD7, 0x70, 0xAD)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerColor {
    pub fill: (u8, u8, u8),
    pub accent: (u8, u8, u8),
}

/// Palette colour for `player`; players past the palette get a CRC32-derived one.
pub fn player_color(player: PlayerId) -> PlayerColor {
    if let Some(&(fill, accent)) = PALETTE.get(player.0 as usize) {
        return PlayerColor { fill, accent };
    }
    let fill = hashed_color(&format!("player-{}", player.0));
    let (h, s, l) = rgb_to_hsl(fill.0, fill.1, fill.2);
    PlayerColor {
        fill,
        accent: hsl_to_rgb(h, s, (l - 0.06).max(0.0)),
    }
}

/// Deterministic colour from the first three bytes of a CRC32 hash.
fn hashed_color(key: &str) -> (u8, u8, u8) {
    let bytes = crc32fast::hash(key.as_bytes()).to_be_bytes();
    (bytes[0], bytes[1], bytes[2])
}

pub fn rgba_css((r, g, b): (u8, u8, u8), alpha: f64) -> String {
    format!("rgba({r}, {g}, {b}, {})", alpha.clamp(0.0, 1.0))
}

pub fn hex_css((r, g, b): (u8, u8, u8)) -> String {
    format!("#{r:02X}{g:02X}{b:02X}")
}

/// Scale each channel by `factor`, saturating at 255.
pub fn brighten((r, g, b): (u8, u8, u8), factor: f64) -> (u8, u8, u8) {
    let scale = |c: u8| (c as f64 * factor).clamp(0.0, 255.0) as u8;
    (scale(r), scale(g), scale(b))
}

/// Convert RGB to HSL. Returns (h: 0..360, s: 0..1, l: 0..1).
fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let channel = |t: f64| (hue_to_rgb(p, q, t) * 255.0).round() as u8;
    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
