use hexdom_shared::{GridLayout, MAX_PLAYERS, Orientation};

pub const SERVER_PORT: u16 = 3000;
pub const SSE_KEEPALIVE_SECS: u64 = 15;
pub const DEFAULT_BROADCAST_BUFFER: usize = 256;
pub const DEFAULT_PLAYER_COUNT: u8 = 6;
pub const MIN_PLAYER_COUNT: u8 = 2;
pub const MAX_BOARD_DIMENSION: u32 = 256;
pub const DEFAULT_STATIC_DIR: &str = "client/dist";

/// How new boards are generated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardConfig {
    pub layout: GridLayout,
    pub players: u8,
    /// Fixed RNG seed; boards are random per process without one.
    pub seed: Option<u64>,
}

impl BoardConfig {
    pub fn from_env() -> Self {
        Self {
            layout: grid_layout(),
            players: player_count(),
            seed: board_seed(),
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            layout: GridLayout::default(),
            players: DEFAULT_PLAYER_COUNT,
            seed: None,
        }
    }
}

pub fn server_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(SERVER_PORT)
}

pub fn sse_broadcast_buffer() -> usize {
    std::env::var("SSE_BROADCAST_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BROADCAST_BUFFER)
}

pub fn static_dir() -> String {
    std::env::var("STATIC_DIR")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
}

pub fn grid_layout() -> GridLayout {
    let defaults = GridLayout::default();
    GridLayout {
        width: board_dimension("BOARD_WIDTH", defaults.width),
        height: board_dimension("BOARD_HEIGHT", defaults.height),
        size: std::env::var("HEX_SIZE")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(defaults.size),
        orientation: std::env::var("HEX_ORIENTATION")
            .ok()
            .and_then(|value| Orientation::parse(&value))
            .unwrap_or(defaults.orientation),
    }
}

fn board_dimension(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| (1..=MAX_BOARD_DIMENSION).contains(value))
        .unwrap_or(default)
}

pub fn player_count() -> u8 {
    std::env::var("PLAYER_COUNT")
        .ok()
        .and_then(|value| value.parse::<u8>().ok())
        .map(|value| value.clamp(MIN_PLAYER_COUNT, MAX_PLAYERS))
        .unwrap_or(DEFAULT_PLAYER_COUNT)
}

pub fn board_seed() -> Option<u64> {
    std::env::var("BOARD_SEED")
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        temp_env::with_vars_unset(
            [
                "PORT",
                "BOARD_WIDTH",
                "BOARD_HEIGHT",
                "HEX_SIZE",
                "HEX_ORIENTATION",
                "PLAYER_COUNT",
                "BOARD_SEED",
                "STATIC_DIR",
            ],
            || {
                assert_eq!(server_port(), SERVER_PORT);
                assert_eq!(BoardConfig::from_env(), BoardConfig::default());
                assert_eq!(static_dir(), DEFAULT_STATIC_DIR);
            },
        );
    }

    #[test]
    fn reads_board_shape() {
        temp_env::with_vars(
            [
                ("BOARD_WIDTH", Some("12")),
                ("BOARD_HEIGHT", Some("7")),
                ("HEX_SIZE", Some("32.5")),
                ("HEX_ORIENTATION", Some("Pointy")),
                ("BOARD_SEED", Some(" 42 ")),
            ],
            || {
                let config = BoardConfig::from_env();
                assert_eq!(config.layout.width, 12);
                assert_eq!(config.layout.height, 7);
                assert_eq!(config.layout.size, 32.5);
                assert_eq!(config.layout.orientation, Orientation::Pointy);
                assert_eq!(config.seed, Some(42));
            },
        );
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        temp_env::with_vars(
            [
                ("PORT", Some("0")),
                ("BOARD_WIDTH", Some("0")),
                ("BOARD_HEIGHT", Some("100000")),
                ("HEX_SIZE", Some("-3")),
                ("HEX_ORIENTATION", Some("diagonal")),
                ("SSE_BROADCAST_BUFFER", Some("lots")),
                ("STATIC_DIR", Some("   ")),
            ],
            || {
                assert_eq!(server_port(), SERVER_PORT);
                assert_eq!(grid_layout(), GridLayout::default());
                assert_eq!(sse_broadcast_buffer(), DEFAULT_BROADCAST_BUFFER);
                assert_eq!(static_dir(), DEFAULT_STATIC_DIR);
            },
        );
    }

    #[test]
    fn player_count_is_clamped() {
        temp_env::with_var("PLAYER_COUNT", Some("1"), || {
            assert_eq!(player_count(), MIN_PLAYER_COUNT);
        });
        temp_env::with_var("PLAYER_COUNT", Some("200"), || {
            assert_eq!(player_count(), MAX_PLAYERS);
        });
        temp_env::with_var("PLAYER_COUNT", Some("4"), || {
            assert_eq!(player_count(), 4);
        });
    }
}
