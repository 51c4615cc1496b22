use serde_derive::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TCP_PORT: u16 = 28008;
pub const DEFAULT_UDP_PORT: u16 = 28009;

#[derive(Debug, Serialize, Deserialize)]
pub struct Server {
    pub tcp_address: String,
    pub udp_address: String,
    pub max_clients: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Game {
    pub tick_rate: u32,
    pub credentials_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameConfig {
    pub server: Server,
    pub game: Game,
}

impl Default for GameConfig {
    fn default() -> GameConfig {
        GameConfig {
            server: Server {
                tcp_address: format!("0.0.0.0:{}", DEFAULT_TCP_PORT),
                udp_address: format!("0.0.0.0:{}", DEFAULT_UDP_PORT),
                max_clients: 256,
            },
            game: Game { tick_rate: 60, credentials_path: "login.txt".to_string() },
        }
    }
}

impl GameConfig {
    /// Loads a TOML config file, falling back to [`GameConfig::default`] if `path` doesn't exist
    /// so the server can boot with no config on disk at all.
    pub fn load<P: AsRef<Path>>(path: P) -> GameConfig {
        let path = path.as_ref();
        if !path.exists() {
            return GameConfig::default();
        }
        serdeconv::from_toml_file(path).expect("error parsing game configuration file")
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.game.tick_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_positive_tick_rate() {
        let cfg = GameConfig::default();
        assert!(cfg.game.tick_rate > 0);
        assert!(cfg.tick_interval().as_millis() > 0);
    }

    #[test]
    fn loading_a_missing_path_falls_back_to_default() {
        let cfg = GameConfig::load("/nonexistent/path/to/config.toml");
        assert_eq!(cfg.server.max_clients, GameConfig::default().server.max_clients);
    }
}
