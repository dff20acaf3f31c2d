use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::game::{GameRules, Player, COLS, DEFAULT_WIN_SCORE_BASE, ROWS};

/// Largest board edge accepted from configuration.
pub const MAX_BOARD_EDGE: usize = 32;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub board: BoardConfig,
    pub game: GameConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            rows: ROWS,
            cols: COLS,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub starting_player: Player,
    /// A win scores `win_score_base - moves`.
    pub win_score_base: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            starting_player: Player::Red,
            win_score_base: DEFAULT_WIN_SCORE_BASE,
        }
    }
}

/// How the controller treats document writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    /// Queue the write and return at once; failures are only logged.
    #[default]
    BestEffort,
    /// Wait for the write; a failure fails the operation.
    MustSucceed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub mode: PersistenceMode,
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
    pub document_key: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            mode: PersistenceMode::BestEffort,
            backend: StoreBackend::File,
            data_dir: PathBuf::from("data"),
            document_key: "games/partidaActual".to_string(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: PathBuf::from("connect-four.log"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, or `None` if the file does not
    /// exist. Callers pick the defaults and report the miss once logging is up.
    pub fn load_if_present(path: &Path) -> Result<Option<Self>, ConfigError> {
        if path.exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board.rows == 0 || self.board.rows > MAX_BOARD_EDGE {
            return Err(ConfigError::Validation(format!(
                "board.rows must be in 1..={MAX_BOARD_EDGE}"
            )));
        }
        if self.board.cols == 0 || self.board.cols > MAX_BOARD_EDGE {
            return Err(ConfigError::Validation(format!(
                "board.cols must be in 1..={MAX_BOARD_EDGE}"
            )));
        }
        if self.persistence.document_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "persistence.document_key must not be empty".into(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation(
                "logging.level must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Game rules derived from the board and game sections.
    pub fn rules(&self) -> GameRules {
        GameRules {
            rows: self.board.rows,
            cols: self.board.cols,
            starting_player: self.game.starting_player,
            win_score_base: self.game.win_score_base,
        }
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}
