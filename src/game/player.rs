use super::board::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Red,
    Yellow,
}

impl Player {
    /// Get the other player
    pub fn other(self) -> Player {
        match self {
            Player::Red => Player::Yellow,
            Player::Yellow => Player::Red,
        }
    }

    /// Convert player to cell type
    pub fn to_cell(self) -> Cell {
        Cell::Filled(self)
    }

    /// Get player name for display
    pub fn name(self) -> &'static str {
        match self {
            Player::Red => "Red",
            Player::Yellow => "Yellow",
        }
    }

    /// Token stored in the game document for this player's pieces.
    pub fn token(self) -> &'static str {
        match self {
            Player::Red => "🔴",
            Player::Yellow => "🟡",
        }
    }

    /// Parse a document token. Accepts the stored emoji as well as the
    /// player name in any case.
    pub fn from_token(token: &str) -> Option<Player> {
        match token.trim() {
            "🔴" => Some(Player::Red),
            "🟡" => Some(Player::Yellow),
            other if other.eq_ignore_ascii_case("red") => Some(Player::Red),
            other if other.eq_ignore_ascii_case("yellow") => Some(Player::Yellow),
            _ => None,
        }
    }
}
