use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type ParticipantId = String;

/// Seat color. Seat one always moves first in a freshly created game.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Color {
    /// First seat, wire value `1`
    One,
    /// Second seat, wire value `2`
    Two,
}

impl Color {
    pub fn other(self) -> Self {
        match self {
            Color::One => Color::Two,
            Color::Two => Color::One,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Color::One => 1,
            Color::Two => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Color::One),
            2 => Some(Color::Two),
            _ => None,
        }
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u8::deserialize(deserializer)?;
        Color::from_u8(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid seat color: {raw}")))
    }
}

/// One of the two seats of a game.
///
/// Only gameplay state lives here; the connection a participant is reached
/// through is owned by whoever hosts the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    id: ParticipantId,
    name: String,
    color: Color,
    automated: bool,
    connected: bool,
    game_id: String,
}

impl Participant {
    /// A human seat, connected at creation.
    pub fn human(id: impl Into<ParticipantId>, name: impl Into<String>, color: Color) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
            automated: false,
            connected: true,
            game_id: String::new(),
        }
    }

    /// An automated seat. It never disconnects.
    pub fn automated(id: impl Into<ParticipantId>, name: impl Into<String>, color: Color) -> Self {
        Self {
            automated: true,
            ..Self::human(id, name, color)
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn color(&self) -> Color {
        self.color
    }
    pub fn is_automated(&self) -> bool {
        self.automated
    }
    pub fn is_connected(&self) -> bool {
        self.connected
    }
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub(crate) fn seat(&mut self, game_id: &str, color: Color) {
        self.game_id = game_id.to_string();
        self.color = color;
    }
}
