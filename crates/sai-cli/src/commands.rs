//! Slash commands accepted at the main prompt.

/// What a line typed at the main prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Nothing to do.
    Blank,
    /// A recognised command.
    Command(Command),
    /// A `/word` that is not a command.
    Unknown(String),
    /// Text to send to the model.
    Chat(String),
}

/// Commands, matched against the whole trimmed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Change the Ollama URL, then pick a model.
    Setup,
    /// Pick a model.
    Model,
    /// Pick a role.
    Roles,
    /// Create a custom role.
    RoleAdd,
    /// Delete a custom role.
    RoleDelete,
    /// Show the command table.
    Help,
    /// Leave sai.
    Quit,
}

impl Command {
    /// All commands in help order.
    pub const ALL: [Self; 7] = [
        Self::Setup,
        Self::Model,
        Self::Roles,
        Self::RoleAdd,
        Self::RoleDelete,
        Self::Help,
        Self::Quit,
    ];

    /// The text that invokes the command.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Setup => "/setup",
            Self::Model => "/model",
            Self::Roles => "/roles",
            Self::RoleAdd => "/role add",
            Self::RoleDelete => "/role delete",
            Self::Help => "/help",
            Self::Quit => "/quit",
        }
    }

    /// One-line description for `/help`.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Setup => "Settings and preferences",
            Self::Model => "List and select a model",
            Self::Roles => "List and select a role",
            Self::RoleAdd => "Add a new custom role",
            Self::RoleDelete => "Delete a custom role",
            Self::Help => "Show this help message",
            Self::Quit => "Exit the application",
        }
    }
}

/// Classify a line typed at the main prompt.
pub fn parse(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Blank;
    }
    if let Some(command) = Command::ALL.into_iter().find(|c| c.name() == line) {
        return Input::Command(command);
    }
    if line.starts_with('/') {
        return Input::Unknown(line.to_string());
    }
    Input::Chat(line.to_string())
}
