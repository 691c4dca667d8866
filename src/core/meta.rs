//! Meta-commands handled by the front-end itself

/// A command recognized before anything is sent to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    /// Open the documentation
    Help,
    /// Reset the output to the banner
    Clear,
    /// List the meta-commands
    Commands,
}

impl MetaCommand {
    /// Every meta-command, in listing order
    pub const ALL: [MetaCommand; 3] = [MetaCommand::Help, MetaCommand::Clear, MetaCommand::Commands];

    /// Exact match against trimmed input
    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "?help" => Some(Self::Help),
            "?clear" => Some(Self::Clear),
            "?commands" => Some(Self::Commands),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "?help",
            Self::Clear => "?clear",
            Self::Commands => "?commands",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Help => "Open the documentation",
            Self::Clear => "Clear the terminal output",
            Self::Commands => "List available meta commands",
        }
    }

    /// Lines rendered by `?commands`, ending with a blank line
    pub fn listing() -> Vec<String> {
        let mut lines = vec!["Available meta commands:".to_string()];
        lines.extend(
            Self::ALL
                .iter()
                .map(|cmd| format!("{} - {}", cmd.name(), cmd.description())),
        );
        lines.push(String::new());
        lines
    }
}
