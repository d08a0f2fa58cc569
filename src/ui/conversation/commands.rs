use std::str::FromStr;

use crate::prompts::EXAMPLE_PROMPTS;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Put a popular example question into the draft
    Example,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub keyword: &'static str,
    pub description: &'static str,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// 1-based example number given to `/example`
    pub fn example_number(&self) -> Option<usize> {
        if self.command != SlashCommand::Example {
            return None;
        }

        self.argument()?.trim().parse().ok()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Example => "put example <n> into the input, or list the examples",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let body = input.trim_start().strip_prefix('/')?;

    let mut parts = body.split_whitespace();
    let head = parts.next()?;
    let rest: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "bye" | "exit" => Some(SlashCommand::Quit),
            "h" | "?" => Some(SlashCommand::Help),
            "e" | "ex" | "examples" => Some(SlashCommand::Example),
            _ => None,
        })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }

    help.push_str("\nAliases: /q, /bye, /exit for /quit; /e, /examples for /example");
    help.push_str("\nEnter sends, Shift+Enter adds a new line, PageUp/PageDown scroll, Ctrl+C quits.");

    help
}

/// Numbered list of the example questions
pub fn get_examples_text() -> String {
    let mut text = String::from("Popular examples (use /example <n>):\n\n");
    for (index, prompt) in EXAMPLE_PROMPTS.iter().enumerate() {
        text.push_str(&format!("  {}. {}\n", index + 1, prompt));
    }
    text
}
