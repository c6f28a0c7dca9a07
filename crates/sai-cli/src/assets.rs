//! Fixed text shown by the REPL.

use sai_core::ModelName;

use crate::commands::Command;

/// Shown once at startup.
pub const WELCOME: &str = "# Welcome to Sai\n\nChat with your local LLM models.";

/// Prompt shown before user input.
pub const PROMPT: &str = "› ";

/// Markdown list of commands.
pub fn help() -> String {
    let mut text = String::from("**Commands**\n\n");
    for command in Command::ALL {
        text.push_str(&format!("- `{}` {}\n", command.name(), command.description()));
    }
    text
}

/// Markdown summary of the current settings.
pub fn current_settings(base_url: &str, model: Option<&ModelName>, role: &str) -> String {
    let model = model.map_or_else(|| "not selected".to_string(), ToString::to_string);
    format!(
        "**Current settings**\n\n- Ollama URL: `{base_url}`\n- Model: **{model}**\n- Role: *{role}*\n\nType `/help` to see the commands."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_every_command() {
        let help = help();
        for command in Command::ALL {
            assert!(help.contains(command.name()));
            assert!(help.contains(command.description()));
        }
    }

    #[test]
    fn settings_show_missing_model() {
        let text = current_settings("http://localhost:11434", None, "Virtual Assistant");
        assert!(text.contains("`http://localhost:11434`"));
        assert!(text.contains("**not selected**"));
        assert!(text.contains("*Virtual Assistant*"));
    }
}
