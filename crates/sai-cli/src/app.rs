//! The interactive session.
//!
//! `App` owns everything a session needs: settings, role presets, the
//! conversation and the response session that streams replies into the
//! terminal. Command failures are printed and the loop carries on; only a
//! broken terminal ends it.

use std::future::Future;
use std::io::{self, Stdout};

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use rustyline::error::ReadlineError;
use tracing::{debug, info, warn};

use sai_client::{ChatError, OllamaClient, ResponseSession};
use sai_core::{Conversation, ModelName};
use sai_store::{RoleCatalog, RoleStore, Settings, SettingsStore, TomlRoleStore, HTTP_TIMEOUT};

use crate::assets::{self, PROMPT, WELCOME};
use crate::commands::{self, Command, Input};
use crate::prompt::{Prompter, ReadOutcome};
use crate::ui::{print_line, print_markdown, terminal_size, LivePanel};

type Session = ResponseSession<OllamaClient, LivePanel<Stdout>>;

/// Shown when text is typed before a model is chosen.
const NO_MODEL: &str = "No model selected. Use /model to pick one.";

/// Resolve when the user presses Ctrl-C.
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // Without a handler there is nothing to wait for.
        warn!(error = %err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Run `task` unless Ctrl-C is pressed first.
async fn cancellable<F: Future>(task: F) -> Option<F::Output> {
    tokio::select! {
        output = task => Some(output),
        () = ctrl_c() => None,
    }
}

// =============================================================================
// Session state
// =============================================================================

/// A conversation holding only the system prompt of `role`.
fn fresh_conversation<S: RoleStore>(roles: &RoleCatalog<S>, role: &str) -> Conversation {
    Conversation::with_system_prompt(&roles.get_or_default(role).prompt)
}

/// Replace an unknown role in `settings` with the default one.
fn ensure_known_role<S: RoleStore>(settings: &mut Settings, roles: &RoleCatalog<S>) {
    if roles.get(&settings.role).is_none() {
        warn!(role = %settings.role, "unknown role, using the default");
        settings.role.clone_from(&roles.default_role().name);
    }
}

/// Make `role` active; the returned conversation replaces the current one.
fn switch_role<S: RoleStore>(
    settings: &mut Settings,
    roles: &RoleCatalog<S>,
    role: &str,
) -> Conversation {
    settings.role = role.to_string();
    ensure_known_role(settings, roles);
    fresh_conversation(roles, &settings.role)
}

/// After `removed` was deleted, fall back to the default role if it was the
/// active one. Returns the conversation to start in that case.
fn role_deleted<S: RoleStore>(
    settings: &mut Settings,
    roles: &RoleCatalog<S>,
    removed: &str,
) -> Option<Conversation> {
    if settings.role != removed {
        return None;
    }
    let default = roles.default_role().name.clone();
    Some(switch_role(settings, roles, &default))
}

/// The model a chat turn goes to, or the message refusing the turn.
fn chat_model(settings: &Settings) -> Result<&ModelName, &'static str> {
    settings.model.as_ref().ok_or(NO_MODEL)
}

/// Application state.
pub struct App {
    settings_store: SettingsStore,
    settings: Settings,
    roles: RoleCatalog<TomlRoleStore>,
    session: Session,
    conversation: Conversation,
    prompter: Prompter,
    should_quit: bool,
}

impl App {
    /// Build the session from stored settings and roles.
    pub fn new(
        settings_store: SettingsStore,
        roles: RoleCatalog<TomlRoleStore>,
        prompter: Prompter,
    ) -> anyhow::Result<Self> {
        let mut settings = settings_store.load()?;
        ensure_known_role(&mut settings, &roles);
        let client = OllamaClient::new(&settings.base_url, HTTP_TIMEOUT)?;
        let conversation = fresh_conversation(&roles, &settings.role);

        Ok(Self {
            settings_store,
            settings,
            roles,
            session: ResponseSession::new(client, LivePanel::stdout()),
            conversation,
            prompter,
            should_quit: false,
        })
    }

    /// Run until `/quit` or end of input.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.markdown(WELCOME);
        self.show_settings();
        if self.settings.model.is_none() {
            self.select_model().await?;
        }

        while !self.should_quit {
            match self.prompter.read_line(PROMPT)? {
                ReadOutcome::Line(line) => self.handle_line(&line).await?,
                ReadOutcome::Interrupted => {}
                ReadOutcome::Eof => break,
            }
        }

        self.notice("Bye!");
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Result<(), ReadlineError> {
        match commands::parse(line) {
            Input::Blank => {}
            Input::Command(command) => self.run_command(command).await?,
            Input::Unknown(word) => {
                self.warning(&format!("Unknown command {word}. Type /help to see the commands."));
            }
            Input::Chat(text) => self.chat(&text).await,
        }
        Ok(())
    }

    async fn run_command(&mut self, command: Command) -> Result<(), ReadlineError> {
        debug!(command = command.name(), "running command");
        match command {
            Command::Setup => self.setup().await?,
            Command::Model => self.select_model().await?,
            Command::Roles => self.select_role()?,
            Command::RoleAdd => self.add_role()?,
            Command::RoleDelete => self.delete_role()?,
            Command::Help => self.markdown(&assets::help()),
            Command::Quit => self.should_quit = true,
        }
        Ok(())
    }

    // =========================================================================
    // Chat
    // =========================================================================

    async fn chat(&mut self, text: &str) {
        let model = match chat_model(&self.settings) {
            Ok(model) => model.clone(),
            Err(refusal) => {
                self.warning(refusal);
                return;
            }
        };

        let reply = self
            .session
            .chat_with_cancel(&mut self.conversation, &model, text, ctrl_c())
            .await;
        debug!(
            recorded = reply.is_some(),
            history = self.conversation.len(),
            "turn finished"
        );
    }

    // =========================================================================
    // Settings
    // =========================================================================

    async fn setup(&mut self) -> Result<(), ReadlineError> {
        let question = format!("Ollama URL [{}]", self.settings.base_url);
        let Some(answer) = self.prompter.text(&question)? else {
            self.notice("Setup cancelled.");
            return Ok(());
        };

        if !answer.is_empty() && answer != self.settings.base_url {
            match OllamaClient::new(&answer, HTTP_TIMEOUT) {
                Ok(client) => {
                    self.settings.base_url = client.base_url().to_string();
                    self.session.set_transport(client);
                    self.save_settings();
                }
                Err(err) => {
                    self.chat_error(&err);
                    return Ok(());
                }
            }
        }

        self.select_model().await
    }

    async fn select_model(&mut self) -> Result<(), ReadlineError> {
        let Some(listed) = cancellable(self.session.transport().list_models()).await else {
            self.notice("cancelled");
            return Ok(());
        };
        let models = match listed {
            Ok(models) => models,
            Err(err) => {
                self.chat_error(&err);
                return Ok(());
            }
        };
        if models.is_empty() {
            self.warning("No models installed. Pull one with `ollama pull <model>`.");
            return Ok(());
        }

        let current = self.settings.model.as_ref().map(ModelName::as_str);
        let Some(index) = self.prompter.select("Models", &models, current)? else {
            self.notice("Model selection cancelled.");
            return Ok(());
        };
        let model = match ModelName::new(models[index].as_str()) {
            Ok(model) => model,
            Err(err) => {
                self.warning(&err.to_string());
                return Ok(());
            }
        };

        self.settings.model = Some(model.clone());
        self.save_settings();
        self.notice(&format!("Loading {model}…"));
        match cancellable(self.session.transport().preload_model(&model)).await {
            Some(Ok(true)) => self.success(&format!("{model} is ready.")),
            Some(Ok(false)) => self.notice(&format!("{model} is still loading.")),
            Some(Err(err)) => self.chat_error(&err),
            None => self.notice("cancelled"),
        }
        Ok(())
    }

    fn save_settings(&self) {
        if let Err(err) = self.settings_store.save(&self.settings) {
            warn!(error = %err, "failed to save settings");
            self.warning(&format!("Settings were not saved: {err}"));
        }
    }

    fn show_settings(&self) {
        self.markdown(&assets::current_settings(
            &self.settings.base_url,
            self.settings.model.as_ref(),
            &self.settings.role,
        ));
    }

    // =========================================================================
    // Roles
    // =========================================================================

    fn select_role(&mut self) -> Result<(), ReadlineError> {
        let names = self.roles.names();
        let Some(index) = self
            .prompter
            .select("Roles", &names, Some(&self.settings.role))?
        else {
            self.notice("Role selection cancelled.");
            return Ok(());
        };

        self.conversation = switch_role(&mut self.settings, &self.roles, &names[index]);
        info!(role = %self.settings.role, "new conversation");
        self.save_settings();
        self.success(&format!(
            "Role set to {}. Started a new conversation.",
            self.settings.role
        ));
        Ok(())
    }

    fn add_role(&mut self) -> Result<(), ReadlineError> {
        let Some(name) = self.prompter.text("Role name")?.filter(|s| !s.is_empty()) else {
            self.notice("Role not added.");
            return Ok(());
        };
        let Some(prompt) = self.prompter.text("System prompt")?.filter(|s| !s.is_empty()) else {
            self.notice("Role not added.");
            return Ok(());
        };

        match self.roles.add(&name, &prompt).map(|role| role.name.clone()) {
            Ok(added) => self.success(&format!("Role '{added}' added. Select it with /roles.")),
            Err(err) => self.warning(&err.to_string()),
        }
        Ok(())
    }

    fn delete_role(&mut self) -> Result<(), ReadlineError> {
        let names: Vec<String> = self.roles.custom().iter().map(|r| r.name.clone()).collect();
        if names.is_empty() {
            self.notice("There are no custom roles to delete.");
            return Ok(());
        }
        let Some(index) = self
            .prompter
            .select("Custom roles", &names, Some(&self.settings.role))?
        else {
            self.notice("Nothing deleted.");
            return Ok(());
        };

        let removed = match self.roles.delete(&names[index]) {
            Ok(removed) => removed,
            Err(err) => {
                self.warning(&err.to_string());
                return Ok(());
            }
        };
        self.success(&format!("Role '{}' deleted.", removed.name));

        if let Some(conversation) = role_deleted(&mut self.settings, &self.roles, &removed.name) {
            self.conversation = conversation;
            info!(role = %self.settings.role, "new conversation");
            self.save_settings();
            self.notice(&format!(
                "Switched to {} and started a new conversation.",
                self.settings.role
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Output
    // =========================================================================

    fn write(result: io::Result<()>) {
        if let Err(err) = result {
            warn!(error = %err, "failed to write to the terminal");
        }
    }

    fn markdown(&self, text: &str) {
        Self::write(print_markdown(&mut io::stdout(), text, terminal_size().0));
    }

    fn styled(&self, text: &str, style: Style) {
        let line = Line::from(Span::styled(text.to_string(), style));
        Self::write(print_line(&mut io::stdout(), line, terminal_size().0));
    }

    fn notice(&self, text: &str) {
        self.styled(text, Style::default().fg(Color::DarkGray));
    }

    fn success(&self, text: &str) {
        self.styled(text, Style::default().fg(Color::Green));
    }

    fn warning(&self, text: &str) {
        self.styled(text, Style::default().fg(Color::Yellow));
    }

    fn chat_error(&self, err: &ChatError) {
        warn!(kind = err.kind().as_str(), error = %err, "request failed");
        self.styled(
            &format!("✗ {err}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        );
        self.notice(err.remediation());
    }
}
