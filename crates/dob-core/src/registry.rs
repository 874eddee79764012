//! Operation registry: the static command table and trigger lookup.
//!
//! The registry is filled once at startup and shared read-only afterwards
//! (`Arc<Registry>`), so lookups need no locking.

use std::{fmt, sync::Arc};

use crate::{errors::Error, operation::Operation, placeholders, Result};

/// What a command expects to receive alongside the trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    None,
    File,
    Url,
    Text,
}

/// The fixed set of gateway commands, in menu order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    EncryptFile,
    DecryptFile,
    TelegramUpload,
    TelegramDownload,
    CloudUpload,
    CloudDownload,
    ScrapeMediaDownload,
    SocialDownload,
}

impl CommandId {
    pub const ALL: [CommandId; 8] = [
        CommandId::EncryptFile,
        CommandId::DecryptFile,
        CommandId::TelegramUpload,
        CommandId::TelegramDownload,
        CommandId::CloudUpload,
        CommandId::CloudDownload,
        CommandId::ScrapeMediaDownload,
        CommandId::SocialDownload,
    ];

    /// Slash-command identifier (without the leading `/`).
    pub fn as_str(self) -> &'static str {
        match self {
            CommandId::EncryptFile => "encrypt_file",
            CommandId::DecryptFile => "decrypt_file",
            CommandId::TelegramUpload => "telegram_upload",
            CommandId::TelegramDownload => "telegram_download",
            CommandId::CloudUpload => "cloud_upload",
            CommandId::CloudDownload => "cloud_download",
            CommandId::ScrapeMediaDownload => "scrape_media_download",
            CommandId::SocialDownload => "social_download",
        }
    }

    /// Keyboard button text that selects the command.
    pub fn trigger(self) -> &'static str {
        match self {
            CommandId::EncryptFile => "🔒",
            CommandId::DecryptFile => "🔓",
            CommandId::TelegramUpload => "📤",
            CommandId::TelegramDownload => "📥",
            CommandId::CloudUpload => "⛅",
            CommandId::CloudDownload => "☁",
            CommandId::ScrapeMediaDownload => "🌐",
            CommandId::SocialDownload => "📱",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CommandId::EncryptFile => "Encrypt File - Secure file encryption",
            CommandId::DecryptFile => "Decrypt File - File decryption service",
            CommandId::TelegramUpload => "Upload to Telegram - Direct Telegram uploads",
            CommandId::TelegramDownload => "Download from Telegram - Telegram file downloads",
            CommandId::CloudUpload => "Upload to Cloud - Multi-cloud upload service",
            CommandId::CloudDownload => "Download from Cloud - Cloud file downloads",
            CommandId::ScrapeMediaDownload => "Scrape Web - Web media extraction",
            CommandId::SocialDownload => "Download from Socials - Social media downloads",
        }
    }

    pub fn input_kind(self) -> InputKind {
        match self {
            CommandId::EncryptFile
            | CommandId::DecryptFile
            | CommandId::TelegramUpload
            | CommandId::CloudUpload => InputKind::File,
            CommandId::TelegramDownload
            | CommandId::CloudDownload
            | CommandId::ScrapeMediaDownload
            | CommandId::SocialDownload => InputKind::Url,
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == identifier)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered command. Immutable once it is in the registry.
#[derive(Clone)]
pub struct CommandSpec {
    pub id: CommandId,
    pub identifier: &'static str,
    pub trigger: &'static str,
    pub description: &'static str,
    pub input_kind: InputKind,
    pub handler: Arc<dyn Operation>,
}

impl CommandSpec {
    /// Spec for a built-in command, bound to its placeholder operation.
    pub fn builtin(id: CommandId) -> Self {
        Self {
            id,
            identifier: id.as_str(),
            trigger: id.trigger(),
            description: id.description(),
            input_kind: id.input_kind(),
            handler: placeholders::for_command(id),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn Operation>) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_trigger(mut self, trigger: &'static str) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_identifier(mut self, identifier: &'static str) -> Self {
        self.identifier = identifier;
        self
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("trigger", &self.trigger)
            .field("input_kind", &self.input_kind)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct Registry {
    specs: Vec<CommandSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The eight built-in commands, in menu order.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        for id in CommandId::ALL {
            registry.register(CommandSpec::builtin(id))?;
        }
        Ok(registry)
    }

    /// Bind a command. Fails without touching the registry if its trigger or
    /// identifier is already taken.
    pub fn register(&mut self, spec: CommandSpec) -> Result<()> {
        if let Some(existing) = self
            .specs
            .iter()
            .find(|s| s.trigger == spec.trigger || s.identifier == spec.identifier)
        {
            let taken = if existing.trigger == spec.trigger {
                spec.trigger
            } else {
                spec.identifier
            };
            return Err(Error::DuplicateCommand(taken.to_string()));
        }
        self.specs.push(spec);
        Ok(())
    }

    /// Exact, case-sensitive lookup by trigger token.
    pub fn resolve(&self, trigger: &str) -> Option<&CommandSpec> {
        self.specs.iter().find(|s| s.trigger == trigger)
    }

    /// Exact, case-sensitive lookup by slash-command identifier.
    pub fn resolve_identifier(&self, identifier: &str) -> Option<&CommandSpec> {
        self.specs.iter().find(|s| s.identifier == identifier)
    }

    /// Registered commands in registration order.
    pub fn specs(&self) -> &[CommandSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
