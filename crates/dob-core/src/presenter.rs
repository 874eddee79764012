//! Session/keyboard presenter.
//!
//! Pure rendering: the only state is the menu layout and help text, both
//! derived once from the registry.

use crate::{
    domain::AttachmentRef,
    executor::{ExecutionResult, Outcome, CAPACITY_MESSAGE},
    registry::Registry,
};

const BUTTONS_PER_ROW: usize = 4;
const MENU_PLACEHOLDER: &str = "💎 Choose a command...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Markdown,
}

/// Rendering hints for the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkupHint {
    pub format: TextFormat,
    /// Attach the command keyboard to this message.
    pub show_menu: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub attachment: Option<AttachmentRef>,
    pub markup: MarkupHint,
}

impl OutboundMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
            markup: MarkupHint {
                format: TextFormat::Plain,
                show_menu: false,
            },
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            markup: MarkupHint {
                format: TextFormat::Markdown,
                show_menu: false,
            },
            ..Self::plain(text)
        }
    }

    pub fn with_menu(mut self) -> Self {
        self.markup.show_menu = true;
        self
    }
}

/// Persistent reply keyboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuLayout {
    pub rows: Vec<Vec<String>>,
    pub resize: bool,
    /// Keep the keyboard visible after a button press.
    pub persistent: bool,
    pub placeholder: String,
}

pub struct Presenter {
    layout: MenuLayout,
    help: String,
}

impl Presenter {
    pub fn new(registry: &Registry) -> Self {
        let rows = registry
            .specs()
            .chunks(BUTTONS_PER_ROW)
            .map(|row| row.iter().map(|s| s.trigger.to_string()).collect())
            .collect();

        let mut help = String::from(
            "🌟 **Dark Ops Bot - Command Reference** 🌟\n\n\
             **Available Commands:**\n\
             • `/start` - Display main menu with custom keyboard\n\
             • `/help` - Show this help message\n\
             • `/cancel` - Stop the operation that is running\n\n\
             **Keyboard Functions:**\n",
        );
        for spec in registry.specs() {
            let line = match spec.description.split_once(" - ") {
                Some((title, what)) => format!("{} **{title}** - {what}\n", spec.trigger),
                None => format!("{} {}\n", spec.trigger, spec.description),
            };
            help.push_str(&line);
        }
        help.push_str("\n💎 All features are currently in development!");

        Self {
            layout: MenuLayout {
                rows,
                resize: true,
                persistent: true,
                placeholder: MENU_PLACEHOLDER.to_string(),
            },
            help,
        }
    }

    pub fn render_menu(&self) -> &MenuLayout {
        &self.layout
    }

    pub fn render_result(&self, result: &ExecutionResult) -> OutboundMessage {
        match result.outcome {
            Outcome::Ok => OutboundMessage {
                attachment: result.attachment.clone(),
                ..OutboundMessage::markdown(result.message.clone())
            },
            _ if result.is_busy() => OutboundMessage::plain(
                "⏳ An operation is already in progress.\n\
                 Wait for it to finish or send /cancel.",
            ),
            Outcome::UserError if result.message == CAPACITY_MESSAGE => OutboundMessage::plain(
                "🚦 The bot is busy right now. Please try again in a moment.",
            ),
            Outcome::UserError | Outcome::InternalError | Outcome::Timeout => {
                OutboundMessage::plain(result.message.clone())
            }
        }
    }

    pub fn render_welcome(&self, first_name: Option<&str>) -> OutboundMessage {
        let name = first_name.unwrap_or("there");
        OutboundMessage::plain(format!(
            "🌟 Welcome to the Dark Ops Bot, {name}! 🌟\n\n\
             💎 Your premium file operations center is ready!\n\
             🔹 Choose from 8 specialized commands below:\n\n\
             🔒 File Security: Encrypt/Decrypt files\n\
             📤 Telegram Ops: Upload/Download via Telegram\n\
             ☁️ Cloud Storage: Manage cloud files\n\
             🌐 Media Tools: Web scraping & social downloads\n\n\
             ✨ Select any button to get started!"
        ))
        .with_menu()
    }

    pub fn render_help(&self) -> OutboundMessage {
        OutboundMessage::markdown(self.help.clone())
    }

    pub fn render_fallback(&self) -> OutboundMessage {
        OutboundMessage::plain(
            "🤖 I didn't understand that command.\n\
             💎 Please use the keyboard buttons below or send /start to see all options!",
        )
        .with_menu()
    }

    pub fn render_cancel(&self, cancelled: bool) -> OutboundMessage {
        if cancelled {
            OutboundMessage::plain("🛑 Cancelling the running operation...")
        } else {
            OutboundMessage::plain("Nothing to cancel.")
        }
    }

    /// Reply for faults caught outside the executor.
    pub fn render_internal_fault(&self) -> OutboundMessage {
        OutboundMessage::plain(ExecutionResult::internal_error().message)
    }
}
