//! Telegram adapter (teloxide).
//!
//! Implements the `dob-core` `MessagingPort` over the Telegram Bot API and
//! feeds decoded updates into the gateway.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InputFile, KeyboardButton, KeyboardMarkup, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use dob_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    formatting::convert_markdown_to_html,
    messaging::port::MessagingPort,
    presenter::{MenuLayout, OutboundMessage, TextFormat},
    Result,
};

const MAX_MESSAGE_LEN: usize = 4096;
const MAX_CAPTION_LEN: usize = 1024;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    keyboard: KeyboardMarkup,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, menu: &MenuLayout) -> Self {
        Self {
            bot,
            keyboard: reply_keyboard(menu),
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

fn reply_keyboard(menu: &MenuLayout) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = menu
        .rows
        .iter()
        .map(|row| row.iter().map(KeyboardButton::new).collect())
        .collect();
    KeyboardMarkup::new(rows)
        .resize_keyboard(menu.resize)
        .one_time_keyboard(!menu.persistent)
        .input_field_placeholder(menu.placeholder.clone())
}

/// Render the text for Telegram: HTML for markdown hints, raw otherwise.
fn render_text(msg: &OutboundMessage, max_len: usize) -> (String, Option<ParseMode>) {
    match msg.markup.format {
        TextFormat::Markdown => {
            let html = convert_markdown_to_html(&msg.text);
            if html.chars().count() <= max_len {
                return (html, Some(ParseMode::Html));
            }
            // Cutting HTML could leave a tag open; fall back to raw text.
            (truncate_chars(&msg.text, max_len), None)
        }
        TextFormat::Plain => (truncate_chars(&msg.text, max_len), None),
    }
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_len.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send(&self, chat_id: ChatId, msg: &OutboundMessage) -> Result<MessageRef> {
        let chat = Self::tg_chat(chat_id);
        let show_menu = msg.markup.show_menu;

        let sent = match &msg.attachment {
            Some(file) => {
                let (caption, parse_mode) = render_text(msg, MAX_CAPTION_LEN);
                self.with_retry(|| {
                    let mut req = self
                        .bot
                        .send_document(chat, InputFile::file_id(file.file_id.clone()))
                        .caption(caption.clone());
                    if let Some(mode) = parse_mode.clone() {
                        req = req.parse_mode(mode);
                    }
                    if show_menu {
                        req = req.reply_markup(self.keyboard.clone());
                    }
                    req
                })
                .await?
            }
            None => {
                let (text, parse_mode) = render_text(msg, MAX_MESSAGE_LEN);
                self.with_retry(|| {
                    let mut req = self.bot.send_message(chat, text.clone());
                    if let Some(mode) = parse_mode.clone() {
                        req = req.parse_mode(mode);
                    }
                    if show_menu {
                        req = req.reply_markup(self.keyboard.clone());
                    }
                    req
                })
                .await?
            }
        };

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(sent.id.0),
        })
    }
}
