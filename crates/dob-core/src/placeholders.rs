//! Placeholder operations for the built-in commands.
//!
//! None of the providers (encryption, cloud storage, scraping) exist yet, so
//! each command validates its input and replies with a "coming soon" notice.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    operation::{Operation, OperationContext, OperationError, Reply},
    registry::CommandId,
};

pub struct Placeholder {
    text: &'static str,
}

impl Placeholder {
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }
}

#[async_trait]
impl Operation for Placeholder {
    async fn run(&self, ctx: OperationContext) -> Result<Reply, OperationError> {
        ctx.validate_input()?;
        ctx.checkpoint()?;
        Ok(Reply::text(self.text))
    }
}

pub fn for_command(id: CommandId) -> Arc<dyn Operation> {
    Arc::new(Placeholder::new(activation_text(id)))
}

pub fn activation_text(id: CommandId) -> &'static str {
    match id {
        CommandId::EncryptFile => {
            "🔒 **Encrypt File Command Activated!**\n\n\
             💎 File encryption service is ready!\n\
             🔹 Send me a file to encrypt with AES-256 encryption\n\
             🔹 Your files will be secured with military-grade encryption\n\n\
             ⚡ Feature coming soon! Stay tuned for secure file operations."
        }
        CommandId::DecryptFile => {
            "🔓 **Decrypt File Command Activated!**\n\n\
             💎 File decryption service is ready!\n\
             🔹 Send me an encrypted file to decrypt\n\
             🔹 Supports all major encryption formats\n\n\
             ⚡ Feature coming soon! Your secure vault awaits."
        }
        CommandId::TelegramUpload => {
            "⬆️ **Telegram Upload Command Activated!**\n\n\
             💎 Direct Telegram upload service is ready!\n\
             🔹 Upload files directly to Telegram servers\n\
             🔹 Supports all file types up to 2GB\n\n\
             ⚡ Feature coming soon! Lightning-fast uploads await."
        }
        CommandId::TelegramDownload => {
            "⬇️ **Telegram Download Command Activated!**\n\n\
             💎 Telegram download service is ready!\n\
             🔹 Download files from Telegram channels/chats\n\
             🔹 Batch download capabilities available\n\n\
             ⚡ Feature coming soon! Mass download power incoming."
        }
        CommandId::CloudUpload => {
            "☁️⬆️ **Cloud Upload Command Activated!**\n\n\
             💎 Multi-cloud upload service is ready!\n\
             🔹 Upload to Google Drive, Dropbox, OneDrive\n\
             🔹 Automatic backup and sync capabilities\n\n\
             ⚡ Feature coming soon! Your cloud empire awaits."
        }
        CommandId::CloudDownload => {
            "☁️⬇️ **Cloud Download Command Activated!**\n\n\
             💎 Multi-cloud download service is ready!\n\
             🔹 Download from all major cloud providers\n\
             🔹 Smart file organization and management\n\n\
             ⚡ Feature coming soon! Cloud mastery unlocked."
        }
        CommandId::ScrapeMediaDownload => {
            "🌐⬇️ **Web Scrape Command Activated!**\n\n\
             💎 Advanced web scraping service is ready!\n\
             🔹 Extract media from any website\n\
             🔹 Smart content detection and filtering\n\n\
             ⚡ Feature coming soon! Web harvesting powers loading."
        }
        CommandId::SocialDownload => {
            "📱⬇️ **Social Download Command Activated!**\n\n\
             💎 Social media download service is ready!\n\
             🔹 Download from Instagram, TikTok, YouTube, Twitter\n\
             🔹 High-quality media extraction guaranteed\n\n\
             ⚡ Feature coming soon! Social media domination incoming."
        }
    }
}
