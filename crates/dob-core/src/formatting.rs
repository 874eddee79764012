//! Reply markdown → Telegram HTML.
//!
//! Activation and help texts use two markers only: `**bold**` titles and
//! `` `/command` `` references. Everything else is escaped. A marker without
//! its closing pair is kept as literal text.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Clone, Copy)]
enum Marker {
    Code,
    Bold,
}

impl Marker {
    fn token(self) -> &'static str {
        match self {
            Marker::Code => "`",
            Marker::Bold => "**",
        }
    }
}

/// Convert reply markdown to Telegram-compatible HTML, one line at a time so
/// an unpaired marker never swallows the rest of the message.
pub fn convert_markdown_to_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 32);
    for (i, line) in input.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        convert_line(line, &mut out);
    }
    out
}

fn convert_line(line: &str, out: &mut String) {
    let mut rest = line;
    while let Some((pos, marker)) = next_marker(rest) {
        out.push_str(&escape_html(&rest[..pos]));
        let token = marker.token();
        let body_start = pos + token.len();
        let Some(len) = rest[body_start..].find(token) else {
            out.push_str(&escape_html(&rest[pos..]));
            return;
        };
        let body = &rest[body_start..body_start + len];
        match marker {
            Marker::Code => {
                out.push_str("<code>");
                out.push_str(&escape_html(body));
                out.push_str("</code>");
            }
            Marker::Bold => {
                out.push_str("<b>");
                convert_line(body, out);
                out.push_str("</b>");
            }
        }
        rest = &rest[body_start + len + token.len()..];
    }
    out.push_str(&escape_html(rest));
}

fn next_marker(text: &str) -> Option<(usize, Marker)> {
    let code = text.find('`').map(|p| (p, Marker::Code));
    let bold = text.find("**").map(|p| (p, Marker::Bold));
    match (code, bold) {
        (Some(c), Some(b)) => Some(if c.0 < b.0 { c } else { b }),
        (c, b) => c.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        placeholders::activation_text,
        presenter::Presenter,
        registry::{CommandId, Registry},
    };

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn activation_texts_convert_cleanly() {
        for id in CommandId::ALL {
            let html = convert_markdown_to_html(activation_text(id));
            assert!(!html.contains("**"), "{id}: {html}");
            assert_eq!(html.matches("<b>").count(), 1, "{id}");
            assert_eq!(html.matches("</b>").count(), 1, "{id}");
        }
        let html = convert_markdown_to_html(activation_text(CommandId::EncryptFile));
        assert!(html.starts_with("🔒 <b>Encrypt File Command Activated!</b>\n\n💎 "));
    }

    #[test]
    fn help_text_converts_titles_and_command_references() {
        let presenter = Presenter::new(&Registry::builtin().unwrap());
        let html = convert_markdown_to_html(&presenter.render_help().text);
        assert!(html.starts_with("🌟 <b>Dark Ops Bot - Command Reference</b> 🌟"));
        assert!(html.contains("• <code>/start</code> - Display main menu"));
        assert!(html.contains("• <code>/cancel</code> - Stop the operation"));
        assert!(html.contains("🔒 <b>Encrypt File</b> - Secure file encryption"));
        assert!(!html.contains("**"));
        assert!(!html.contains('`'));
    }

    #[test]
    fn command_references_are_not_emphasised() {
        assert_eq!(
            convert_markdown_to_html("send `/scrape_media_download **x**` <url>"),
            "send <code>/scrape_media_download **x**</code> &lt;url&gt;"
        );
    }

    #[test]
    fn unpaired_markers_stay_literal() {
        assert_eq!(convert_markdown_to_html("a ** b"), "a ** b");
        assert_eq!(convert_markdown_to_html("**open\nclosed**"), "**open\nclosed**");
        assert_eq!(convert_markdown_to_html("it`s & so"), "it`s &amp; so");
        assert_eq!(convert_markdown_to_html("snake_case"), "snake_case");
    }
}
