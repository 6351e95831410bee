//! Minimal MIME text for SendMail
//!
//! Only the plain-text single part form the suites send is produced and
//! understood here.

use chrono::Utc;

/// Build an RFC 5322 message with a plain-text body
pub fn create_mime(from: &str, to: &str, subject: &str, body: &str) -> String {
    format!(
        "From: {from}\r\n\
         To: {to}\r\n\
         Subject: {subject}\r\n\
         Date: {date}\r\n\
         Content-Type: text/plain; charset=\"us-ascii\"\r\n\
         Content-Transfer-Encoding: 7bit\r\n\
         MIME-Version: 1.0\r\n\
         \r\n\
         {body}",
        date = Utc::now().to_rfc2822(),
    )
}

/// Headers and body of a parsed message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeMessage {
    pub from: Option<String>,
    pub to: Vec<String>,
    pub subject: Option<String>,
    pub body: String,
}

impl MimeMessage {
    /// Parse header fields up to the first blank line; the rest is the body
    pub fn parse(text: &str) -> Self {
        let mut message = Self::default();
        let (headers, body) = match text.find("\r\n\r\n") {
            Some(idx) => (&text[..idx], &text[idx + 4..]),
            None => match text.find("\n\n") {
                Some(idx) => (&text[..idx], &text[idx + 2..]),
                None => (text, ""),
            },
        };
        message.body = body.to_string();

        for line in headers.lines() {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "from" => message.from = Some(value.to_string()),
                "subject" => message.subject = Some(value.to_string()),
                "to" => message.to.extend(
                    value
                        .split([',', ';'])
                        .map(str::trim)
                        .filter(|addr| !addr.is_empty())
                        .map(str::to_string),
                ),
                _ => {}
            }
        }
        message
    }
}
