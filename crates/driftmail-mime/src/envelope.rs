//! Structured view of one parsed RFC 5322 message.

use chrono::{DateTime, Utc};
use mailparse::{MailAddr, MailHeaderMap, ParsedMail};

use crate::error::Result;

/// A sender or recipient identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// Bare email address.
    pub address: String,
    /// Display name; empty when the header carries none.
    pub name: String,
}

/// A content blob referenced from the HTML body by its content id,
/// normally fetched out-of-band (e.g. an embedded image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineResource {
    /// Content id without angle brackets, as referenced by `cid:` URLs.
    pub content_id: String,
    /// Transfer-decoded content bytes.
    pub content: Vec<u8>,
}

/// The structured, renderable form of one message.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// First plain-text body found in the MIME tree.
    pub text: String,
    /// First HTML body found in the MIME tree.
    pub html: String,
    /// Sender identity from the From header.
    pub sender: Address,
    /// Recipient addresses from the To header.
    pub recipients: Vec<String>,
    /// Subject line; empty when absent.
    pub subject: String,
    /// The message's declared Date; decode time when absent or unparsable.
    pub date: DateTime<Utc>,
    /// Inline resources collected from the MIME tree.
    pub inlines: Vec<InlineResource>,
}

impl Envelope {
    /// Decodes one raw RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a well-formed message.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let parsed = mailparse::parse_mail(raw)?;

        let subject = parsed
            .headers
            .get_first_value("Subject")
            .unwrap_or_default();
        let sender = parsed
            .headers
            .get_first_value("From")
            .map(|value| parse_single_address(&value))
            .unwrap_or_default();
        let recipients = parsed
            .headers
            .get_first_value("To")
            .map(|value| parse_address_list(&value))
            .unwrap_or_default();
        let date = parsed
            .headers
            .get_first_value("Date")
            .and_then(|value| mailparse::dateparse(&value).ok())
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .unwrap_or_else(Utc::now);

        let mut envelope = Self {
            text: String::new(),
            html: String::new(),
            sender,
            recipients,
            subject,
            date,
            inlines: Vec::new(),
        };
        collect_parts(&parsed, &mut envelope);
        Ok(envelope)
    }
}

/// Walks the MIME tree, filling the first text and HTML bodies and
/// collecting inline resources.
fn collect_parts(part: &ParsedMail<'_>, envelope: &mut Envelope) {
    if part.subparts.is_empty() {
        if let Some(content_id) = content_id(part) {
            let content = part.get_body_raw().unwrap_or_default();
            envelope.inlines.push(InlineResource {
                content_id,
                content,
            });
            return;
        }
        match part.ctype.mimetype.as_str() {
            "text/html" => {
                if envelope.html.is_empty() {
                    envelope.html = part.get_body().unwrap_or_default();
                }
            }
            "text/plain" => {
                if envelope.text.is_empty() {
                    envelope.text = part.get_body().unwrap_or_default();
                }
            }
            // Attachments and other leaves are out of scope here.
            _ => {}
        }
    } else {
        for sub in &part.subparts {
            collect_parts(sub, envelope);
        }
    }
}

/// The part's content id with angle brackets stripped, if any.
fn content_id(part: &ParsedMail<'_>) -> Option<String> {
    let value = part.headers.get_first_value("Content-ID")?;
    let id = value
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string();
    if id.is_empty() { None } else { Some(id) }
}

/// First single address in a header value, tolerating malformed input.
fn parse_single_address(value: &str) -> Address {
    let Ok(list) = mailparse::addrparse(value) else {
        return Address::default();
    };
    list.iter()
        .find_map(|addr| match addr {
            MailAddr::Single(info) => Some(Address {
                address: info.addr.clone(),
                name: info.display_name.clone().unwrap_or_default(),
            }),
            MailAddr::Group(_) => None,
        })
        .unwrap_or_default()
}

/// All addresses in a header value, flattening groups.
fn parse_address_list(value: &str) -> Vec<String> {
    let Ok(list) = mailparse::addrparse(value) else {
        return Vec::new();
    };
    list.iter()
        .flat_map(|addr| match addr {
            MailAddr::Single(info) => vec![info.addr.clone()],
            MailAddr::Group(group) => group.addrs.iter().map(|info| info.addr.clone()).collect(),
        })
        .collect()
}
