//! Build the RFC 822 message Gmail expects in `raw`.

use std::path::Path;

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};

const BOUNDARY: &str = "gmail_relay_part_boundary";
const LINE_LENGTH: usize = 76;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    /// The content type is guessed from the file extension.
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename).to_owned();
        Self {
            filename,
            content_type,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    /// Gmail fills in the authenticated address when this is absent.
    pub from: Option<String>,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl OutgoingMail {
    pub fn to_rfc822(&self) -> String {
        let mut out = String::new();
        out.push_str("MIME-Version: 1.0\r\n");
        push_header(&mut out, "To", &self.to);
        if let Some(from) = &self.from {
            push_header(&mut out, "From", from);
        }
        push_header(&mut out, "Subject", &encoded_word(&header_value(&self.subject)));

        match &self.attachment {
            None => {
                push_text_headers(&mut out, &self.body);
                out.push_str(&self.body);
            }
            Some(attachment) => {
                let filename = header_value(&attachment.filename).replace('"', "'");
                out.push_str(&format!(
                    "Content-Type: multipart/mixed; boundary=\"{BOUNDARY}\"\r\n\r\n"
                ));

                out.push_str(&format!("--{BOUNDARY}\r\n"));
                push_text_headers(&mut out, &self.body);
                out.push_str(&self.body);
                out.push_str("\r\n");

                out.push_str(&format!("--{BOUNDARY}\r\n"));
                out.push_str(&format!(
                    "Content-Type: {}; name=\"{filename}\"\r\n",
                    attachment.content_type
                ));
                out.push_str(&format!(
                    "Content-Disposition: attachment; filename=\"{filename}\"\r\n"
                ));
                out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
                let encoded = STANDARD.encode(&attachment.data);
                for line in encoded.as_bytes().chunks(LINE_LENGTH) {
                    // base64 output is ascii
                    out.push_str(std::str::from_utf8(line).unwrap_or_default());
                    out.push_str("\r\n");
                }
                out.push_str(&format!("--{BOUNDARY}--\r\n"));
            }
        }
        out
    }

    /// The message encoded for the `raw` field of `messages.send`.
    pub fn to_raw(&self) -> String {
        URL_SAFE.encode(self.to_rfc822())
    }
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(&header_value(value));
    out.push_str("\r\n");
}

fn push_text_headers(out: &mut String, body: &str) {
    let encoding = if body.is_ascii() { "7bit" } else { "8bit" };
    out.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
    out.push_str(&format!("Content-Transfer-Encoding: {encoding}\r\n\r\n"));
}

/// RFC 2047 form for header text that is not plain ascii.
fn encoded_word(value: &str) -> String {
    if value.is_ascii() {
        value.to_owned()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

/// Line breaks would let a value smuggle in extra headers.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

pub fn guess_content_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("txt") => "text/plain",
        Some("html" | "htm") => "text/html",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}
