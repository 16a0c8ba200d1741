//! TwiML responses for the call-setup webhook.

use super::messages::CALL_SID_PARAMETER;

/// Escape a value for use inside an XML attribute.
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `<Connect><Stream>` reply that opens the media stream and passes the call
/// identifier as a custom parameter.
pub fn connect_stream(stream_url: &str, call_sid: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<Response><Connect><Stream url="{url}">"#,
            r#"<Parameter name="{name}" value="{sid}"/>"#,
            r#"</Stream></Connect></Response>"#,
        ),
        url = escape_attribute(stream_url),
        name = CALL_SID_PARAMETER,
        sid = escape_attribute(call_sid),
    )
}
