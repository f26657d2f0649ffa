// Content-based routing: decides which delivery channel a message belongs to.
// Pattern groups are checked in order (email, whatsapp, sms) and the first
// group with any hit wins. Nothing matching falls back to SMS.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::messaging::message::MessageType;

const EMAIL_PATTERNS: &[&str] = &[
    r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}",
    r"subject:.*|subject .*|re:.*",
    r"dear.*|hi.*|hello.*",
    r"find attached|please find|attached|report",
];

const WHATSAPP_PATTERNS: &[&str] = &[
    r"whatsapp:.*|wa:.*",
    r"sent via whatsapp",
    r"message me on.*",
    r"chat.*with.*",
];

const SMS_PATTERNS: &[&str] = &[
    r"^\+\d{10,}",
    r"SMS:.*|txt:.*",
    r"^\d{6}$",
    r"text.*to.*",
];

static RULES: Lazy<Vec<(MessageType, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (MessageType::Email, compile(EMAIL_PATTERNS)),
        (MessageType::Whatsapp, compile(WHATSAPP_PATTERNS)),
        (MessageType::Sms, compile(SMS_PATTERNS)),
    ]
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        // ! Patterns are constants; a failure here is a programming error
        .map(|p| Regex::new(&format!("(?i){p}")).expect("invalid classifier pattern"))
        .collect()
}

/// Picks the message type for a piece of content
pub fn classify(content: &str) -> MessageType {
    let content: String = content.to_lowercase();

    RULES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(&content)))
        .map(|(message_type, _)| *message_type)
        .unwrap_or(MessageType::Sms)
}
