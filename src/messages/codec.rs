//! Newline-delimited JSON codec for the structured channel.
//!
//! The channel rides the worker's piped stdin/stdout pair: each message is
//! one JSON object per line. Serialization details are owned here so the
//! supervisor never touches wire bytes directly.

use serde_json::Value;

use super::message::Message;

/// Encodes a message as a single JSON line (trailing newline included).
pub fn encode(msg: &Message) -> String {
    let mut line = serde_json::to_string(msg).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    line
}

/// Decodes one line into a message.
///
/// Returns `None` for blank lines, invalid JSON, or JSON that is not an
/// object; callers log and skip those.
pub fn decode(line: &str) -> Option<Message> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(msg)) => Some(msg),
        Ok(_) | Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_an_object_line() {
        let mut msg = Message::new();
        msg.insert("status".into(), json!("ready"));
        let line = encode(&msg);
        assert!(line.ends_with('\n'));
        assert_eq!(decode(&line), Some(msg));
    }

    #[test]
    fn rejects_non_objects_and_garbage() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("   "), None);
        assert_eq!(decode("[1,2,3]"), None);
        assert_eq!(decode("not json"), None);
    }
}
