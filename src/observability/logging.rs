//! Token redaction for anything that ends up in logs or errors.

/// Redact a bot token, keeping the public bot id
pub fn redact_token(token: &str) -> String {
    match token.split_once(':') {
        Some((bot_id, _)) if !bot_id.is_empty() => format!("{}:[REDACTED]", bot_id),
        _ => "[REDACTED]".to_string(),
    }
}

/// Redact the `bot<token>` path segment of a Bot API URL
pub fn redact_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut rest = url;

    while let Some(pos) = rest.find("/bot") {
        let (head, tail) = rest.split_at(pos + "/bot".len());
        out.push_str(head);

        let end = tail.find(['/', '?']).unwrap_or(tail.len());
        let segment = &tail[..end];
        if segment.contains(':') {
            out.push_str("[REDACTED]");
        } else {
            out.push_str(segment);
        }
        rest = &tail[end..];
    }

    out.push_str(rest);
    out
}
