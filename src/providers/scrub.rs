use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Markers after which a secret token follows. Prefix-style keys (`sk-`)
/// are replaced together with the prefix.
const SECRET_MARKERS: [&str; 16] = [
    "sk-",
    "sk_",
    "ghp_",
    "hf_",
    "gsk_",
    "AIza",
    "Authorization: Bearer ",
    "authorization: bearer ",
    "\"authorization\":\"Bearer ",
    "api_key=",
    "access_token=",
    "refresh_token=",
    "\"api_key\":\"",
    "\"access_token\":\"",
    "\"refresh_token\":\"",
    "\"token\":\"",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

/// Redact every `marker<token>` occurrence. Bare markers are left alone.
fn redact_marker(text: &mut String, marker: &str) {
    let mut cursor = 0;
    while let Some(found) = text[cursor..].find(marker) {
        let start = cursor + found;
        let token_start = start + marker.len();
        let token_len: usize = text[token_start..]
            .chars()
            .take_while(|c| is_secret_char(*c))
            .map(char::len_utf8)
            .sum();

        if token_len == 0 {
            cursor = token_start;
            continue;
        }

        text.replace_range(start..token_start + token_len, REDACTED);
        cursor = start + REDACTED.len();
    }
}

/// Scrub API keys and bearer tokens from provider error text.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    if !SECRET_MARKERS.iter().any(|m| input.contains(m)) {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in SECRET_MARKERS {
        redact_marker(&mut scrubbed, marker);
    }
    Cow::Owned(scrubbed)
}

/// Scrub secrets and cap length, for errors that reach logs or users.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);
    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }
    let truncated: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
    format!("{truncated}...")
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    anyhow::anyhow!("{provider} API error ({status}): {}", sanitize_api_error(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_is_borrowed() {
        let input = "rate limit exceeded";
        assert!(matches!(scrub_secret_patterns(input), Cow::Borrowed(_)));
    }

    #[test]
    fn redacts_prefixed_keys() {
        let out = scrub_secret_patterns("invalid key sk-abc123XYZ provided");
        assert_eq!(out, "invalid key [REDACTED] provided");
    }

    #[test]
    fn redacts_query_and_json_markers() {
        let out = scrub_secret_patterns(r#"api_key=raw-secret {"access_token":"eyJhbG"}"#);
        assert!(!out.contains("raw-secret"));
        assert!(!out.contains("eyJhbG"));
        assert_eq!(out.matches(REDACTED).count(), 2);
    }

    #[test]
    fn bare_marker_is_untouched() {
        assert_eq!(scrub_secret_patterns("api_key= missing"), "api_key= missing");
    }

    #[test]
    fn sanitize_truncates_long_bodies() {
        let long = "x".repeat(500);
        let out = sanitize_api_error(&long);
        assert_eq!(out.chars().count(), MAX_API_ERROR_CHARS + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn sanitize_handles_multibyte_text() {
        let long = "é".repeat(300);
        let out = sanitize_api_error(&long);
        assert!(out.ends_with("..."));
    }
}
