//! Small string helpers shared by the HTTP adapters.

/// Longest error body excerpt kept in error messages.
pub const ERROR_BODY_EXCERPT: usize = 200;

/// First `max_chars` characters of `body`, cut on a char boundary.
pub fn excerpt(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_respects_char_boundaries() {
        let body = "é".repeat(300);
        assert_eq!(excerpt(&body, ERROR_BODY_EXCERPT).chars().count(), 200);
        assert_eq!(excerpt("short", 200), "short");
    }
}
