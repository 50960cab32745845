use crate::error::AuthError;

const BEARER_PREFIX: &str = "bearer ";

pub(crate) trait CaseInsensitiveStrExt {
    fn strip_prefix_ignore_ascii_case<'a>(&'a self, prefix: &str) -> Option<&'a str>;
}

impl CaseInsensitiveStrExt for str {
    fn strip_prefix_ignore_ascii_case<'a>(&'a self, prefix: &str) -> Option<&'a str> {
        // `get` returns None for short input or a split inside a multi-byte char
        let head = self.get(..prefix.len())?;

        if head.eq_ignore_ascii_case(prefix) {
            self.get(prefix.len()..)
        } else {
            None
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub(crate) fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let token = header
        .strip_prefix_ignore_ascii_case(BEARER_PREFIX)
        .ok_or(AuthError::MalformedHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_in_any_case() {
        assert_eq!(bearer_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token("bearer abc").unwrap(), "abc");
        assert_eq!(bearer_token("BEARER   abc  ").unwrap(), "abc");
    }

    #[test]
    fn short_headers_are_rejected_without_panicking() {
        for header in ["", "B", "Bear", "Bearer", "Bearer "] {
            assert!(
                matches!(bearer_token(header), Err(AuthError::MalformedHeader)),
                "{header:?} should be malformed"
            );
        }
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(bearer_token("Basic YWRtaW46YWRtaW4xMjM=").is_err());
        assert!(bearer_token("Token abc").is_err());
        assert!(bearer_token("abc.def.ghi").is_err());
    }

    #[test]
    fn multibyte_input_at_the_prefix_boundary_is_rejected() {
        // 'é' straddles byte 7, so a naive slice would panic
        assert!(bearer_token("Bearerétoken").is_err());
        assert!(bearer_token("ééééé").is_err());
    }
}
