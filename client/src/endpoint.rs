use reqwest::Url;

use crate::ClientError;

/// Fully resolved channel URLs for one user, one per configured base.
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    primary: String,
    fallbacks: Vec<String>,
}

impl Endpoints {
    pub fn resolve(bases: &[String], user_id: &str) -> Result<Self, ClientError> {
        let mut urls = bases
            .iter()
            .map(|base| channel_url(base, user_id))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();

        let primary = urls.next().ok_or(ClientError::NoEndpoints)?;

        Ok(Self {
            primary,
            fallbacks: urls.collect(),
        })
    }

    /// URL to dial for the given retry count: candidate N, or the primary
    /// when there are fewer candidates than attempts.
    pub fn for_attempt(&self, attempt: u32) -> &str {
        if attempt == 0 {
            return &self.primary;
        }

        self.fallbacks
            .get(attempt as usize - 1)
            .unwrap_or(&self.primary)
    }
}

/// Append the user id to a `ws://` or `wss://` base as one percent-encoded
/// path segment.
pub fn channel_url(base: &str, user_id: &str) -> Result<String, ClientError> {
    let invalid = |reason: &str| ClientError::InvalidEndpoint {
        url: base.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(base).map_err(|e| invalid(&e.to_string()))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(invalid("scheme must be ws or wss"));
    }

    url.path_segments_mut()
        .map_err(|_| invalid("cannot be a base"))?
        .pop_if_empty()
        .push(user_id);

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_is_percent_encoded() {
        let url = channel_url("ws://localhost:8000/api/chat/ws", "alice smith").unwrap();
        assert_eq!(url, "ws://localhost:8000/api/chat/ws/alice%20smith");
    }

    #[test]
    fn test_trailing_slash_and_separator() {
        let url = channel_url("wss://chat.example.com/api/chat/ws/", "team/a").unwrap();
        assert_eq!(url, "wss://chat.example.com/api/chat/ws/team%2Fa");
    }

    #[test]
    fn test_rejects_http_scheme() {
        assert!(matches!(
            channel_url("http://localhost:8000/api/chat/ws", "bob"),
            Err(ClientError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(channel_url("not a url", "bob").is_err());
    }

    #[test]
    fn test_attempt_candidates() {
        let bases = vec![
            "ws://localhost:8000/api/chat/ws".to_string(),
            "ws://127.0.0.1:8000/api/chat/ws".to_string(),
        ];
        let endpoints = Endpoints::resolve(&bases, "u1").unwrap();

        assert_eq!(endpoints.for_attempt(0), "ws://localhost:8000/api/chat/ws/u1");
        assert_eq!(endpoints.for_attempt(1), "ws://127.0.0.1:8000/api/chat/ws/u1");
        assert_eq!(endpoints.for_attempt(2), "ws://localhost:8000/api/chat/ws/u1");
    }

    #[test]
    fn test_no_endpoints() {
        assert!(matches!(
            Endpoints::resolve(&[], "u1"),
            Err(ClientError::NoEndpoints)
        ));
    }
}
