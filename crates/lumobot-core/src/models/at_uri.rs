use std::fmt;
use std::str::FromStr;

/// Parsed `at://<authority>/<collection>/<rkey>` record identifier.
///
/// `authority` is the repository that owns the record (a DID or a handle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtUri {
    pub authority: String,
    pub collection: String,
    pub rkey: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AtUriError {
    #[error("missing at:// scheme: {0}")]
    MissingScheme(String),
    #[error("expected authority/collection/rkey: {0}")]
    WrongShape(String),
}

impl AtUri {
    pub fn parse(uri: &str) -> Result<Self, AtUriError> {
        let rest = uri
            .strip_prefix("at://")
            .ok_or_else(|| AtUriError::MissingScheme(uri.to_string()))?;

        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            [authority, collection, rkey]
                if !authority.is_empty() && !collection.is_empty() && !rkey.is_empty() =>
            {
                Ok(Self {
                    authority: authority.to_string(),
                    collection: collection.to_string(),
                    rkey: rkey.to_string(),
                })
            }
            _ => Err(AtUriError::WrongShape(uri.to_string())),
        }
    }

    /// True if the record lives in the given repository
    pub fn is_owned_by(&self, did: &str) -> bool {
        self.authority == did
    }
}

impl FromStr for AtUri {
    type Err = AtUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at://{}/{}/{}", self.authority, self.collection, self.rkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_uri() {
        let uri = AtUri::parse("at://did:plc:abc123/app.bsky.feed.post/3kq2xyz").unwrap();
        assert_eq!(uri.authority, "did:plc:abc123");
        assert_eq!(uri.collection, "app.bsky.feed.post");
        assert_eq!(uri.rkey, "3kq2xyz");
        assert_eq!(uri.to_string(), "at://did:plc:abc123/app.bsky.feed.post/3kq2xyz");
    }

    #[test]
    fn test_rejects_missing_scheme() {
        assert!(matches!(
            AtUri::parse("https://bsky.app/profile/x/post/y"),
            Err(AtUriError::MissingScheme(_))
        ));
    }

    #[test]
    fn test_rejects_short_and_long_paths() {
        assert!(matches!(
            AtUri::parse("at://did:plc:abc123/app.bsky.feed.post"),
            Err(AtUriError::WrongShape(_))
        ));
        assert!(matches!(
            AtUri::parse("at://did:plc:abc123/app.bsky.feed.post/a/b"),
            Err(AtUriError::WrongShape(_))
        ));
        assert!(AtUri::parse("at://did:plc:abc123//rkey").is_err());
    }

    #[test]
    fn test_is_owned_by() {
        let uri: AtUri = "at://did:plc:bot/app.bsky.feed.post/1".parse().unwrap();
        assert!(uri.is_owned_by("did:plc:bot"));
        assert!(!uri.is_owned_by("did:plc:someone"));
    }
}
