/// etcd error code for a missing key
pub const KEY_NOT_FOUND_CODE: u64 = 100;

const KEY_NOT_FOUND_MESSAGE: &str = "Key not found";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no store endpoints configured")]
    NoEndpoints,

    #[error("invalid store endpoint {0}")]
    InvalidEndpoint(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("transport error talking to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("etcd error {code} on {key}: {message}")]
    Etcd {
        code: u64,
        message: String,
        key: String,
    },

    #[error("unexpected status {status} from {endpoint}")]
    Status {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    #[error("malformed response for {key}: {reason}")]
    Malformed { key: String, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True when the failure happened before the store could answer
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Transport { .. } | StoreError::Unavailable(_) | StoreError::NoEndpoints
        )
    }
}

/// Classify a store error as "the key does not exist".
///
/// Matches etcd's error code first and falls back to its message text for
/// proxies that rewrite the code.
pub fn is_key_not_found(err: &StoreError) -> bool {
    match err {
        StoreError::Etcd { code, message, .. } => {
            *code == KEY_NOT_FOUND_CODE || message.contains(KEY_NOT_FOUND_MESSAGE)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn etcd_error(code: u64, message: &str) -> StoreError {
        StoreError::Etcd {
            code,
            message: message.to_string(),
            key: "/missing".to_string(),
        }
    }

    #[test]
    fn test_key_not_found_by_code() {
        assert!(is_key_not_found(&etcd_error(100, "whatever")));
    }

    #[test]
    fn test_key_not_found_by_message() {
        assert!(is_key_not_found(&etcd_error(0, "Key not found")));
    }

    #[test]
    fn test_other_errors_are_not_key_not_found() {
        assert!(!is_key_not_found(&etcd_error(300, "Raft Internal Error")));
        assert!(!is_key_not_found(&StoreError::Unavailable("Key not found".to_string())));
        assert!(!is_key_not_found(&StoreError::Malformed {
            key: "/a".to_string(),
            reason: "no node".to_string(),
        }));
    }

    #[test]
    fn test_is_transport() {
        assert!(StoreError::NoEndpoints.is_transport());
        assert!(StoreError::Unavailable("down".to_string()).is_transport());
        assert!(!etcd_error(100, "Key not found").is_transport());
    }
}
