//! Derives a stable viewer session id from client address + user-agent prefix,
//! so reconnects from the same client land on the same session without
//! requiring a cookie or token.

use sha2::{Digest, Sha256};

const USER_AGENT_PREFIX_LEN: usize = 32;

pub fn derive_session_id(client_addr: &str, user_agent: Option<&str>) -> String {
    let ua_prefix: String = user_agent
        .unwrap_or("")
        .chars()
        .take(USER_AGENT_PREFIX_LEN)
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(client_addr.as_bytes());
    hasher.update(b"|");
    hasher.update(ua_prefix.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_is_stable() {
        let a = derive_session_id("10.0.0.1:443", Some("curl/8.0"));
        let b = derive_session_id("10.0.0.1:443", Some("curl/8.0"));
        assert_eq!(a, b);
    }

    #[test]
    fn different_clients_differ() {
        let a = derive_session_id("10.0.0.1:443", Some("curl/8.0"));
        let b = derive_session_id("10.0.0.2:443", Some("curl/8.0"));
        assert_ne!(a, b);
    }

    #[test]
    fn missing_user_agent_is_handled() {
        let id = derive_session_id("10.0.0.1:443", None);
        assert_eq!(id.len(), 64);
    }
}
