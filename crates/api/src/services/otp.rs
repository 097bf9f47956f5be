use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// One-time code verification failure.
///
/// `Expired` and `TooManyAttempts` both discard the stored code, so the
/// caller has to restart the login flow. `InvalidCode` burns one attempt
/// and leaves the code in place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("No code issued for this identity")]
    NotFound,

    #[error("Code has expired")]
    Expired,

    #[error("Too many incorrect attempts")]
    TooManyAttempts,

    #[error("Incorrect code")]
    InvalidCode,
}

/// A pending code as held by the store.
#[derive(Debug, Clone)]
pub struct OtpEntry {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
}

/// Storage for pending one-time codes, keyed by normalized email.
///
/// Injected into [`OtpService`] so a single-instance deployment can run on
/// the in-memory table while a multi-instance one plugs in a shared cache.
/// `take` removes the entry; the service puts it back when an attempt
/// should survive.
pub trait OtpStore: Send + Sync {
    /// Store an entry, replacing any pending one for the same identity.
    fn put(&self, identity: &str, entry: OtpEntry);

    /// Remove and return the pending entry for `identity`.
    fn take(&self, identity: &str) -> Option<OtpEntry>;

    /// Remove entries whose expiry has passed. Returns the number removed.
    fn sweep_expired(&self, now: DateTime<Utc>) -> usize;
}

/// In-memory [`OtpStore`] for single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryOtpStore {
    entries: RwLock<HashMap<String, OtpEntry>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OtpStore for InMemoryOtpStore {
    fn put(&self, identity: &str, entry: OtpEntry) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(identity.to_string(), entry);
    }

    fn take(&self, identity: &str) -> Option<OtpEntry> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(identity)
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

/// Issues and checks six-digit emailed login codes for one identity domain.
#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    expiry_secs: i64,
    max_attempts: u32,
}

impl OtpService {
    pub fn new(store: Arc<dyn OtpStore>, expiry_secs: i64, max_attempts: u32) -> Self {
        Self {
            store,
            expiry_secs,
            max_attempts,
        }
    }

    /// Generate a fresh code for `email`, replacing any pending one.
    /// The email must already be normalized (trimmed, lowercased).
    pub fn issue(&self, email: &str) -> String {
        let code = generate_code();
        self.store.put(
            email,
            OtpEntry {
                code: code.clone(),
                expires_at: Utc::now() + Duration::seconds(self.expiry_secs),
                attempts: 0,
            },
        );
        code
    }

    /// Check `code` against the pending entry for `email`.
    ///
    /// On success the entry is consumed. Expired and exhausted entries are
    /// removed so a stale code can never be retried into validity.
    pub fn verify(&self, email: &str, code: &str) -> Result<(), OtpError> {
        let mut entry = self.store.take(email).ok_or(OtpError::NotFound)?;

        if entry.expires_at <= Utc::now() {
            return Err(OtpError::Expired);
        }

        if entry.attempts >= self.max_attempts {
            return Err(OtpError::TooManyAttempts);
        }

        if entry.code != code {
            entry.attempts += 1;
            self.store.put(email, entry);
            return Err(OtpError::InvalidCode);
        }

        Ok(())
    }
}

/// Six digits, zero-padded. "004217" is a valid code.
fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(expiry_secs: i64, max_attempts: u32) -> OtpService {
        OtpService::new(Arc::new(InMemoryOtpStore::new()), expiry_secs, max_attempts)
    }

    #[test]
    fn test_generate_code_format() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let svc = service(600, 5);
        let code = svc.issue("pastor@example.com");
        assert_eq!(svc.verify("pastor@example.com", &code), Ok(()));
    }

    #[test]
    fn test_verify_consumes_code() {
        let svc = service(600, 5);
        let code = svc.issue("pastor@example.com");
        svc.verify("pastor@example.com", &code).unwrap();
        assert_eq!(
            svc.verify("pastor@example.com", &code),
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn test_verify_unknown_identity() {
        let svc = service(600, 5);
        assert_eq!(
            svc.verify("nobody@example.com", "123456"),
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn test_wrong_code_burns_attempt_but_keeps_entry() {
        let svc = service(600, 5);
        let code = svc.issue("pastor@example.com");
        assert_eq!(
            svc.verify("pastor@example.com", "000000"),
            Err(OtpError::InvalidCode)
        );
        // Correct code still works after a miss
        assert_eq!(svc.verify("pastor@example.com", &code), Ok(()));
    }

    #[test]
    fn test_attempt_ceiling_discards_entry() {
        let svc = service(600, 2);
        let code = svc.issue("pastor@example.com");
        assert_eq!(
            svc.verify("pastor@example.com", "000000"),
            Err(OtpError::InvalidCode)
        );
        assert_eq!(
            svc.verify("pastor@example.com", "111111"),
            Err(OtpError::InvalidCode)
        );
        // Ceiling reached, entry discarded even with the right code
        assert_eq!(
            svc.verify("pastor@example.com", &code),
            Err(OtpError::TooManyAttempts)
        );
        assert_eq!(
            svc.verify("pastor@example.com", &code),
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn test_expired_code_discarded() {
        let svc = service(-1, 5);
        let code = svc.issue("pastor@example.com");
        assert_eq!(
            svc.verify("pastor@example.com", &code),
            Err(OtpError::Expired)
        );
        assert_eq!(
            svc.verify("pastor@example.com", &code),
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn test_reissue_replaces_pending_code() {
        let svc = service(600, 5);
        let first = svc.issue("pastor@example.com");
        let second = svc.issue("pastor@example.com");
        if first != second {
            assert_eq!(
                svc.verify("pastor@example.com", &first),
                Err(OtpError::InvalidCode)
            );
        }
        assert_eq!(svc.verify("pastor@example.com", &second), Ok(()));
    }

    #[test]
    fn test_sweep_expired() {
        let store = Arc::new(InMemoryOtpStore::new());
        let live = OtpService::new(store.clone(), 600, 5);
        let dead = OtpService::new(store.clone(), -1, 5);
        live.issue("live@example.com");
        dead.issue("dead@example.com");
        assert_eq!(store.len(), 2);
        assert_eq!(store.sweep_expired(Utc::now()), 1);
        assert_eq!(store.len(), 1);
    }
}
