//! Negotiation sessions against a remote peer

use tokio::time::sleep;

use super::{CapabilitySource, RetryPolicy};
use crate::capabilities::{negotiation, Capability, CapabilitySet};
use crate::{Error, Result};

/// One client's negotiation state against one remote peer.
///
/// Holds the local (client) capability description, optional user
/// preferences, and the server description once fetched through the
/// [`CapabilitySource`]. Fetching retries transport failures according to
/// the session's [`RetryPolicy`]; everything downstream of the fetch is
/// pure computation.
///
/// Negotiated results are computed fresh on every call — the session keeps
/// no "last negotiated" state, so a preference change simply takes effect
/// on the next query.
pub struct NegotiationSession<S> {
    source: S,
    retry: RetryPolicy,
    client: CapabilitySet,
    preferences: Option<CapabilitySet>,
    server: Option<CapabilitySet>,
}

impl<S: CapabilitySource> NegotiationSession<S> {
    /// Create a session over `source` with the local party's capability
    /// description. The description must be a non-preference set.
    pub fn new(source: S, client: CapabilitySet) -> Result<Self> {
        if client.is_preference() {
            return Err(Error::NonPreferenceRequired(
                "client capabilities must describe supported configurations".to_string(),
            ));
        }
        Ok(Self {
            source,
            retry: RetryPolicy::default(),
            client,
            preferences: None,
            server: None,
        })
    }

    /// Replace the default retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set or clear the user preferences consulted by subsequent
    /// negotiation queries. A non-preference set is a contract error.
    pub fn set_preferences(&mut self, preferences: Option<CapabilitySet>) -> Result<()> {
        if let Some(preferences) = &preferences {
            if !preferences.is_preference() {
                return Err(Error::PreferenceRequired(
                    "negotiation preferences must be a preference set".to_string(),
                ));
            }
        }
        self.preferences = preferences;
        Ok(())
    }

    /// The current user preferences, if any.
    pub fn preferences(&self) -> Option<&CapabilitySet> {
        self.preferences.as_ref()
    }

    /// The local party's capability description.
    pub fn client_capabilities(&self) -> &CapabilitySet {
        &self.client
    }

    /// The remote peer's capability description, fetched through the
    /// source on first use and kept for the session's lifetime.
    pub async fn server_capabilities(&mut self) -> Result<&CapabilitySet> {
        let server = match self.server.take() {
            Some(existing) => existing,
            None => self.fetch_with_retries().await?,
        };
        Ok(self.server.insert(server))
    }

    /// Negotiate the full capability surface: server against client, then
    /// against the session preferences when set.
    ///
    /// `Ok(None)` means the parties have no mutually acceptable
    /// configuration. That outcome is terminal for the current inputs —
    /// it is never retried.
    pub async fn negotiated_values(&mut self) -> Result<Option<CapabilitySet>> {
        let server = match self.server.take() {
            Some(existing) => existing,
            None => self.fetch_with_retries().await?,
        };
        let server = self.server.insert(server);
        negotiation::negotiate(self.preferences.as_ref(), server, &self.client)
    }

    /// Negotiate a single category, with the engine's first-found search
    /// semantics.
    pub async fn negotiated_value(&mut self, category: &str) -> Result<Option<Capability>> {
        let server = match self.server.take() {
            Some(existing) => existing,
            None => self.fetch_with_retries().await?,
        };
        let server = self.server.insert(server);
        negotiation::negotiate_category(self.preferences.as_ref(), server, &self.client, category)
    }

    async fn fetch_with_retries(&self) -> Result<CapabilitySet> {
        let mut attempt = 0;
        loop {
            match self.source.fetch().await {
                Ok(server) => {
                    if server.is_preference() {
                        return Err(Error::NonPreferenceRequired(
                            "the capability source delivered a preference set".to_string(),
                        ));
                    }
                    return Ok(server);
                }
                // Only transport failures are worth another attempt.
                Err(error @ Error::Transport(_)) => match self.retry.delay_for_attempt(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            "capability fetch failed, retrying in {:?}: {}",
                            delay,
                            error
                        );
                        sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        tracing::debug!(attempts = attempt + 1, "capability fetch gave up");
                        return Err(error);
                    }
                },
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::capabilities::{Negotiable, NumericRange, ValueClass};

    struct FlakySource {
        failures_left: AtomicUsize,
        fetches: AtomicUsize,
        payload: CapabilitySet,
    }

    impl FlakySource {
        fn new(failures: usize, payload: CapabilitySet) -> Self {
            Self {
                failures_left: AtomicUsize::new(failures),
                fetches: AtomicUsize::new(0),
                payload,
            }
        }
    }

    #[async_trait]
    impl CapabilitySource for FlakySource {
        async fn fetch(&self) -> Result<CapabilitySet> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(Error::Transport("connection refused".to_string()));
            }
            Ok(self.payload.clone())
        }
    }

    fn jpeg_set(is_preference: bool, lo: i64, hi: i64) -> CapabilitySet {
        let builder = if is_preference {
            Capability::preference("format", "jpeg")
        } else {
            Capability::non_preference("format", "jpeg")
        };
        let cap = builder
            .param("quality", ValueClass::Integer)
            .value(
                "quality",
                Negotiable::range(NumericRange::integers(lo, hi).unwrap()),
            )
            .build()
            .unwrap();
        let mut set = CapabilitySet::new(is_preference);
        set.add(cap).unwrap();
        set
    }

    fn fast_retry(attempts: usize) -> RetryPolicy {
        RetryPolicy::fixed(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_session_rejects_preference_client() {
        let source = FlakySource::new(0, jpeg_set(false, 0, 100));
        let result = NegotiationSession::new(source, jpeg_set(true, 0, 100));
        assert!(matches!(result, Err(Error::NonPreferenceRequired(_))));
    }

    #[tokio::test]
    async fn test_transport_failures_are_retried() {
        let source = FlakySource::new(2, jpeg_set(false, 0, 100));
        let mut session = NegotiationSession::new(source, jpeg_set(false, 50, 100))
            .unwrap()
            .with_retry_policy(fast_retry(3));

        let result = session.negotiated_values().await.unwrap().unwrap();
        let agreed = result.negotiated_value("format").unwrap();
        assert_eq!(
            agreed.value_of("quality"),
            Some(&Negotiable::range(NumericRange::integers(50, 100).unwrap()))
        );
        assert_eq!(session.source.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_transport_error() {
        let source = FlakySource::new(5, jpeg_set(false, 0, 100));
        let mut session = NegotiationSession::new(source, jpeg_set(false, 50, 100))
            .unwrap()
            .with_retry_policy(fast_retry(2));

        let result = session.negotiated_values().await;
        assert!(matches!(result, Err(Error::Transport(_))));
        // Initial attempt plus two retries.
        assert_eq!(session.source.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_negotiation_is_terminal_not_retried() {
        let source = FlakySource::new(0, jpeg_set(false, 0, 10));
        let mut session = NegotiationSession::new(source, jpeg_set(false, 50, 100))
            .unwrap()
            .with_retry_policy(fast_retry(3));

        assert!(session.negotiated_values().await.unwrap().is_none());
        assert!(session.negotiated_values().await.unwrap().is_none());
        // The description is fetched once; the failed agreement never
        // triggers another fetch.
        assert_eq!(session.source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_preference_change_applies_to_next_query() {
        let source = FlakySource::new(0, jpeg_set(false, 0, 100));
        let mut session =
            NegotiationSession::new(source, jpeg_set(false, 50, 100)).unwrap();

        let agreed = session.negotiated_value("format").await.unwrap().unwrap();
        assert_eq!(
            agreed.value_of("quality"),
            Some(&Negotiable::range(NumericRange::integers(50, 100).unwrap()))
        );

        session.set_preferences(Some(jpeg_set(true, 0, 80))).unwrap();
        let agreed = session.negotiated_value("format").await.unwrap().unwrap();
        assert_eq!(
            agreed.value_of("quality"),
            Some(&Negotiable::range(NumericRange::integers(50, 80).unwrap()))
        );
    }

    #[tokio::test]
    async fn test_set_preferences_rejects_non_preference() {
        let source = FlakySource::new(0, jpeg_set(false, 0, 100));
        let mut session =
            NegotiationSession::new(source, jpeg_set(false, 50, 100)).unwrap();
        let result = session.set_preferences(Some(jpeg_set(false, 0, 80)));
        assert!(matches!(result, Err(Error::PreferenceRequired(_))));
    }
}
