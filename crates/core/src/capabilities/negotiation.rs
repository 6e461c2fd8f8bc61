//! Three-way negotiation orchestration
//!
//! Combines the three capability surfaces of a remote-imaging session —
//! what the server supports, what the client supports, and what the user
//! prefers — into one agreed configuration. Server and client sets must be
//! non-preferences and the preference set, when present, must be a
//! preference; violating that is a caller defect reported as an error,
//! never a negotiation failure.

use super::capability::Capability;
use super::set::CapabilitySet;
use crate::{Error, Result};

/// Negotiate full capability sets: server against client, then the
/// intermediate result against the user preferences when present.
///
/// Returns `Ok(None)` when the sets have nothing mutually acceptable —
/// an expected outcome the caller must handle, typically by falling back
/// to a default configuration.
pub fn negotiate(
    preferences: Option<&CapabilitySet>,
    server: &CapabilitySet,
    client: &CapabilitySet,
) -> Result<Option<CapabilitySet>> {
    check_roles(preferences, server, client)?;

    let Some(preferences) = preferences else {
        return Ok(server.negotiate(client));
    };

    let Some(supported) = server.negotiate(client) else {
        tracing::debug!("negotiation failed: server and client share no configuration");
        return Ok(None);
    };
    Ok(supported.negotiate(preferences))
}

/// Negotiate a single category across the three capability surfaces.
///
/// Without preferences (or without any preference for this category) this
/// is plain first-match negotiation between server and client. With
/// preferences the search is greedy and order-dependent, kept exactly as
/// the protocol has always behaved:
///
/// 1. Scan every `(server, client)` pair in priority order. Each pairwise
///    success is buffered, then immediately tried against the single
///    highest-priority preference for the category; the first triple that
///    succeeds is returned — the *first found*, not the best across all
///    three inputs.
/// 2. If no triple involving the first preference succeeds, the remaining
///    preferences are scanned in priority order against the buffered
///    pairwise successes, returning on the first success.
///
/// Known limitation, preserved deliberately: the scan is not exhaustive.
/// A valid triple can be missed when an earlier, ultimately unsuccessful
/// combination short-circuits past the pair a later preference would have
/// matched. Callers may depend on the exact result this ordering produces,
/// so it must not be "fixed" into a best-match search.
pub fn negotiate_category(
    preferences: Option<&CapabilitySet>,
    server: &CapabilitySet,
    client: &CapabilitySet,
    category: &str,
) -> Result<Option<Capability>> {
    check_roles(preferences, server, client)?;

    let preference_list = preferences
        .map(|set| set.get(category))
        .unwrap_or_default();

    let Some((first_preference, later_preferences)) = preference_list.split_first() else {
        return Ok(server.negotiated_value_with(client, category));
    };

    let server_list = server.get(category);
    let client_list = client.get(category);
    let mut supported: Vec<Capability> = Vec::new();

    for mine in &server_list {
        for yours in &client_list {
            let Some(pair) = mine.negotiate(yours) else {
                continue;
            };
            if let Some(result) = pair.negotiate(first_preference) {
                return Ok(Some(result));
            }
            supported.push(pair);
        }
    }

    for preference in later_preferences {
        for pair in &supported {
            if let Some(result) = preference.negotiate(pair) {
                return Ok(Some(result));
            }
        }
    }

    tracing::debug!(category, "category negotiation failed: no acceptable triple");
    Ok(None)
}

fn check_roles(
    preferences: Option<&CapabilitySet>,
    server: &CapabilitySet,
    client: &CapabilitySet,
) -> Result<()> {
    if server.is_preference() {
        return Err(Error::NonPreferenceRequired(
            "server capabilities must describe supported configurations".to_string(),
        ));
    }
    if client.is_preference() {
        return Err(Error::NonPreferenceRequired(
            "client capabilities must describe supported configurations".to_string(),
        ));
    }
    if let Some(preferences) = preferences {
        if !preferences.is_preference() {
            return Err(Error::PreferenceRequired(
                "negotiation preferences must be a preference set".to_string(),
            ));
        }
    }
    Ok(())
}
