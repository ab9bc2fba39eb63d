use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;

/// Source of the bearer credential attached to the streaming request.
///
/// Passed into the [`StreamClient`](crate::StreamClient) at construction
/// time. Token acquisition and refresh live outside this crate; they only
/// need to hand over a provider.
pub trait CredentialProvider: Send + Sync {
    /// The current bearer token, or `None` when signed out.
    fn bearer_token(&self) -> Option<SecretString>;
}

/// A fixed token that never changes for the lifetime of the provider.
#[derive(Clone)]
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

/// A token slot shared between the sign-in flow and every stream client.
///
/// Cheaply cloneable; all clones observe the same slot. Writers call
/// [`set`](Self::set) after login or refresh and [`clear`](Self::clear) on
/// logout. Readers never block.
#[derive(Clone, Default)]
pub struct SharedToken {
    slot: Arc<ArcSwapOption<SecretString>>,
}

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<SecretString>) {
        self.slot.store(Some(Arc::new(token.into())));
    }

    pub fn clear(&self) {
        self.slot.store(None);
    }

    pub fn is_set(&self) -> bool {
        self.slot.load().is_some()
    }
}

impl CredentialProvider for SharedToken {
    fn bearer_token(&self) -> Option<SecretString> {
        self.slot.load_full().map(|token| (*token).clone())
    }
}

impl fmt::Debug for SharedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedToken")
            .field("set", &self.is_set())
            .finish()
    }
}
