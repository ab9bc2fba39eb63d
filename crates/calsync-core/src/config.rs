// ── Runtime sync configuration ──
//
// Describes *where* the live stream lives and *how* to reach it. Carries
// the credential provider but never touches disk: `calsync-config` (or an
// embedding app) builds a `SyncConfig` and hands it in.

use std::fmt;
use std::sync::Arc;

use calsync_api::{CredentialProvider, StreamOptions, TransportConfig};
use url::Url;

/// Everything [`LiveSync`](crate::LiveSync) needs to open a stream.
#[derive(Clone)]
pub struct SyncConfig {
    /// Full URL of the stream endpoint.
    pub url: Url,
    pub transport: TransportConfig,
    pub credentials: Arc<dyn CredentialProvider>,
    pub options: StreamOptions,
}

impl SyncConfig {
    pub fn new(url: Url, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            url,
            transport: TransportConfig::default(),
            credentials,
            options: StreamOptions::default(),
        }
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("url", &self.url.as_str())
            .field("transport", &self.transport)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
