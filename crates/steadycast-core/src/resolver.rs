//! Proxy/direct URL resolution and escalation
//!
//! The resolver is a pure function of escalation state: given a
//! [`StreamTarget`] it yields the URL a backend should fetch, and given a
//! network failure it names the next escalation step. Escalation only moves
//! forward: direct → proxied, then along the backend fallback order.

use crate::{
    config::ProxyConfig,
    types::{BackendKind, StreamTarget},
    Error, Result,
};
use tracing::debug;
use url::Url;

/// Next step after a network-class failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Route through the relay, same backend
    UseProxy,
    /// Move to the next backend candidate
    SwitchBackend(BackendKind),
    /// Nothing left to escalate
    Exhausted,
}

/// Chooses between direct and relayed fetching
#[derive(Debug, Clone)]
pub struct UrlResolver {
    relay_base: Option<Url>,
    page_secure: bool,
    fallback_order: Vec<BackendKind>,
}

impl UrlResolver {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            relay_base: config.relay_base.clone(),
            page_secure: config.page_secure,
            fallback_order: config.fallback_order.clone(),
        }
    }

    pub fn has_relay(&self) -> bool {
        self.relay_base.is_some()
    }

    /// Whether a direct fetch would be blocked as mixed content
    pub fn is_mixed_content(&self, url: &Url) -> bool {
        self.page_secure && url.scheme() == "http"
    }

    /// Starting escalation state for a raw URL
    pub fn initial_target(&self, raw_url: Url) -> StreamTarget {
        let detected = BackendKind::detect(&raw_url);
        let backend_kind = if self.fallback_order.contains(&detected) {
            detected
        } else {
            self.fallback_order
                .iter()
                .copied()
                .find(|kind| plausibly_supports(*kind, &raw_url))
                .unwrap_or(detected)
        };
        let use_proxy = self.has_relay() && self.is_mixed_content(&raw_url);
        debug!(url = %raw_url, backend = %backend_kind, use_proxy, "Initial stream target");
        StreamTarget {
            raw_url,
            use_proxy,
            backend_kind,
        }
    }

    /// URL the backend should fetch for this target
    pub fn effective_url(&self, target: &StreamTarget) -> Result<Url> {
        let variant = backend_variant(target.backend_kind, &target.raw_url);
        if !target.use_proxy {
            return Ok(variant);
        }
        let relay = self
            .relay_base
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("proxy requested without relay_base".into()))?;
        let mut proxied = relay.clone();
        proxied.query_pairs_mut().append_pair("url", variant.as_str());
        Ok(proxied)
    }

    /// Next escalation after a network failure on `target`
    pub fn escalate_network(&self, target: &StreamTarget) -> Escalation {
        if !target.use_proxy && self.has_relay() {
            return Escalation::UseProxy;
        }
        match self.next_backend(target) {
            Some(kind) => Escalation::SwitchBackend(kind),
            None => Escalation::Exhausted,
        }
    }

    /// Next fallback candidate after the target's current backend
    pub fn next_backend(&self, target: &StreamTarget) -> Option<BackendKind> {
        let position = self
            .fallback_order
            .iter()
            .position(|kind| *kind == target.backend_kind)?;
        self.fallback_order[position + 1..]
            .iter()
            .copied()
            .find(|kind| plausibly_supports(*kind, &target.raw_url))
    }
}

fn extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.last()?;
    let (_, ext) = last.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Whether a backend family can plausibly play this URL
pub fn plausibly_supports(kind: BackendKind, url: &Url) -> bool {
    match (kind, extension(url).as_deref()) {
        (BackendKind::Hls, Some("m3u8" | "m3u" | "ts")) => true,
        (BackendKind::Hls, _) => false,
        (BackendKind::TsDemux, None | Some("ts") | Some("mpegts")) => true,
        (BackendKind::TsDemux, _) => false,
    }
}

/// Address the same channel in the form the backend expects.
///
/// IPTV panels serve a live channel both as `<id>.ts` and `<id>.m3u8`, so an
/// HLS backend playing a `.ts` target gets the playlist sibling.
pub fn backend_variant(kind: BackendKind, url: &Url) -> Url {
    if kind != BackendKind::Hls || extension(url).as_deref() != Some("ts") {
        return url.clone();
    }
    let mut variant = url.clone();
    let path = url.path();
    if let Some(stem) = path.strip_suffix(".ts").or_else(|| path.strip_suffix(".TS")) {
        variant.set_path(&format!("{stem}.m3u8"));
    }
    variant
}
