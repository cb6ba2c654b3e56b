//! Payload feed
//!
//! A camera reports the same code on every frame it stays in view. The feed
//! parses each non-empty delivery and only surfaces a credential when it
//! differs from the last one surfaced.

use crate::{parse_payload, Credential};

/// Turns per-frame decode results into credentials
#[derive(Debug, Default)]
pub struct PayloadFeed {
    last: Option<Credential>,
    deliveries: u64,
    rejected: u64,
}

impl PayloadFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer one scan cycle's decode result.
    ///
    /// Returns a credential the first time it is seen after a different one
    /// (or after [`reset`](Self::reset)).
    pub fn offer(&mut self, text: Option<&str>) -> Option<Credential> {
        let text = text?;
        self.deliveries += 1;

        let Some(credential) = parse_payload(text) else {
            self.rejected += 1;
            return None;
        };

        if self.last.as_ref() == Some(&credential) {
            return None;
        }

        self.last = Some(credential.clone());
        Some(credential)
    }

    /// Forget the last credential so the same code surfaces again
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Non-empty deliveries seen
    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }

    /// Deliveries the parser rejected
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_frames_surface_once() {
        let mut feed = PayloadFeed::new();
        let payload = "WIFI:S:Home;T:WPA;P:pw;;";

        assert!(feed.offer(Some(payload)).is_some());
        assert!(feed.offer(Some(payload)).is_none());
        assert!(feed.offer(None).is_none());
        assert!(feed.offer(Some(payload)).is_none());
        assert_eq!(feed.deliveries(), 3);

        feed.reset();
        assert!(feed.offer(Some(payload)).is_some());
    }

    #[test]
    fn test_new_code_surfaces() {
        let mut feed = PayloadFeed::new();
        assert!(feed.offer(Some("WIFI:S:A;;")).is_some());
        assert_eq!(feed.offer(Some("WIFI:S:B;;")).unwrap().ssid(), "B");
        assert_eq!(feed.offer(Some("WIFI:S:A;;")).unwrap().ssid(), "A");
    }

    #[test]
    fn test_rejected_payloads_counted() {
        let mut feed = PayloadFeed::new();
        assert!(feed.offer(Some("https://example.com")).is_none());
        assert!(feed.offer(Some("WIFI:T:WPA;;")).is_none());
        assert_eq!(feed.rejected(), 2);
        assert_eq!(feed.deliveries(), 2);
    }
}
