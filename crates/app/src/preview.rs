use std::collections::HashSet;

/// Issues display handles for pending images and tracks which are still live.
///
/// Every handle must be released once its image leaves the session;
/// `live_count` makes a missed release visible.
#[derive(Debug, Default)]
pub struct PreviewUrls {
    live: HashSet<String>,
}

impl PreviewUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> String {
        let url = format!("blob:khatt/{}", uuid::Uuid::new_v4());
        self.live.insert(url.clone());
        url
    }

    /// Returns false when `url` was not live (unknown or already released).
    pub fn release(&mut self, url: &str) -> bool {
        self.live.remove(url)
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.contains(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_urls_are_distinct_and_live() {
        let mut urls = PreviewUrls::new();
        let a = urls.issue();
        let b = urls.issue();
        assert_ne!(a, b);
        assert!(a.starts_with("blob:khatt/"));
        assert!(urls.is_live(&a));
        assert_eq!(urls.live_count(), 2);
    }

    #[test]
    fn release_is_single_shot() {
        let mut urls = PreviewUrls::new();
        let a = urls.issue();
        assert!(urls.release(&a));
        assert!(!urls.release(&a));
        assert!(!urls.is_live(&a));
        assert_eq!(urls.live_count(), 0);
    }
}
