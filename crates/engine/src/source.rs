use profiles::{Capabilities, DeviceClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaContainer {
    Mp4,
    Webm,
    JpgSequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

/// The asset chosen for one mount. Immutable after selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub url: String,
    pub container: MediaContainer,
    pub orientation: Orientation,
}

impl MediaSource {
    pub fn sequence(url_template: impl Into<String>) -> Self {
        Self {
            url: url_template.into(),
            container: MediaContainer::JpgSequence,
            orientation: Orientation::Landscape,
        }
    }
}

/// Candidate URLs supplied by the CMS for one hero video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    pub landscape: String,
    pub portrait: Option<String>,
}

/// Derive the transcoded WebM URL for a canonical mp4 URL. URLs that do not
/// end in `.mp4` (query strings included) have no known transcode.
pub fn webm_variant(canonical: &str) -> Option<String> {
    canonical
        .strip_suffix(".mp4")
        .map(|stem| format!("{stem}.webm"))
}

/// Pure selection table. `probe_ok` is the outcome of the HEAD probe against
/// the WebM variant; callers that never probed pass false, which degrades to
/// the canonical URL.
pub fn negotiate(
    sources: &SourceSet,
    capabilities: &Capabilities,
    webm_supported: bool,
    probe_ok: bool,
) -> MediaSource {
    let (canonical, orientation) = match (&sources.portrait, capabilities.device) {
        (Some(portrait), DeviceClass::Android) => (portrait.as_str(), Orientation::Portrait),
        _ => (sources.landscape.as_str(), Orientation::Landscape),
    };

    if !capabilities.is_mobile() && webm_supported && probe_ok {
        if let Some(webm) = webm_variant(canonical) {
            return MediaSource {
                url: webm,
                container: MediaContainer::Webm,
                orientation,
            };
        }
    }

    MediaSource {
        url: canonical.to_string(),
        container: MediaContainer::Mp4,
        orientation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profiles::Capabilities;

    const DESKTOP_UA: &str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/120.0.0.0 Safari/537.36";
    const ANDROID_UA: &str =
        "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/120.0.0.0 Mobile Safari/537.36";
    const IPHONE_UA: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    fn sources() -> SourceSet {
        SourceSet {
            landscape: "https://media.example.com/hero.mp4".into(),
            portrait: Some("https://media.example.com/hero-portrait.mp4".into()),
        }
    }

    #[test]
    fn desktop_prefers_probed_webm() {
        let caps = Capabilities::from_user_agent(DESKTOP_UA);
        let chosen = negotiate(&sources(), &caps, true, true);
        assert_eq!(chosen.url, "https://media.example.com/hero.webm");
        assert_eq!(chosen.container, MediaContainer::Webm);
        assert_eq!(chosen.orientation, Orientation::Landscape);
    }

    #[test]
    fn failed_probe_falls_back_to_canonical() {
        let caps = Capabilities::from_user_agent(DESKTOP_UA);
        let chosen = negotiate(&sources(), &caps, true, false);
        assert_eq!(chosen.url, "https://media.example.com/hero.mp4");
        assert_eq!(chosen.container, MediaContainer::Mp4);
    }

    #[test]
    fn missing_webm_support_skips_the_transcode() {
        let caps = Capabilities::from_user_agent(DESKTOP_UA);
        let chosen = negotiate(&sources(), &caps, false, true);
        assert_eq!(chosen.container, MediaContainer::Mp4);
    }

    #[test]
    fn android_takes_the_portrait_asset() {
        let caps = Capabilities::from_user_agent(ANDROID_UA);
        let chosen = negotiate(&sources(), &caps, true, true);
        assert_eq!(chosen.url, "https://media.example.com/hero-portrait.mp4");
        assert_eq!(chosen.orientation, Orientation::Portrait);
        // Mobile never takes the transcode, even with support reported.
        assert_eq!(chosen.container, MediaContainer::Mp4);
    }

    #[test]
    fn android_without_portrait_uses_landscape() {
        let caps = Capabilities::from_user_agent(ANDROID_UA);
        let set = SourceSet {
            landscape: "https://media.example.com/hero.mp4".into(),
            portrait: None,
        };
        let chosen = negotiate(&set, &caps, false, false);
        assert_eq!(chosen.url, "https://media.example.com/hero.mp4");
        assert_eq!(chosen.orientation, Orientation::Landscape);
    }

    #[test]
    fn ios_uses_canonical_landscape() {
        let caps = Capabilities::from_user_agent(IPHONE_UA);
        let chosen = negotiate(&sources(), &caps, true, true);
        assert_eq!(chosen.url, "https://media.example.com/hero.mp4");
        assert_eq!(chosen.orientation, Orientation::Landscape);
    }

    #[test]
    fn webm_variant_requires_a_plain_mp4_suffix() {
        assert_eq!(
            webm_variant("https://m.example.com/a.mp4").as_deref(),
            Some("https://m.example.com/a.webm")
        );
        assert_eq!(webm_variant("https://m.example.com/a.mp4?w=1920"), None);
        assert_eq!(webm_variant("https://m.example.com/a.mov"), None);
    }
}
