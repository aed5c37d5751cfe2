//! Social profile link classification

use serde::{Deserialize, Serialize};
use url::Url;

/// Social platforms recognised on detail pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialPlatform {
    Facebook,
    Instagram,
    Twitter,
    LinkedIn,
    YouTube,
    TikTok,
}

impl SocialPlatform {
    fn from_host(host: &str) -> Option<Self> {
        let host = host
            .trim_start_matches("www.")
            .trim_start_matches("m.")
            .trim_start_matches("mobile.");

        match host {
            "facebook.com" | "fb.com" => Some(Self::Facebook),
            "instagram.com" => Some(Self::Instagram),
            "twitter.com" | "x.com" => Some(Self::Twitter),
            "youtube.com" | "youtu.be" => Some(Self::YouTube),
            "tiktok.com" => Some(Self::TikTok),
            h if h == "linkedin.com" || h.ends_with(".linkedin.com") => Some(Self::LinkedIn),
            _ => None,
        }
    }
}

/// First profile link found per platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub youtube: Option<String>,
    pub tiktok: Option<String>,
}

impl SocialLinks {
    /// Collects social links from a sequence of hrefs, keeping the first per platform
    pub fn from_links<'a, I>(hrefs: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut links = Self::default();
        for href in hrefs {
            if let Some((platform, target)) = classify_social(href) {
                let slot = links.slot_mut(platform);
                if slot.is_none() {
                    *slot = Some(target);
                }
            }
        }
        links
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn slot_mut(&mut self, platform: SocialPlatform) -> &mut Option<String> {
        match platform {
            SocialPlatform::Facebook => &mut self.facebook,
            SocialPlatform::Instagram => &mut self.instagram,
            SocialPlatform::Twitter => &mut self.twitter,
            SocialPlatform::LinkedIn => &mut self.linkedin,
            SocialPlatform::YouTube => &mut self.youtube,
            SocialPlatform::TikTok => &mut self.tiktok,
        }
    }
}

/// Classifies an href as a social profile link
///
/// Redirect wrappers of the form `https://www.google.com/url?q=<target>` are
/// unwrapped first. Returns the platform and the unwrapped target URL.
pub fn classify_social(href: &str) -> Option<(SocialPlatform, String)> {
    let url = Url::parse(href.trim()).ok()?;
    let url = unwrap_redirect(url);

    let host = url.host_str()?.to_ascii_lowercase();
    let platform = SocialPlatform::from_host(&host)?;

    // Bare domains point at the platform itself, not a profile
    if url.path().trim_matches('/').is_empty() {
        return None;
    }

    Some((platform, url.to_string()))
}

fn unwrap_redirect(url: Url) -> Url {
    if url.path() != "/url" {
        return url;
    }
    url.query_pairs()
        .find(|(key, _)| key == "q" || key == "url")
        .and_then(|(_, target)| Url::parse(&target).ok())
        .unwrap_or(url)
}
