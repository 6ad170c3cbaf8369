use serde::{Deserialize, Serialize};

/// Image shown whenever a title has no resolvable artwork.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://github.com/jeroendev-one/ps5-rpc-client/raw/main/assets/fallback_ps5.webp";

/// Display name used for the idle record.
pub const IDLE_NAME: &str = "Idle";

/// Resolved, human-facing description of a running title.
///
/// `page_url` is empty when no page is known; cached documents keep it that
/// way so a cache hit never re-derives button eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecord {
    #[serde(alias = "gameName")]
    pub name: String,
    #[serde(alias = "gameImage", default)]
    pub image_url: String,
    #[serde(default)]
    pub page_url: String,
}

impl DisplayRecord {
    /// Build a record, enforcing the non-empty name and image invariants.
    /// `fallback_name` is used when `name` is blank.
    pub fn new(
        name: impl Into<String>,
        image_url: impl Into<String>,
        page_url: impl Into<String>,
        fallback_name: &str,
    ) -> Self {
        let name = non_empty_or(name.into(), fallback_name);
        let image_url = non_empty_or(image_url.into(), PLACEHOLDER_IMAGE_URL);
        Self {
            name,
            image_url,
            page_url: page_url.into().trim().to_string(),
        }
    }

    /// Record shown while no title is running.
    pub fn idle() -> Self {
        Self {
            name: IDLE_NAME.to_string(),
            image_url: PLACEHOLDER_IMAGE_URL.to_string(),
            page_url: String::new(),
        }
    }

    /// Record for a key that could not be resolved: the key itself, the
    /// placeholder image and no page.
    pub fn placeholder(key: &str) -> Self {
        Self::new(key, "", "", IDLE_NAME)
    }

    pub fn page_url(&self) -> Option<&str> {
        Some(self.page_url.as_str()).filter(|url| !url.is_empty())
    }

    /// Repair records read from older or hand-edited documents.
    pub fn normalized(self, key: &str) -> Self {
        Self::new(self.name, self.image_url, self.page_url, key)
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
