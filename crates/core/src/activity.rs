use serde::Serialize;

use crate::record::{DisplayRecord, IDLE_NAME, PLACEHOLDER_IMAGE_URL};

/// Label of the action button linking to a title's page.
pub const PAGE_BUTTON_LABEL: &str = "View Game";

/// One presence update, built per publish and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityPayload {
    pub details: String,
    /// Epoch seconds.
    pub start: i64,
    pub large_image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<ActivityButton>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityButton {
    pub label: String,
    pub url: String,
}

impl ActivityPayload {
    pub fn idle(start: i64) -> Self {
        Self {
            details: IDLE_NAME.to_string(),
            start,
            large_image: PLACEHOLDER_IMAGE_URL.to_string(),
            buttons: Vec::new(),
        }
    }

    /// Payload for a running title. A page button is attached only when the
    /// record carries a page URL and buttons are enabled.
    pub fn for_title(record: &DisplayRecord, start: i64, buttons_enabled: bool) -> Self {
        let buttons = match record.page_url() {
            Some(url) if buttons_enabled => vec![ActivityButton {
                label: PAGE_BUTTON_LABEL.to_string(),
                url: url.to_string(),
            }],
            _ => Vec::new(),
        };
        Self {
            details: record.name.clone(),
            start,
            large_image: record.image_url.clone(),
            buttons,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.details == IDLE_NAME && self.buttons.is_empty()
    }
}
