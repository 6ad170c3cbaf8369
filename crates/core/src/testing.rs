use crate::DisplayRecord;

/// Record with a page URL, as a retail lookup would produce.
pub fn record(name: &str) -> DisplayRecord {
    DisplayRecord {
        name: name.to_string(),
        image_url: format!("https://img.test/{}.png", slug(name)),
        page_url: format!("https://page.test/{}", slug(name)),
    }
}

/// Record without a page URL.
pub fn record_without_page(name: &str, image_url: &str) -> DisplayRecord {
    DisplayRecord {
        name: name.to_string(),
        image_url: image_url.to_string(),
        page_url: String::new(),
    }
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}
