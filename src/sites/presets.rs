//! Built-in site definitions

use crate::sites::SiteDefinition;

/// Names accepted by [`by_name`]
pub const PRESET_NAMES: &[&str] = &["nur", "tengri"];

/// Looks up a preset by name
pub fn by_name(name: &str) -> Option<SiteDefinition> {
    match name {
        "nur" => Some(nur()),
        "tengri" => Some(tengri()),
        _ => None,
    }
}

/// nur.kz coronavirus tag feed
pub fn nur() -> SiteDefinition {
    SiteDefinition {
        name: "nur".to_string(),
        base_url: "https://www.nur.kz".to_string(),
        listing_template: "https://www.nur.kz/tag/2019-ncov.html?page={page}".to_string(),
        max_page: 1,
        link_selector: ".block-infinite__item a".to_string(),
        title_selector: "h1".to_string(),
        timestamp_selector: ".layout-article-page__content time".to_string(),
        timestamp_attr: "datetime".to_string(),
        body_selector: "article > p".to_string(),
        body_separator: String::new(),
    }
}

/// tengrinews.kz "Coronavirus in Kazakhstan" tag feed
pub fn tengri() -> SiteDefinition {
    SiteDefinition {
        name: "tengri".to_string(),
        base_url: "https://tengrinews.kz".to_string(),
        listing_template: concat!(
            "https://tengrinews.kz/tag/",
            "%D0%9A%D0%BE%D1%80%D0%BE%D0%BD%D0%B0%D0%B2%D0%B8%D1%80%D1%83%D1%81",
            "-%D0%B2-%D0%9A%D0%B0%D0%B7%D0%B0%D1%85%D1%81%D1%82%D0%B0%D0%BD%D0%B5/",
            "?page={page}"
        )
        .to_string(),
        max_page: 1,
        link_selector: ".tn-news-author-list .tn-news-author-list-item a".to_string(),
        title_selector: "h1".to_string(),
        timestamp_selector: ".tn-data-list time".to_string(),
        timestamp_attr: "datetime".to_string(),
        body_selector: ".tn-news-content .tn-news-text > p".to_string(),
        body_separator: " ".to_string(),
    }
}
