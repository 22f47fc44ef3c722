//! Selector-driven site adapter
//!
//! Extraction rules are plain CSS selectors:
//! - Listing pages: every `link_selector` match with an `href`
//! - Item pages: the first `title_selector` match, the `timestamp_attr`
//!   attribute of the first `timestamp_selector` match and the text of all
//!   `body_selector` matches

use crate::config::validation::validate_http_url;
use crate::config::SiteConfig;
use crate::fetch::Document;
use crate::pipeline::Record;
use crate::sites::{presets, SiteAdapter};
use crate::{ConfigError, ExtractError};
use scraper::{Html, Selector};
use url::Url;

/// Placeholder substituted with the page number in listing templates
const PAGE_PLACEHOLDER: &str = "{page}";

/// A site described entirely by CSS selectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteDefinition {
    /// Short identifier used in logs
    pub name: String,

    /// Site root; stored as the source of every record
    pub base_url: String,

    /// Listing page URL with a `{page}` placeholder
    pub listing_template: String,

    /// Listing pages `1..=max_page` are seeded
    pub max_page: u32,

    pub link_selector: String,
    pub title_selector: String,
    pub timestamp_selector: String,

    /// Attribute of the timestamp element holding the value
    pub timestamp_attr: String,

    pub body_selector: String,

    /// Joins the text of consecutive body matches
    pub body_separator: String,
}

impl SiteDefinition {
    /// Resolves a site definition from configuration
    ///
    /// A `preset` supplies defaults for every field; explicitly configured
    /// fields override them. Without a preset all URL and selector fields
    /// are required.
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        let preset = match config.preset.as_deref() {
            Some(name) => Some(
                presets::by_name(name)
                    .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?,
            ),
            None => None,
        };

        let field = |value: &Option<String>,
                     fallback: Option<&String>,
                     key: &str|
         -> Result<String, ConfigError> {
            value.clone().or_else(|| fallback.cloned()).ok_or_else(|| {
                ConfigError::Validation(format!("site.{} is required without a preset", key))
            })
        };

        Ok(SiteDefinition {
            name: config
                .name
                .clone()
                .or_else(|| preset.as_ref().map(|p| p.name.clone()))
                .unwrap_or_else(|| "custom".to_string()),
            base_url: field(
                &config.base_url,
                preset.as_ref().map(|p| &p.base_url),
                "base-url",
            )?,
            listing_template: field(
                &config.listing_template,
                preset.as_ref().map(|p| &p.listing_template),
                "listing-template",
            )?,
            max_page: config
                .max_page
                .or_else(|| preset.as_ref().map(|p| p.max_page))
                .unwrap_or(1),
            link_selector: field(
                &config.link_selector,
                preset.as_ref().map(|p| &p.link_selector),
                "link-selector",
            )?,
            title_selector: field(
                &config.title_selector,
                preset.as_ref().map(|p| &p.title_selector),
                "title-selector",
            )?,
            timestamp_selector: field(
                &config.timestamp_selector,
                preset.as_ref().map(|p| &p.timestamp_selector),
                "timestamp-selector",
            )?,
            timestamp_attr: config
                .timestamp_attr
                .clone()
                .or_else(|| preset.as_ref().map(|p| p.timestamp_attr.clone()))
                .unwrap_or_else(|| "datetime".to_string()),
            body_selector: field(
                &config.body_selector,
                preset.as_ref().map(|p| &p.body_selector),
                "body-selector",
            )?,
            body_separator: config
                .body_separator
                .clone()
                .or_else(|| preset.as_ref().map(|p| p.body_separator.clone()))
                .unwrap_or_else(|| " ".to_string()),
        })
    }

    /// Checks URLs and page range; selectors are checked when compiled
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("site.base-url", &self.base_url)?;

        if !self.listing_template.contains(PAGE_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "site.listing-template '{}' must contain {}",
                self.listing_template, PAGE_PLACEHOLDER
            )));
        }
        validate_http_url("site.listing-template", &self.listing_url(1))?;

        if self.max_page < 1 {
            return Err(ConfigError::Validation(
                "site.max-page must be >= 1".to_string(),
            ));
        }

        if self.timestamp_attr.is_empty() {
            return Err(ConfigError::Validation(
                "site.timestamp-attr cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// URL of listing page `page`
    pub fn listing_url(&self, page: u32) -> String {
        self.listing_template.replace(PAGE_PLACEHOLDER, &page.to_string())
    }
}

/// Selector-driven [`SiteAdapter`]
///
/// Selectors are compiled once on construction and shared by every worker
/// thread afterwards.
#[derive(Debug, Clone)]
pub struct SelectorSite {
    definition: SiteDefinition,
    links: Selector,
    title: Selector,
    timestamp: Selector,
    body: Selector,
}

impl SelectorSite {
    /// Validates `definition` and compiles its selectors
    ///
    /// # Returns
    ///
    /// * `Ok(SelectorSite)` - Ready-to-use adapter
    /// * `Err(ConfigError)` - Bad URL, page range or selector
    pub fn new(definition: SiteDefinition) -> Result<Self, ConfigError> {
        definition.validate()?;

        Ok(Self {
            links: compile("site.link-selector", &definition.link_selector)?,
            title: compile("site.title-selector", &definition.title_selector)?,
            timestamp: compile("site.timestamp-selector", &definition.timestamp_selector)?,
            body: compile("site.body-selector", &definition.body_selector)?,
            definition,
        })
    }

    /// Resolves and compiles a site from configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        Self::new(SiteDefinition::from_config(config)?)
    }

    pub fn definition(&self) -> &SiteDefinition {
        &self.definition
    }
}

impl SiteAdapter for SelectorSite {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn seed_urls(&self) -> Vec<String> {
        (1..=self.definition.max_page)
            .map(|page| self.definition.listing_url(page))
            .collect()
    }

    fn extract_links(&self, document: &Document) -> Vec<String> {
        let Some(base_url) = Url::parse(&document.url)
            .or_else(|_| Url::parse(&self.definition.base_url))
            .ok()
        else {
            tracing::warn!(
                "{}: cannot resolve links of {}",
                self.definition.name,
                document.url
            );
            return Vec::new();
        };

        let html = Html::parse_document(&document.body);
        html.select(&self.links)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(href, &base_url))
            .collect()
    }

    fn extract_record(&self, document: &Document) -> Result<Record, ExtractError> {
        let html = Html::parse_document(&document.body);

        let title = html
            .select(&self.title)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .ok_or_else(|| ExtractError::MissingTitle {
                url: document.url.clone(),
            })?;

        let timestamp = html
            .select(&self.timestamp)
            .next()
            .and_then(|element| element.value().attr(&self.definition.timestamp_attr))
            .ok_or_else(|| ExtractError::MissingTimestamp {
                url: document.url.clone(),
            })?
            .to_string();

        let body = html
            .select(&self.body)
            .map(|element| element.text().collect::<String>())
            .collect::<Vec<_>>()
            .join(&self.definition.body_separator);

        Ok(Record {
            source: self.definition.base_url.clone(),
            title,
            timestamp,
            body,
        })
    }
}

fn compile(key: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::Validation(format!("{} '{}' is invalid: {:?}", key, selector, e))
    })
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| href.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
