use super::ContentTypeResolver;
use crate::humanize;
use crate::links::thumbnail_link;
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use unfurl_core::markup::escape_html;
use unfurl_core::ports::FetchResponse;
use unfurl_core::{CacheDuration, Error, RequestContext, ResolverResponse, Result};
use url::Url;

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static META_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").unwrap());
static ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static ENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").unwrap());

/// Web pages: title, description and preview image from the markup.
pub struct HtmlResolver {
    base_url: Url,
    max_content_length: u64,
}

impl HtmlResolver {
    pub fn new(base_url: Url, max_content_length: u64) -> Self {
        Self {
            base_url,
            max_content_length,
        }
    }
}

#[async_trait]
impl ContentTypeResolver for HtmlResolver {
    fn name(&self) -> &str {
        "html"
    }

    fn matches(&self, mime_type: &str) -> bool {
        matches!(mime_type, "text/html" | "application/xhtml+xml")
    }

    async fn load(
        &self,
        page: FetchResponse,
        _request: &RequestContext,
    ) -> Result<(ResolverResponse, CacheDuration)> {
        let final_url = page.final_url.clone();
        let body = match page.body.read(self.max_content_length).await {
            Ok(body) => body,
            Err(Error::TooLarge { limit }) => {
                return Ok((ResolverResponse::too_large(limit), CacheDuration::Default));
            }
            Err(e) => return Err(e),
        };

        let document = String::from_utf8_lossy(&body);
        let preview = PagePreview::parse(&document);

        let mut html = String::from("<div style=\"text-align: left;\">");
        if let Some(title) = &preview.title {
            html.push_str(&format!("<b>{}</b><hr>", escape_html(&humanize::title(title))));
        }
        if let Some(description) = &preview.description {
            html.push_str(&format!(
                "{}<hr>",
                escape_html(&humanize::description(description))
            ));
        }
        html.push_str(&format!(
            "<b>URL:</b> {}</div>",
            escape_html(final_url.as_str())
        ));

        let mut response = ResolverResponse::tooltip(&html);
        if let Some(image) = preview
            .image
            .and_then(|image| final_url.join(&image).ok())
            .filter(|image| matches!(image.scheme(), "http" | "https"))
        {
            response = response.with_thumbnail(thumbnail_link(&self.base_url, image.as_str()));
        }

        Ok((response, CacheDuration::Default))
    }
}

/// Metadata scraped from a page.
#[derive(Debug, Default, PartialEq, Eq)]
struct PagePreview {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
}

impl PagePreview {
    fn parse(document: &str) -> Self {
        let mut meta: HashMap<String, String> = HashMap::new();
        for tag in META_REGEX.find_iter(document) {
            let mut key = None;
            let mut content = None;
            for attr in ATTR_REGEX.captures_iter(tag.as_str()) {
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map_or("", |m| m.as_str());
                match attr[1].to_ascii_lowercase().as_str() {
                    "property" | "name" => key = Some(value.to_ascii_lowercase()),
                    "content" => content = Some(value.to_string()),
                    _ => {}
                }
            }
            if let (Some(key), Some(content)) = (key, content) {
                meta.entry(key).or_insert(content);
            }
        }

        let pick = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| meta.get(*key))
                .map(|value| clean_text(value))
                .find(|value| !value.is_empty())
        };

        let title = pick(&["og:title", "twitter:title"]).or_else(|| {
            TITLE_REGEX
                .captures(document)
                .map(|c| clean_text(&c[1]))
                .filter(|title| !title.is_empty())
        });

        Self {
            title,
            description: pick(&["og:description", "description", "twitter:description"]),
            image: pick(&["og:image", "og:image:url", "twitter:image"]),
        }
    }
}

/// Decode entities and collapse whitespace.
fn clean_text(raw: &str) -> String {
    let decoded = ENTITY_REGEX.replace_all(raw, |caps: &Captures| decode_entity(&caps[1], &caps[0]));
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entity(entity: &str, original: &str) -> String {
    let code = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse().ok()
    } else {
        None
    };

    if let Some(c) = code.and_then(char::from_u32) {
        return c.to_string();
    }

    match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        _ => original,
    }
    .to_string()
}
