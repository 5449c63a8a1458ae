//! Links back into this service.

use url::Url;

/// `<base>/thumbnail?url=<target>`.
pub fn thumbnail_link(base_url: &Url, target: &str) -> String {
    let mut link = base_url.clone();
    link.path_segments_mut()
        .map(|mut segments| {
            segments.pop_if_empty().push("thumbnail");
        })
        .ok();
    link.query_pairs_mut().clear().append_pair("url", target);
    link.to_string()
}

/// `<base>/generated/<token>`.
pub fn generated_link(base_url: &Url, token: &str) -> String {
    let mut link = base_url.clone();
    link.path_segments_mut()
        .map(|mut segments| {
            segments.pop_if_empty().push("generated").push(token);
        })
        .ok();
    link.set_query(None);
    link.to_string()
}
