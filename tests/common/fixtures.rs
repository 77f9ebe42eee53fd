//! Metadata fixtures and mock image host setup

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Date directories the image host puts between the family segment and the file
pub const DATE_DIRS: &str = "img/2024/05/06/07/08/09";

/// Original-resolution URL of one page on the mock host
pub fn original_url(base: &str, id: &str, page: usize) -> String {
    format!("{base}/img-original/{DATE_DIRS}/{id}_p{page}.png")
}

/// Medium-resolution URL of one page on the mock host
pub fn master_url(base: &str, id: &str, page: usize) -> String {
    format!("{base}/img-master/{DATE_DIRS}/{id}_p{page}_master1200.jpg")
}

/// Path component of a mock host URL
pub fn route(base: &str, url: &str) -> String {
    url.trim_start_matches(base).to_string()
}

/// Successful ajax envelope
pub fn envelope(body: Value) -> Value {
    json!({ "error": false, "message": "", "body": body })
}

/// Detail body of a multi-page subject with a declared page list
pub fn manga_detail(base: &str, id: &str, title: &str, author: &str, pages: usize) -> Value {
    let page_list: Vec<Value> = (0..pages)
        .map(|n| {
            json!({
                "urls": {
                    "original": original_url(base, id, n),
                    "regular": master_url(base, id, n),
                },
                "width": 1200,
                "height": 1700
            })
        })
        .collect();

    json!({
        "illustId": id,
        "illustTitle": title,
        "userName": author,
        "illustType": 1,
        "pageCount": pages,
        "urls": {
            "original": original_url(base, id, 0),
            "regular": master_url(base, id, 0),
        },
        "pages": page_list
    })
}

/// Subject page HTML carrying preload data in its marker element
pub fn page_html(preload: &Value) -> String {
    let escaped = preload.to_string().replace('&', "&amp;").replace('\'', "&#39;");
    format!(
        r#"<!DOCTYPE html><html><head>
<meta charset="utf-8">
<meta name="preload-data" id="meta-preload-data" content='{escaped}'>
</head><body></body></html>"#
    )
}

/// Serve `body` as an image at `route`
pub async fn mount_image(server: &MockServer, route: &str, body: &'static [u8], mime: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, mime))
        .mount(server)
        .await;
}

/// Serve a bare status at `route`
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
