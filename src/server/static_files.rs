//! Embedded player page and bridge script.

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;

/// Files under `assets/`, compiled into the binary.
#[derive(Embed)]
#[folder = "assets/"]
#[include = "*.html"]
#[include = "*.js"]
#[include = "*.css"]
pub struct PlayerAssets;

pub const INDEX: &str = "index.html";

/// Serves any embedded asset by request path; `/` maps to the player page.
pub async fn serve_static(request: Request) -> Response {
    let path = request.uri().path().trim_start_matches('/');
    if path.is_empty() {
        return serve_file(INDEX);
    }
    serve_file(path)
}

pub fn serve_file(path: &str) -> Response {
    match PlayerAssets::get(path) {
        Some(content) => file_response(path, content.data.as_ref()),
        None => (StatusCode::NOT_FOUND, "File not found").into_response(),
    }
}

fn file_response(path: &str, content: &[u8]) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        // The page is rebuilt on every reload; never serve a stale bridge
        .header(header::CACHE_CONTROL, "no-cache, must-revalidate")
        .body(Body::from(content.to_vec()))
        .unwrap_or_else(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create response",
            )
                .into_response()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_page_and_bridge_are_embedded() {
        let names: Vec<String> = PlayerAssets::iter().map(|s| s.to_string()).collect();
        assert!(names.contains(&"index.html".to_string()));
        assert!(names.contains(&"bridge.js".to_string()));
    }

    #[test]
    fn page_loads_bridge_and_content() {
        let page = PlayerAssets::get(INDEX).unwrap();
        let page = std::str::from_utf8(page.data.as_ref()).unwrap();
        assert!(page.contains("/bridge.js"));
        assert!(page.contains("/content.swf"));
    }
}
