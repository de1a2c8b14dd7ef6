//! `/public/*`: static files bundled into the binary.
//!
//! The `/public/` prefix is stripped and the remainder looked up in a fixed
//! table, so no request ever touches the filesystem.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};

pub const PUBLIC_PREFIX: &str = "/public/";

/// One bundled file.
#[derive(Debug)]
pub struct Asset {
    pub name: &'static str,
    pub content_type: &'static str,
    pub contents: &'static [u8],
}

static ASSETS: &[Asset] = &[
    Asset {
        name: "index.html",
        content_type: "text/html; charset=utf-8",
        contents: include_bytes!("../../assets/public/index.html"),
    },
    Asset {
        name: "app.js",
        content_type: "text/javascript; charset=utf-8",
        contents: include_bytes!("../../assets/public/app.js"),
    },
    Asset {
        name: "style.css",
        content_type: "text/css; charset=utf-8",
        contents: include_bytes!("../../assets/public/style.css"),
    },
];

/// Resolve a path relative to the prefix. Empty resolves to the index page.
pub fn find_asset(path: &str) -> Option<&'static Asset> {
    let name = match path.trim_start_matches('/') {
        "" => "index.html",
        name => name,
    };
    ASSETS.iter().find(|asset| asset.name == name)
}

fn respond(asset: Option<&'static Asset>) -> Response {
    match asset {
        Some(asset) => (
            [(header::CONTENT_TYPE, asset.content_type)],
            asset.contents,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
    }
}

pub async fn serve_asset(Path(path): Path<String>) -> Response {
    respond(find_asset(&path))
}

pub async fn serve_index() -> Response {
    respond(find_asset(""))
}

pub async fn redirect_to_index() -> Redirect {
    Redirect::permanent(PUBLIC_PREFIX)
}
