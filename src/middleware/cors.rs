use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// The widget may be embedded on any page; it only needs JSON GET and POST.
pub fn widget_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any)
}
