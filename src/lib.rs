pub mod connector;
pub mod templates;

/// Renders the authentication pages.
pub mod views;

/// HTTP preview server for the views.
#[cfg(feature = "server")]
pub mod http;
