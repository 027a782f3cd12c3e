//! Template sources compiled into the binary.
//!
//! These are used whenever no template directory is configured, so the
//! server renders its pages out of the box.

/// Built-in template name to source text.
///
/// The page layout lives in `header.html` and `footer.html`, which every
/// view includes by name.
pub const SOURCES: &[(&str, &str)] = &[
    ("header.html", include_str!("../../templates/header.html")),
    ("footer.html", include_str!("../../templates/footer.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("password.html", include_str!("../../templates/password.html")),
    ("approval.html", include_str!("../../templates/approval.html")),
    ("oob.html", include_str!("../../templates/oob.html")),
];
