//! Destinations that rendered views are written to.

use std::io::{self, Write};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// A writable HTTP response.
pub trait ResponseSink: Write {
    /// Replaces the response with a plain-text error.
    fn send_error(&mut self, status: StatusCode, message: &str);
}

impl<S: ResponseSink + ?Sized> ResponseSink for &mut S {
    fn send_error(&mut self, status: StatusCode, message: &str) {
        (**self).send_error(status, message)
    }
}

/// A buffered HTML response that can be returned from an axum handler.
pub struct HtmlResponse {
    status: StatusCode,
    content_type: &'static str,
    nosniff: bool,
    body: Vec<u8>,
}

impl HtmlResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "text/html; charset=utf-8",
            nosniff: false,
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &str {
        self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Default for HtmlResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for HtmlResponse {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseSink for HtmlResponse {
    fn send_error(&mut self, status: StatusCode, message: &str) {
        self.status = status;
        self.content_type = "text/plain; charset=utf-8";
        self.nosniff = true;

        self.body.clear();
        self.body.extend_from_slice(message.as_bytes());
        self.body.push(b'\n');
    }
}

impl IntoResponse for HtmlResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type),
        );
        if self.nosniff {
            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
        }

        response
    }
}
