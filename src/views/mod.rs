//! Renders the pages shown to users while they authenticate.
//!
//! Each view merges its own data with the global branding and writes the
//! result to a [`ResponseSink`]. Rendering never returns an error: failures are
//! reported to the [`RenderObserver`], and the client is sent a generic error
//! page unless part of the page has already been written.

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;

use crate::{
    connector::{self, ConnectorInfo},
    templates::{GlobalData, Templates, View},
};

mod recorder;
mod sink;

pub use recorder::WriteRecorder;
pub use sink::{HtmlResponse, ResponseSink};

/// Body sent to the client when a view fails to render.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Returns the text shown on the approval page for a requested scope.
///
/// Scopes without a description are not shown to the user.
pub fn scope_description(scope: &str) -> Option<&'static str> {
    match scope {
        "offline_access" => Some("Have offline access"),
        "profile" => Some("View basic profile information"),
        "email" => Some("View your email"),
        _ => None,
    }
}

/// Receives reports about problems while rendering views.
pub trait RenderObserver: Send + Sync {
    /// Called when executing a view's template fails.
    ///
    /// `wrote` is true if part of the page had already been sent.
    fn render_failed(&self, view: View, error: &minijinja::Error, wrote: bool);

    /// Called for each requested scope left off the approval page.
    fn scope_dropped(&self, _scope: &str) {}
}

/// Reports rendering problems as `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RenderObserver for TracingObserver {
    fn render_failed(&self, view: View, error: &minijinja::Error, wrote: bool) {
        tracing::error!(
            template = view.template_name(),
            %error,
            wrote,
            "error rendering template"
        );
    }

    fn scope_dropped(&self, scope: &str) {
        tracing::debug!(scope, "no description for requested scope");
    }
}

#[derive(Serialize)]
struct LoginData<'a> {
    #[serde(flatten)]
    global: &'a GlobalData,
    connectors: &'a [ConnectorInfo],
    auth_req_id: &'a str,
}

#[derive(Serialize)]
struct PasswordData<'a> {
    #[serde(flatten)]
    global: &'a GlobalData,
    auth_req_id: &'a str,
    post_url: &'a str,
    username: &'a str,
    invalid: bool,
}

#[derive(Serialize)]
struct ApprovalData<'a> {
    #[serde(flatten)]
    global: &'a GlobalData,
    user: &'a str,
    client: &'a str,
    auth_req_id: &'a str,
    scopes: Vec<&'static str>,
}

#[derive(Serialize)]
struct OobData<'a> {
    #[serde(flatten)]
    global: &'a GlobalData,
    code: &'a str,
}

/// Renders views from a loaded template set.
///
/// Cheap to clone; every clone shares the same templates and observer.
#[derive(Clone)]
pub struct Renderer {
    templates: Arc<Templates>,
    observer: Arc<dyn RenderObserver>,
}

impl Renderer {
    /// Constructs a renderer that reports failures through `tracing`.
    pub fn new(templates: Arc<Templates>) -> Self {
        Self {
            templates,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replaces the observer that rendering failures are reported to.
    pub fn with_observer(mut self, observer: Arc<dyn RenderObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns the underlying template set.
    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Renders the connector selection page.
    ///
    /// Connectors are shown ordered by name.
    pub fn login<S>(&self, sink: &mut S, mut connectors: Vec<ConnectorInfo>, auth_req_id: &str)
    where
        S: ResponseSink + ?Sized,
    {
        connector::sort_by_name(&mut connectors);

        let data = LoginData {
            global: self.templates.global(),
            connectors: &connectors,
            auth_req_id,
        };
        self.render(sink, View::Login, data);
    }

    /// Renders the username and password form.
    ///
    /// `last_username` pre-fills the form, and `last_was_invalid` shows that
    /// the previous attempt failed.
    pub fn password<S>(
        &self,
        sink: &mut S,
        auth_req_id: &str,
        post_url: &str,
        last_username: &str,
        last_was_invalid: bool,
    ) where
        S: ResponseSink + ?Sized,
    {
        let data = PasswordData {
            global: self.templates.global(),
            auth_req_id,
            post_url,
            username: last_username,
            invalid: last_was_invalid,
        };
        self.render(sink, View::Password, data);
    }

    /// Renders the page asking the user to grant a client access.
    pub fn approval<S, T>(
        &self,
        sink: &mut S,
        auth_req_id: &str,
        username: &str,
        client_name: &str,
        scopes: &[T],
    ) where
        S: ResponseSink + ?Sized,
        T: AsRef<str>,
    {
        let mut accesses = Vec::with_capacity(scopes.len());
        for scope in scopes {
            match scope_description(scope.as_ref()) {
                Some(access) => accesses.push(access),
                None => self.observer.scope_dropped(scope.as_ref()),
            }
        }
        accesses.sort_unstable();

        let data = ApprovalData {
            global: self.templates.global(),
            user: username,
            client: client_name,
            auth_req_id,
            scopes: accesses,
        };
        self.render(sink, View::Approval, data);
    }

    /// Renders the page displaying an out-of-band code.
    pub fn oob<S>(&self, sink: &mut S, code: &str)
    where
        S: ResponseSink + ?Sized,
    {
        let data = OobData {
            global: self.templates.global(),
            code,
        };
        self.render(sink, View::Oob, data);
    }

    fn render<S, T>(&self, sink: &mut S, view: View, data: T)
    where
        S: ResponseSink + ?Sized,
        T: Serialize,
    {
        let mut recorder = WriteRecorder::new(&mut *sink);
        let result = self.templates.template(view).and_then(|template| {
            template.render_to_write(data, &mut recorder)?;
            Ok(())
        });
        let wrote = recorder.wrote();

        if let Err(error) = result {
            self.observer.render_failed(view, &error, wrote);

            // Once part of the page is out the status can't be changed.
            if !wrote {
                sink.send_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE);
            }
        }
    }
}
