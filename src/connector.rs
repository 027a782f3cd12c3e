use serde::Serialize;

/// An identity provider a user can pick on the login page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectorInfo {
    /// Internal ID for the connector.
    pub id: String,
    /// Name of the connector to show to the user.
    pub name: String,
    /// Where the user is sent to log in with this connector.
    pub url: String,
}

impl ConnectorInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Orders connectors by display name, keeping the given order for equal names.
pub fn sort_by_name(connectors: &mut [ConnectorInfo]) {
    connectors.sort_by(|a, b| a.name.cmp(&b.name));
}
