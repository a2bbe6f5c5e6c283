//! Stub requests and principals for testing.

use crate::application::ports::{LoginResult, Principal, Request};
use crate::domain::printable::Value;

/// How a [`StubPrincipal`] answers login lookups.
#[derive(Debug, Clone)]
pub enum StubLogin {
    /// The principal has no login (unauthenticated)
    Missing,
    /// The lookup succeeds
    Name(Value),
    /// The lookup returns an error
    Fails(String),
    /// The lookup panics
    Panics,
}

/// Principal with configurable attributes.
#[derive(Debug, Clone)]
pub struct StubPrincipal {
    pub login: StubLogin,
    pub id: Option<Value>,
    pub title: Option<Value>,
    pub description: Option<Value>,
}

impl StubPrincipal {
    /// Principal without a login but with all other attributes set.
    pub fn unauthenticated(
        id: impl Into<Value>,
        title: impl Into<Value>,
        description: impl Into<Value>,
    ) -> Self {
        Self {
            login: StubLogin::Missing,
            id: Some(id.into()),
            title: Some(title.into()),
            description: Some(description.into()),
        }
    }

    pub fn with_login(mut self, login: StubLogin) -> Self {
        self.login = login;
        self
    }
}

impl Principal for StubPrincipal {
    fn login(&self) -> Option<LoginResult> {
        match &self.login {
            StubLogin::Missing => None,
            StubLogin::Name(name) => Some(Ok(name.clone())),
            StubLogin::Fails(reason) => Some(Err(reason.clone().into())),
            StubLogin::Panics => panic!("login lookup exploded"),
        }
    }

    fn id(&self) -> Option<Value> {
        self.id.clone()
    }

    fn title(&self) -> Option<Value> {
        self.title.clone()
    }

    fn description(&self) -> Option<Value> {
        self.description.clone()
    }
}

/// Request with configurable URL, principal and items.
#[derive(Debug, Clone, Default)]
pub struct StubRequest {
    pub url: Option<Value>,
    pub principal: Option<StubPrincipal>,
    pub items: Vec<(Value, Value)>,
}

impl StubRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<Value>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_principal(mut self, principal: StubPrincipal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_item(mut self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.items.push((key.into(), value.into()));
        self
    }
}

impl Request for StubRequest {
    fn principal(&self) -> Option<&dyn Principal> {
        self.principal.as_ref().map(|p| p as &dyn Principal)
    }

    fn url(&self) -> Option<Value> {
        self.url.clone()
    }

    fn items(&self) -> Vec<(Value, Value)> {
        self.items.clone()
    }
}
