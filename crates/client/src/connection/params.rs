//! Per-attempt handshake parameters.

use std::rc::Rc;

use gang_protocol::ConnectParams;

use crate::error::ClientError;
use crate::identity::IdentityStore;
use crate::ports::outbound::{dom, DocumentProvider};

/// Anti-forgery token read once from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read `<meta name="csrf-token">`. An absent or empty token is fatal.
    pub fn from_document(document: &dyn DocumentProvider) -> Result<Self, ClientError> {
        document
            .meta_content(dom::CSRF_META_NAME)
            .filter(|token| !token.is_empty())
            .map(Self)
            .ok_or(ClientError::MissingCsrfToken(dom::CSRF_META_NAME))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Produces the params for one connection attempt.
pub type ParamsSupplier = Rc<dyn Fn() -> ConnectParams>;

/// Supplier that re-reads the identity store on every call, so a reconnect
/// always carries the identity saved most recently.
pub fn params_supplier(csrf: CsrfToken, identity: IdentityStore) -> ParamsSupplier {
    Rc::new(move || {
        let stored = identity.read();
        ConnectParams::new(csrf.as_str(), stored.name(), stored.id())
    })
}
