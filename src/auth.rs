use async_trait::async_trait;
use std::{fmt, sync::Arc};

use super::{ErrorKind, Result};

/// The resource kind every scaling permission is checked against
pub const DOMAINS: &str = "domains";

/// Kubernetes verbs the backend asks permission for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    List,
    Update,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Get => "get",
            Verb::List => "list",
            Verb::Update => "update",
        };
        f.write_str(s)
    }
}

/// Who a token belongs to
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Principal {
    pub username: String,
    pub uid: Option<String>,
    pub groups: Vec<String>,
}

/// Answer from a token validation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenValidation {
    pub authenticated: bool,
    pub principal: Principal,
}

/// External authorities for identity and access
#[async_trait]
pub trait IdentityAuthority: Send + Sync {
    /// Who presented this token, if anyone
    async fn validate_token(&self, token: &str) -> Result<TokenValidation>;

    /// Whether `principal` may perform `verb` on `resource` in `namespace`
    async fn review_access(&self, principal: &Principal, namespace: &str, resource: &str, verb: Verb) -> Result<bool>;
}

/// Outcome of passing the identity gate
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityDecision {
    pub authenticated: bool,
    pub authorized: bool,
    pub principal: Principal,
}

impl IdentityDecision {
    fn unauthenticated(principal: Principal) -> Self {
        IdentityDecision {
            authenticated: false,
            authorized: false,
            principal,
        }
    }

    pub fn allowed(&self) -> bool {
        self.authenticated && self.authorized
    }

    /// The principal if allowed, otherwise the matching denial
    pub fn into_result(self, namespace: &str, verb: Verb) -> Result<Principal> {
        if !self.authenticated {
            bail!(ErrorKind::Unauthenticated);
        }
        if !self.authorized {
            bail!(ErrorKind::Forbidden(
                self.principal.username,
                verb.to_string(),
                namespace.into()
            ));
        }
        Ok(self.principal)
    }
}

/// Authentication and authorization of every protected call
///
/// Nothing is cached between calls: each decision asks the authorities afresh.
/// Authority failures become denials.
pub struct IdentityGate {
    authority: Arc<dyn IdentityAuthority>,
}

impl IdentityGate {
    pub fn new(authority: Arc<dyn IdentityAuthority>) -> Self {
        IdentityGate { authority }
    }

    pub async fn authorize(&self, token: &str, namespace: &str, resource: &str, verb: Verb) -> IdentityDecision {
        let validation = match self.authority.validate_token(token).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Token validation failed, treating caller as unauthenticated: {}", e);
                return IdentityDecision::unauthenticated(Principal::default());
            }
        };
        if !validation.authenticated {
            debug!("Token for '{}' was not authenticated", validation.principal.username);
            return IdentityDecision::unauthenticated(validation.principal);
        }
        let principal = validation.principal;
        let authorized = match self.authority.review_access(&principal, namespace, resource, verb).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!("Access review for {} failed, denying: {}", principal.username, e);
                false
            }
        };
        if !authorized {
            debug!("{} denied {} {} in {}", principal.username, verb, resource, namespace);
        }
        IdentityDecision {
            authenticated: true,
            authorized,
            principal,
        }
    }
}
