use async_trait::async_trait;
use k8s_openapi::api::{
    authentication::v1::{TokenReview, TokenReviewSpec},
    authorization::v1::{ResourceAttributes, SubjectAccessReview, SubjectAccessReviewSpec},
};
use kube::{
    api::{Api, ListParams, PostParams},
    client::APIClient,
};

use super::{Domain, ErrorKind, Result};
use crate::{
    auth::{IdentityAuthority, Principal, TokenValidation, Verb},
    store::{DomainStore, ReplaceOutcome, ResourceVersion, Versioned},
};

/// API group of the domain CRD
const DOMAIN_GROUP: &str = "weblogic.oracle";

/// Client creator
///
/// In-cluster config first, falling back to the local kube config for development.
pub async fn make_client() -> Result<APIClient> {
    let config = if let Ok(cfg) = kube::config::incluster_config() {
        cfg
    } else {
        kube::config::load_kube_config()
            .await
            .map_err(ErrorKind::KubeError)?
    };
    Ok(APIClient::new(config))
}

/// Http status carried by an api error, if that is what it is
fn api_code(e: &kube::Error) -> Option<u16> {
    match e {
        kube::Error::Api(ae) => Some(ae.code),
        _ => None,
    }
}

/// Domain custom resources via the kube api
#[derive(Clone)]
pub struct KubeDomainStore {
    client: APIClient,
}

impl KubeDomainStore {
    pub fn new(client: APIClient) -> Self {
        KubeDomainStore { client }
    }

    fn api(&self, namespace: &str) -> Api<Domain> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl DomainStore for KubeDomainStore {
    async fn list(&self, namespace: &str) -> Result<Vec<Domain>> {
        let lp = ListParams::default();
        let domains = self.api(namespace).list(&lp).await.map_err(ErrorKind::KubeError)?;
        debug!("Found {} domains in {}", domains.items.len(), namespace);
        Ok(domains.items)
    }

    async fn get(&self, namespace: &str, uid: &str) -> Result<Versioned<Domain>> {
        // resources are normally named after their uid
        let named = match self.api(namespace).get(uid).await {
            Ok(d) => Some(d),
            Err(e) if api_code(&e) == Some(404) => None,
            Err(e) => bail!(ErrorKind::KubeError(e)),
        };
        let domain = match named {
            Some(d) if d.uid() == uid => d,
            _ => {
                debug!("No domain named {} in {}, searching by uid", uid, namespace);
                self.list(namespace)
                    .await?
                    .into_iter()
                    .find(|d| d.uid() == uid)
                    .ok_or_else(|| ErrorKind::DomainNotFound(uid.into()))?
            }
        };
        Versioned::read(domain)
    }

    async fn replace(&self, namespace: &str, domain: &Domain, version: &ResourceVersion) -> Result<ReplaceOutcome> {
        let mut data = domain.clone();
        data.metadata.resource_version = Some(version.to_string());
        let pp = PostParams::default();
        match self.api(namespace).replace(&domain.name(), &pp, &data).await {
            Ok(o) => Ok(ReplaceOutcome::Replaced(Versioned::read(o)?)),
            Err(e) if api_code(&e) == Some(409) => {
                debug!("Replace of {} at {} conflicted", domain.uid(), version);
                Ok(ReplaceOutcome::Conflict)
            }
            Err(e) if api_code(&e) == Some(404) => bail!(ErrorKind::DomainNotFound(domain.uid())),
            Err(e) => bail!(ErrorKind::KubeError(e)),
        }
    }
}

/// TokenReview and SubjectAccessReview backed identity authority
#[derive(Clone)]
pub struct KubeAuthority {
    client: APIClient,
}

impl KubeAuthority {
    pub fn new(client: APIClient) -> Self {
        KubeAuthority { client }
    }
}

#[async_trait]
impl IdentityAuthority for KubeAuthority {
    async fn validate_token(&self, token: &str) -> Result<TokenValidation> {
        let reviews: Api<TokenReview> = Api::all(self.client.clone());
        let pp = PostParams::default();

        let mut review = TokenReview::default();
        review.spec = TokenReviewSpec {
            token: Some(token.to_string()),
            audiences: None,
        };
        let o = reviews.create(&pp, &review).await.map_err(ErrorKind::KubeError)?;

        let status = o
            .status
            .ok_or_else(|| ErrorKind::AuthorityFailure("token review without status".into()))?;
        if let Some(err) = &status.error {
            debug!("token review error: {}", err);
        }
        let user = status.user.unwrap_or_default();
        Ok(TokenValidation {
            authenticated: status.authenticated.unwrap_or(false),
            principal: Principal {
                username: user.username.unwrap_or_default(),
                uid: user.uid,
                groups: user.groups.unwrap_or_default(),
            },
        })
    }

    async fn review_access(&self, principal: &Principal, namespace: &str, resource: &str, verb: Verb) -> Result<bool> {
        let reviews: Api<SubjectAccessReview> = Api::all(self.client.clone());
        let pp = PostParams::default();

        let mut review = SubjectAccessReview::default();
        review.spec = SubjectAccessReviewSpec {
            user: Some(principal.username.clone()),
            uid: principal.uid.clone(),
            groups: Some(principal.groups.clone()),
            resource_attributes: Some(ResourceAttributes {
                group: Some(DOMAIN_GROUP.into()),
                namespace: Some(namespace.into()),
                resource: Some(resource.into()),
                verb: Some(verb.to_string()),
                name: None,
                subresource: None,
                version: None,
            }),
            non_resource_attributes: None,
            extra: None,
        };
        let o = reviews.create(&pp, &review).await.map_err(ErrorKind::KubeError)?;

        let status = o
            .status
            .ok_or_else(|| ErrorKind::AuthorityFailure("access review without status".into()))?;
        if let Some(reason) = status.reason {
            debug!("access review reason: {}", reason);
        }
        Ok(status.allowed)
    }
}
