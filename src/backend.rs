use futures::future::try_join_all;
use std::sync::Arc;

use super::{ErrorKind, Result, TopologySnapshot};
use crate::{
    auth::{IdentityAuthority, IdentityGate, Principal, Verb, DOMAINS},
    config::BackendConfig,
    mutator::Mutator,
    planner,
    store::{DomainIdentity, DomainStore},
    topology::{TopologyCache, TopologyRetriever},
};

/// Everything shared between requests
///
/// Build once, then hand an `Arc` of it to a `RestBackend` per request.
pub struct BackendContext {
    config: BackendConfig,
    store: Arc<dyn DomainStore>,
    gate: IdentityGate,
    topology: TopologyCache,
}

impl BackendContext {
    pub fn new(
        config: BackendConfig,
        store: Arc<dyn DomainStore>,
        authority: Arc<dyn IdentityAuthority>,
        retriever: Arc<dyn TopologyRetriever>,
    ) -> Self {
        info!("Managing domains in {}", config.target_namespaces.join(", "));
        BackendContext {
            config,
            store,
            gate: IdentityGate::new(authority),
            topology: TopologyCache::new(retriever),
        }
    }

    pub fn topology_cache(&self) -> &TopologyCache {
        &self.topology
    }
}

/// The scaling backend as seen by one caller
///
/// Every operation passes the identity gate before touching the store,
/// and a denial never reads or writes anything.
pub struct RestBackend {
    ctx: Arc<BackendContext>,
    token: String,
}

impl RestBackend {
    pub fn new(ctx: Arc<BackendContext>, token: &str) -> Self {
        RestBackend {
            ctx,
            token: token.to_string(),
        }
    }

    fn ensure_managed(&self, namespace: &str) -> Result<()> {
        if !self.ctx.config.manages(namespace) {
            bail!(ErrorKind::NamespaceNotManaged(namespace.into()));
        }
        Ok(())
    }

    async fn authorize(&self, namespace: &str, verb: Verb) -> Result<Principal> {
        self.ctx
            .gate
            .authorize(&self.token, namespace, DOMAINS, verb)
            .await
            .into_result(namespace, verb)
    }

    /// Read-modify-write machinery for this backend's store
    pub fn mutator(&self) -> Mutator<'_> {
        Mutator::new(
            self.ctx.store.as_ref(),
            self.ctx.config.conflict_retries,
            self.ctx.config.capacity_check,
        )
    }

    /// Scale a cluster of a domain to `replicas` managed servers
    ///
    /// Returns whether the domain had to be changed.
    pub async fn scale_cluster(&self, id: &DomainIdentity, cluster: &str, replicas: i32) -> Result<bool> {
        planner::validate_replicas(replicas)?;
        self.ensure_managed(&id.namespace)?;
        let principal = self.authorize(&id.namespace, Verb::Update).await?;
        debug!("{} scaling {} of {} to {}", principal.username, cluster, id, replicas);
        let topology = self.ctx.topology.get(&id.namespace, &id.uid);
        self.mutator().apply(id, cluster, replicas, &topology).await
    }

    /// Latest scanned topology of a domain; empty when there is no scan
    pub async fn get_topology(&self, id: &DomainIdentity) -> Result<TopologySnapshot> {
        self.ensure_managed(&id.namespace)?;
        self.authorize(&id.namespace, Verb::Get).await?;
        Ok(self.ctx.topology.get(&id.namespace, &id.uid))
    }

    /// Every domain in the managed namespaces
    ///
    /// All namespaces are authorized before any of them are listed.
    pub async fn domains(&self) -> Result<Vec<DomainIdentity>> {
        let namespaces = &self.ctx.config.target_namespaces;
        for ns in namespaces {
            self.authorize(ns, Verb::List).await?;
        }
        let store = &self.ctx.store;
        let lists = try_join_all(namespaces.iter().map(|ns| store.list(ns))).await?;
        let mut res = namespaces
            .iter()
            .zip(lists)
            .flat_map(|(ns, ds)| ds.into_iter().map(move |d| DomainIdentity::new(ns, &d.uid())))
            .collect::<Vec<_>>();
        res.sort();
        res.dedup();
        Ok(res)
    }

    /// Uids of every domain in the managed namespaces
    pub async fn domain_uids(&self) -> Result<Vec<String>> {
        let mut uids = self.domains().await?.into_iter().map(|d| d.uid).collect::<Vec<_>>();
        uids.sort();
        uids.dedup();
        Ok(uids)
    }

    pub async fn is_domain_uid(&self, uid: &str) -> Result<bool> {
        Ok(self.domains().await?.iter().any(|d| d.uid == uid))
    }

    /// Resolve a bare uid to the namespace holding it
    pub async fn find_domain(&self, uid: &str) -> Result<DomainIdentity> {
        self.domains()
            .await?
            .into_iter()
            .find(|d| d.uid == uid)
            .ok_or_else(|| ErrorKind::DomainNotFound(uid.into()).into())
    }

    /// Names of the clusters found by the latest scan
    pub async fn clusters(&self, id: &DomainIdentity) -> Result<Vec<String>> {
        Ok(self.get_topology(id).await?.cluster_names())
    }

    pub async fn is_cluster(&self, id: &DomainIdentity, cluster: &str) -> Result<bool> {
        Ok(self.get_topology(id).await?.cluster(cluster).is_some())
    }
}
