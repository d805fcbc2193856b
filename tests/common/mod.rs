#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, Once,
};

use scalecat::{
    auth::TokenValidation, BackendConfig, BackendContext, Domain, DomainSpec, DomainStore, ErrorKind,
    IdentityAuthority, MemoryStore, Principal, ReplaceOutcome, ResourceVersion, Result, TopologyRetriever, TopologySnapshot, Verb,
    Versioned,
};

pub const NS: &str = "namespace1";
pub const UID: &str = "uid1";
pub const UID2: &str = "uid2";
pub const TOKEN: &str = "token";

static START: Once = Once::new();

/// Route backend logs through the test harness
pub fn setup() {
    START.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Identity authority with canned answers that counts how often it is asked
#[derive(Default)]
pub struct CountingAuthority {
    pub reject_tokens: bool,
    pub deny_access: bool,
    pub broken: bool,
    validations: AtomicUsize,
    reviews: AtomicUsize,
}

impl CountingAuthority {
    pub fn allowing() -> Self {
        CountingAuthority::default()
    }

    pub fn unauthenticated() -> Self {
        CountingAuthority {
            reject_tokens: true,
            ..CountingAuthority::default()
        }
    }

    pub fn forbidding() -> Self {
        CountingAuthority {
            deny_access: true,
            ..CountingAuthority::default()
        }
    }

    pub fn broken() -> Self {
        CountingAuthority {
            broken: true,
            ..CountingAuthority::default()
        }
    }

    pub fn validations(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }

    pub fn reviews(&self) -> usize {
        self.reviews.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityAuthority for CountingAuthority {
    async fn validate_token(&self, token: &str) -> Result<TokenValidation> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(ErrorKind::AuthorityFailure("connection refused".into()).into());
        }
        Ok(TokenValidation {
            authenticated: !self.reject_tokens && token == TOKEN,
            principal: Principal {
                username: "operator-admin".into(),
                ..Principal::default()
            },
        })
    }

    async fn review_access(&self, _: &Principal, _: &str, _: &str, _: Verb) -> Result<bool> {
        self.reviews.fetch_add(1, Ordering::SeqCst);
        Ok(!self.deny_access)
    }
}

/// A store where an outside writer gets in just before our writes to one domain
///
/// Each race modifies the domain through `race`, so the held version goes stale.
pub struct RacingStore {
    pub inner: MemoryStore,
    uid: String,
    races: Mutex<usize>,
    race: Box<dyn Fn(&mut DomainSpec) + Send + Sync>,
}

impl RacingStore {
    pub fn new<F>(inner: MemoryStore, uid: &str, races: usize, race: F) -> Self
    where
        F: Fn(&mut DomainSpec) + Send + Sync + 'static,
    {
        RacingStore {
            inner,
            uid: uid.to_string(),
            races: Mutex::new(races),
            race: Box::new(race),
        }
    }

    /// A store that always loses the race for `uid`
    pub fn always(inner: MemoryStore, uid: &str) -> Self {
        RacingStore::new(inner, uid, usize::MAX, |spec| {
            let gen = spec.other.get("restartVersion").and_then(|v| v.as_u64()).unwrap_or(0);
            spec.other.insert("restartVersion".into(), (gen + 1).into());
        })
    }

    fn take_race(&self) -> bool {
        let mut races = self.races.lock().unwrap();
        if *races > 0 {
            *races -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl DomainStore for RacingStore {
    async fn list(&self, namespace: &str) -> Result<Vec<Domain>> {
        self.inner.list(namespace).await
    }

    async fn get(&self, namespace: &str, uid: &str) -> Result<Versioned<Domain>> {
        self.inner.get(namespace, uid).await
    }

    async fn replace(&self, namespace: &str, domain: &Domain, version: &ResourceVersion) -> Result<ReplaceOutcome> {
        if domain.uid() == self.uid && self.take_race() {
            assert!(self.inner.update(namespace, &self.uid, |spec| (self.race)(spec)));
        }
        self.inner.replace(namespace, domain, version).await
    }
}

/// A store that fails like an unreachable api server
///
/// Reads still go through `inner` first so attempts show up in its counters.
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_reads: bool,
    replaces: AtomicUsize,
}

impl FailingStore {
    pub fn on_read(inner: MemoryStore) -> Self {
        FailingStore {
            inner,
            fail_reads: true,
            replaces: AtomicUsize::new(0),
        }
    }

    pub fn on_write(inner: MemoryStore) -> Self {
        FailingStore {
            inner,
            fail_reads: false,
            replaces: AtomicUsize::new(0),
        }
    }

    pub fn replaces(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DomainStore for FailingStore {
    async fn list(&self, namespace: &str) -> Result<Vec<Domain>> {
        self.inner.list(namespace).await
    }

    async fn get(&self, namespace: &str, uid: &str) -> Result<Versioned<Domain>> {
        let res = self.inner.get(namespace, uid).await?;
        if self.fail_reads {
            return Err(ErrorKind::StoreFailure("connection reset by peer".into()).into());
        }
        Ok(res)
    }

    async fn replace(&self, _: &str, _: &Domain, _: &ResourceVersion) -> Result<ReplaceOutcome> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        Err(ErrorKind::StoreFailure("503 service unavailable".into()).into())
    }
}

/// Retriever handing out one fixed answer for every domain
pub struct StaticTopology(pub Option<TopologySnapshot>);

impl TopologyRetriever for StaticTopology {
    fn get_topology(&self, _: &str, _: &str) -> Option<TopologySnapshot> {
        self.0.clone()
    }
}

/// Scan of a domain with one six server cluster
pub fn topology() -> TopologySnapshot {
    TopologySnapshot::new("domain").with_cluster("cluster1", &["ms1", "ms2", "ms3", "ms4", "ms5", "ms6"])
}

/// Two domains in the managed namespace
pub fn store_with(spec1: DomainSpec, spec2: DomainSpec) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(Domain::within(NS, "domain1", spec1));
    store.insert(Domain::within(NS, "domain2", spec2));
    store
}

pub fn store() -> MemoryStore {
    store_with(DomainSpec::with_uid(UID), DomainSpec::with_uid(UID2))
}

pub fn context<S>(store: Arc<S>, authority: Arc<CountingAuthority>, retries: u32) -> Arc<BackendContext>
where
    S: DomainStore + 'static,
{
    setup();
    let mut config = BackendConfig::new(vec![NS.to_string()]);
    config.conflict_retries = retries;
    Arc::new(BackendContext::new(
        config,
        store,
        authority,
        Arc::new(StaticTopology(Some(topology()))),
    ))
}
