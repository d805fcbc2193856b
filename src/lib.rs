#![recursion_limit = "1024"]
#![allow(renamed_and_removed_lints)]
#![warn(rust_2018_idioms)]

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;

#[macro_use]
extern crate error_chain;
error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }
    links {
        Definitions(scalecat_definitions::Error, scalecat_definitions::ErrorKind);
    }
    foreign_links {
        Io(::std::io::Error) #[cfg(unix)];
        Int(::std::num::ParseIntError);
        SerdeY(serde_yaml::Error);
        SerdeJ(serde_json::Error);
    }
    errors {
        InvalidReplicaCount(count: i32) {
            description("invalid replica count")
            display("replica count {} must not be negative", count)
        }
        ReplicaCountAboveCapacity(cluster: String, requested: i32, max: usize) {
            description("replica count above cluster capacity")
            display("requested {} replicas of {} but it only has {} servers", requested, &cluster, max)
        }
        Unauthenticated {
            description("caller could not be authenticated")
            display("caller could not be authenticated")
        }
        Forbidden(principal: String, verb: String, namespace: String) {
            description("caller is not allowed to perform this action")
            display("{} may not {} domains in {}", &principal, &verb, &namespace)
        }
        AuthorityFailure(msg: String) {
            description("identity authority gave an unusable answer")
            display("identity authority failure: {}", &msg)
        }
        NamespaceNotManaged(ns: String) {
            description("namespace is not managed")
            display("namespace {} is not managed by this backend", &ns)
        }
        DomainNotFound(uid: String) {
            description("domain not found")
            display("domain {} not found", &uid)
        }
        Conflict(uid: String, attempts: u32) {
            description("domain was modified concurrently")
            display("domain {} kept changing underneath {} write attempts", &uid, attempts)
        }
        StoreFailure(msg: String) {
            description("domain store failure")
            display("domain store failure: {}", &msg)
        }
        KubeError(e: kube::Error) {
            description("kube api error")
            display("kube api error: {}", e)
        }
        MissingTargetNamespaces {
            description("TARGET_NAMESPACES not specified")
            display("TARGET_NAMESPACES not specified")
        }
        InvalidConfig(msg: String) {
            description("invalid backend configuration")
            display("invalid backend configuration: {}", &msg)
        }
    }
}

use http::StatusCode;

impl Error {
    /// Caller facing classification of a failure
    ///
    /// This is the only place internal errors are mapped onto what a REST layer returns.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidReplicaCount(_) | ErrorKind::ReplicaCountAboveCapacity(..) => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden(..) => StatusCode::FORBIDDEN,
            ErrorKind::DomainNotFound(_) | ErrorKind::NamespaceNotManaged(_) => StatusCode::NOT_FOUND,
            ErrorKind::Conflict(..) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub use scalecat_definitions::{ClusterSpec, Domain, DomainSpec, TopologySnapshot};

/// Backend configuration from evars or yaml
pub mod config;
pub use config::BackendConfig;

/// Caller authentication and authorization
pub mod auth;
pub use auth::{IdentityAuthority, IdentityDecision, IdentityGate, Principal, TokenValidation, Verb};

/// Versioned domain storage
pub mod store;
pub use store::{DomainIdentity, DomainStore, MemoryStore, ReplaceOutcome, ResourceVersion, Versioned};

/// Cached topology lookups
pub mod topology;
pub use topology::{ScanRepository, TopologyCache, TopologyRetriever};

/// Pure scaling decisions
pub mod planner;
pub use planner::{CapacityCheck, ScalePlan};

/// Conflict aware read-modify-write of domains
pub mod mutator;
pub use mutator::Mutator;

/// Kubernetes implementations of the store and the identity authority
pub mod kubeapi;
pub use kubeapi::{KubeAuthority, KubeDomainStore};

/// The operations exposed to a REST layer
pub mod backend;
pub use backend::{BackendContext, RestBackend};
