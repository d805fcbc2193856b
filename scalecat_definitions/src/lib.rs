#![recursion_limit = "1024"]
#![allow(renamed_and_removed_lints)]
#![allow(non_snake_case)]

#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate serde_yaml;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate maplit;

#[macro_use]
extern crate error_chain;
error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }
    links {}
    foreign_links {
        Fmt(::std::fmt::Error);
        Io(::std::io::Error) #[cfg(unix)];
        SerdeY(serde_yaml::Error);
        SerdeJ(serde_json::Error);
    }
    errors {
        InvalidDomain(name: String) {
            description("domain does not validate")
            display("domain {} does not validate", &name)
        }
        DuplicateCluster(cluster: String) {
            description("cluster listed more than once")
            display("cluster '{}' is listed more than once", &cluster)
        }
    }
}

/// The Domain custom resource
pub mod domain;
pub use domain::{Domain, DomainSpec, DomainStatus};

/// Per-cluster settings inside a domain
pub mod cluster;
pub use cluster::ClusterSpec;

/// Observed topology of a running domain
pub mod topology;
pub use topology::{ClusterTopology, TopologySnapshot};
