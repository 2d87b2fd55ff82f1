//! The DHCPv6 client REQUEST/REPLY exchange engine.
//!
//! The engine takes the servers collected during discovery, requests the
//! advertised leases from the best one, retransmits with the RFC 3315 backoff,
//! fails over to the next server on exhaustion and stores the leases of the
//! REPLY in the lease database.
//!
//! Sockets, timers and the discovery phase belong to the embedding
//! application: it feeds `Client::on_tick` and `Client::on_reply_received`.

#[macro_use]
extern crate log;

#[macro_use]
mod macros;

mod backoff;
mod builder;
mod candidates;
mod client;
mod config;
mod context;
mod error;
mod lease;
mod reconciler;
mod request;
mod storage;
mod storage_ram;
mod transport;

pub use self::{
    backoff::{Backoff, Tick, Timing},
    builder::MessageBuilder,
    candidates::{Candidate, CandidateList},
    client::{Client, ExchangeHandle},
    config::{ConfigManager, ConfigState, IaConfig, IaKind, InterfaceConfig, Settings, StaticConfig},
    context::Context,
    error::Error,
    lease::{Lease, LeaseIa},
    reconciler::{LeaseReconciler, Reconciliation},
    request::{Progress, RequestExchange, State},
    storage::Storage,
    storage_ram::RamStorage,
    transport::{Destination, Transport},
};
