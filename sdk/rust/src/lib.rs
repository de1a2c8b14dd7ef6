//! Client for the threat-lookup gateway's JSON interface.

mod client;

pub use client::{
    ClientError, FindThreatMatchesResponse, GatewayClient, ListThreatListsResponse, StatusReport,
    ThreatListDescriptor, ThreatMatch,
};
