//! Address resolution: turns typed text or shared coordinates into ranked
//! place candidates.

pub mod google;

use async_trait::async_trait;

use crate::conversation::state::{AddressCandidate, Coordinates};
use crate::error::ResolverError;

pub use google::GooglePlacesResolver;

/// What the user gave us to look up.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressQuery {
    Text(String),
    Coordinates(Coordinates),
}

impl std::fmt::Display for AddressQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Coordinates(c) => write!(f, "{},{}", c.lat, c.lng),
        }
    }
}

/// Place search backend.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Candidates in rank order, possibly empty.
    async fn resolve(&self, query: &AddressQuery) -> Result<Vec<AddressCandidate>, ResolverError>;
}

/// Resolve, treating any backend error as zero results.
pub async fn resolve_or_empty(
    resolver: &dyn AddressResolver,
    query: &AddressQuery,
) -> Vec<AddressCandidate> {
    match resolver.resolve(query).await {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!(query = %query, error = %e, "Address lookup failed");
            Vec::new()
        }
    }
}
