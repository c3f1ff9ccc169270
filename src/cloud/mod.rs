//! DF-020: Remote compute API abstraction.
//!
//! The orchestrator only needs three operations; the trait keeps HTTP out of
//! the core and lets tests substitute a scripted fake.

pub mod digitalocean;

use crate::core::error::Result;
use crate::core::types::{Droplet, DropletSpec, ResolvedToken};

/// HTTP status of a delete the provider accepted.
pub const DELETE_ACCEPTED: u16 = 204;

/// HTTP status of a delete for a droplet that no longer exists.
pub const DELETE_NOT_FOUND: u16 = 404;

/// The three droplet operations the lifecycle uses.
pub trait ComputeApi {
    /// `POST /droplets`
    fn create_droplet(&self, token: &ResolvedToken, spec: &DropletSpec) -> Result<Droplet>;

    /// `GET /droplets/{id}`
    fn get_droplet(&self, token: &ResolvedToken, id: u64) -> Result<Droplet>;

    /// `DELETE /droplets/{id}`; returns the raw status code.
    fn delete_droplet(&self, token: &ResolvedToken, id: u64) -> Result<u16>;
}
