//! dropform: a minimal Terraform-style front end for one DigitalOcean droplet.
//!
//! Parses `variable`, `provider`, and `resource` blocks, then plans, creates,
//! or destroys the droplet and keeps a local record of it.

pub mod cli;
pub mod cloud;
pub mod core;
pub mod transport;
pub mod tripwire;
