//! Remote product catalog client.
//!
//! Resolves a vendor part number into the ordered list of component UUIDs
//! the generation library needs: symbol records first, the footprint record
//! last.
//!
//! # Example
//!
//! ```ignore
//! use jlcpart::catalog::{CatalogClient, CatalogLookup, LookupOutcome, PartIdentifier};
//! use jlcpart::http::ReqwestClient;
//!
//! let client = CatalogClient::new(ReqwestClient::new("jlcpart")?);
//! match client.lookup(&PartIdentifier::new("C326215")?)? {
//!     LookupOutcome::Found(response) => println!("footprint {}", response.footprint_uuid()),
//!     LookupOutcome::NotFound => println!("no such part"),
//! }
//! ```

mod client;
mod part;
mod types;

pub use client::{CatalogClient, CatalogError, CatalogLookup, DEFAULT_CATALOG_URL};
pub use part::{EmptyPartIdentifier, PartIdentifier};
pub use types::{CatalogEntry, CatalogResponse, LookupOutcome};
