//! # Domain Models
//!
//! Canonical domain types shared by every legal research adapter.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Jurisdiction`] | Validated query jurisdiction code (`us`, `us-ca`) |
//! | [`JurisdictionPattern`] | Adapter-declared jurisdiction entry, optionally wildcarded |
//! | [`SearchResult`] | One authority returned by a search |
//! | [`UpdateNotice`] | Change notification from an update feed |
//! | [`ParsedCitation`] | Volume/reporter/page components of a citation |
//! | [`DateRange`] | Inclusive date window |
//! | [`UtcDateTime`] | UTC timestamp |

mod jurisdiction;
mod models;
mod timestamp;

pub use jurisdiction::{Jurisdiction, JurisdictionPattern};
pub use models::{
    CitationFormat, CitationValidation, DateRange, ParsedCitation, SearchResult, UpdateKind,
    UpdateNotice,
};
pub use timestamp::UtcDateTime;
