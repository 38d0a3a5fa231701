//! Built-in research adapters.
//!
//! | Adapter | Category | Coverage | Cost |
//! |---------|----------|----------|------|
//! | [`CourtListenerAdapter`] | open source | US federal and state case law | free |
//! | [`GovInfoAdapter`] | government | US Code, CFR, Federal Register | free |
//! | [`WestlawAdapter`] | commercial | US case law, statutes, regulations | per query |

mod courtlistener;
mod govinfo;
mod westlaw;

pub use courtlistener::CourtListenerAdapter;
pub use govinfo::GovInfoAdapter;
pub use westlaw::WestlawAdapter;

use std::time::Instant;

use serde::de::DeserializeOwned;
use time::macros::format_description;
use time::Date;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};

/// Runs a request and maps transport failures and non-2xx statuses to source errors.
async fn execute(
    client: &dyn HttpClient,
    source: &str,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    let response = client
        .execute(request)
        .await
        .map_err(|error| error.into_source_error(source))?;

    if !response.is_success() {
        return Err(response.status_error(source));
    }
    Ok(response)
}

fn decode<T: DeserializeOwned>(source: &str, response: &HttpResponse) -> Result<T, SourceError> {
    serde_json::from_str(&response.body).map_err(|error| {
        SourceError::unavailable(format!("{source} returned an unreadable payload: {error}"))
    })
}

/// Reads the `YYYY-MM-DD` prefix of a date or RFC3339 timestamp.
fn parse_date_prefix(value: &str) -> Option<Date> {
    let prefix = value.get(..10)?;
    Date::parse(prefix, format_description!("[year]-[month]-[day]")).ok()
}

fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
