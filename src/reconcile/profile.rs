//! Profile game list fetch.

use std::fmt;

use tracing::{error, info};

use super::ReconcileError;
use crate::catalog::PageFetcher;

/// Default community site base address
pub const DEFAULT_COMMUNITY_URL: &str = "https://steamcommunity.com";

/// Minimum path segments of a readable profile games page
/// (`/id/<name>/games/`). Private profiles redirect to a shorter address.
const MIN_PROFILE_SEGMENTS: usize = 3;

/// Which profile to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    /// Custom profile name (`/id/<name>`)
    CustomUrl(String),

    /// 64-bit account id (`/profiles/<id>`)
    AccountId(i64),
}

impl ProfileSource {
    /// Interpret user input: an all-digit value is an account id, anything
    /// else a custom profile name
    pub fn from_input(input: &str) -> Self {
        let input = input.trim();
        match input.parse::<i64>() {
            Ok(id) if id > 0 && input.bytes().all(|b| b.is_ascii_digit()) => Self::AccountId(id),
            _ => Self::CustomUrl(input.to_string()),
        }
    }

    fn profile_path(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        match self {
            Self::CustomUrl(name) => format!("{}/id/{}", base, name),
            Self::AccountId(id) => format!("{}/profiles/{}", base, id),
        }
    }

    /// Address of the HTML games page
    pub fn html_url(&self, base: &str) -> String {
        format!("{}/games/?tab=all", self.profile_path(base))
    }
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CustomUrl(name) => write!(f, "id/{}", name),
            Self::AccountId(id) => write!(f, "profiles/{}", id),
        }
    }
}

/// Fetch a profile page and return its text.
///
/// Fails with [`ReconcileError::ProfileAccess`] when the profile redirected
/// away (not public).
pub async fn fetch_profile_page<F>(fetcher: &F, url: &str) -> Result<String, ReconcileError>
where
    F: PageFetcher + ?Sized,
{
    info!(%url, "Downloading profile game list");

    let page = fetcher.fetch(url).await.map_err(|e| {
        error!(error = %e, "Exception downloading profile game list");
        ReconcileError::from(e)
    })?;

    if page.segments().len() < MIN_PROFILE_SEGMENTS {
        error!(final_url = %page.url, "Specified profile is not public");
        return Err(ReconcileError::ProfileAccess(url.to_string()));
    }

    info!(%url, bytes = page.body.len(), "Downloaded profile game list");
    Ok(page.body)
}
