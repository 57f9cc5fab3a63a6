pub mod controller;
pub mod fetcher;
pub mod record;
pub mod state;

pub use controller::{
    ProviderOptions, VersionError, VersionHandle, VersionProvider, VersionSnapshot,
    DEFAULT_CHECK_INTERVAL,
};
pub use fetcher::{FetchError, HttpVersionFetcher, VersionFetcher, DEFAULT_VERSION_ENDPOINT};
pub use record::{is_update, VersionRecord};
pub use state::{ReconciliationState, ReconciliationStatus};

/// Identity baked into this binary by `rzd build` through `RZD_*` variables.
/// Outside such a build the id is empty, so any published build reads as newer.
pub fn compiled_identity() -> VersionRecord {
    let owned = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);

    VersionRecord {
        version: option_env!("RZD_VERSION")
            .unwrap_or(env!("CARGO_PKG_VERSION"))
            .to_string(),
        commit: owned(option_env!("RZD_COMMIT")),
        commit_author: owned(option_env!("RZD_COMMIT_AUTHOR")),
        commit_message: owned(option_env!("RZD_COMMIT_MESSAGE")),
        build_time: option_env!("RZD_BUILD_TIME").unwrap_or_default().to_string(),
        build_id: option_env!("RZD_BUILD_ID").unwrap_or_default().to_string(),
    }
}
