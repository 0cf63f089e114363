//! Admin session flag helpers.
//!
//! The admin mode can be entered once through an `admin=true` query
//! parameter on the page location. Logging out strips that parameter again so
//! a reload does not silently re-enter admin mode.

use url::Url;

/// Query parameter that switches admin mode on for one page load.
pub const ADMIN_QUERY_PARAM: &str = "admin";

/// Whether the first `admin` parameter on `location` is `true`.
///
/// Later repeats are ignored, so `?admin=false&admin=true` does not count.
pub fn admin_requested(location: &Url) -> bool {
    location
        .query_pairs()
        .find(|(key, _)| key == ADMIN_QUERY_PARAM)
        .is_some_and(|(_, value)| value == "true")
}

/// Copy of `location` with every `admin` query parameter removed.
///
/// Other parameters keep their order. A query left empty is dropped
/// entirely rather than leaving a trailing `?`.
pub fn strip_admin_param(location: &Url) -> Url {
    let kept: Vec<(String, String)> = location
        .query_pairs()
        .filter(|(key, _)| key != ADMIN_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut stripped = location.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}
