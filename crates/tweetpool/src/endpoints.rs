//! Remote endpoints and their per-credential quotas

use std::collections::HashMap;
use std::time::Duration;

use token_pool::FamilyLimit;
use transport::Endpoint;

pub const USERS_SHOW: Endpoint = Endpoint::get("users/show.json", "/users/show");
pub const USERS_LOOKUP: Endpoint = Endpoint::get("users/lookup.json", "/users/lookup");
pub const USER_TIMELINE: Endpoint =
    Endpoint::get("statuses/user_timeline.json", "/statuses/user_timeline");
pub const HOME_TIMELINE: Endpoint =
    Endpoint::get("statuses/home_timeline.json", "/statuses/home_timeline");
pub const FRIENDS_IDS: Endpoint = Endpoint::get("friends/ids.json", "/friends/ids");
pub const FOLLOWERS_IDS: Endpoint = Endpoint::get("followers/ids.json", "/followers/ids");
pub const STATUSES_UPDATE: Endpoint = Endpoint::post("statuses/update.json", "/statuses/update");

/// User-context limits per 15-minute window; posting is counted over 3 hours.
pub fn default_family_limits() -> HashMap<String, FamilyLimit> {
    [
        (USERS_SHOW, FamilyLimit::per_window(900)),
        (USERS_LOOKUP, FamilyLimit::per_window(900)),
        (USER_TIMELINE, FamilyLimit::per_window(900)),
        (HOME_TIMELINE, FamilyLimit::per_window(15)),
        (FRIENDS_IDS, FamilyLimit::per_window(15)),
        (FOLLOWERS_IDS, FamilyLimit::per_window(15)),
        (
            STATUSES_UPDATE,
            FamilyLimit::new(300, Duration::from_secs(3 * 60 * 60)),
        ),
    ]
    .into_iter()
    .map(|(endpoint, limit)| (endpoint.family.to_string(), limit))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_endpoint_has_a_default_limit() {
        let limits = default_family_limits();
        for endpoint in [
            USERS_SHOW,
            USERS_LOOKUP,
            USER_TIMELINE,
            HOME_TIMELINE,
            FRIENDS_IDS,
            FOLLOWERS_IDS,
            STATUSES_UPDATE,
        ] {
            assert!(limits.contains_key(endpoint.family), "{} missing", endpoint.family);
        }
    }

    #[test]
    fn posting_uses_three_hour_window() {
        let limit = default_family_limits()[STATUSES_UPDATE.family];
        assert_eq!(limit.limit, 300);
        assert_eq!(limit.period, Duration::from_secs(10_800));
    }
}
