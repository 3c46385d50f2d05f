//! User selection for single and bulk user reads

use crate::error::{Error, Result};

/// One user, by numeric id or by screen name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(u64),
    ScreenName(String),
}

impl UserRef {
    /// Request parameter identifying this user.
    pub fn param(&self) -> (&'static str, String) {
        match self {
            UserRef::Id(id) => ("user_id", id.to_string()),
            UserRef::ScreenName(name) => ("screen_name", name.clone()),
        }
    }
}

/// Users to fetch in bulk, by exactly one kind of identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSelector {
    Ids(Vec<u64>),
    ScreenNames(Vec<String>),
}

impl UserSelector {
    /// Validate the loose two-list form: exactly one list present and non-empty.
    pub fn from_params(user_ids: Option<Vec<u64>>, screen_names: Option<Vec<String>>) -> Result<Self> {
        let selector = match (user_ids, screen_names) {
            (Some(ids), None) => UserSelector::Ids(ids),
            (None, Some(names)) => UserSelector::ScreenNames(names),
            (Some(_), Some(_)) => {
                return Err(Error::InvalidArgument(
                    "pass either user_ids or screen_names, not both".into(),
                ));
            }
            (None, None) => {
                return Err(Error::InvalidArgument(
                    "one of user_ids or screen_names is required".into(),
                ));
            }
        };
        if selector.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "{} must not be empty",
                selector.list_name()
            )));
        }
        Ok(selector)
    }

    /// Request parameter the joined batch is sent under.
    pub fn param_name(&self) -> &'static str {
        match self {
            UserSelector::Ids(_) => "user_id",
            UserSelector::ScreenNames(_) => "screen_name",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            UserSelector::Ids(ids) => ids.len(),
            UserSelector::ScreenNames(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers as request values, in the caller's order.
    pub fn into_values(self) -> Vec<String> {
        match self {
            UserSelector::Ids(ids) => ids.into_iter().map(|id| id.to_string()).collect(),
            UserSelector::ScreenNames(names) => names,
        }
    }

    fn list_name(&self) -> &'static str {
        match self {
            UserSelector::Ids(_) => "user_ids",
            UserSelector::ScreenNames(_) => "screen_names",
        }
    }
}
