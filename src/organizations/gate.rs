//! Organization authorization checks.
//!
//! Every protected route asks one of two questions: is the caller a member of
//! the organization, or an admin of it. The organization is named by a route
//! parameter that some routes call `orgId` and others `id`; both are accepted
//! through a single normalization step.

use super::error::{OrganizationError, Result};
use super::logos::UrlSigner;
use super::repository::OrganizationStore;
use super::storage::TableStore;
use super::types::{Membership, OrgRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Organization identifier taken from route parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrgRouteParams {
    org_name: Option<String>,
}

impl OrgRouteParams {
    /// Parameter names that carry the organization name, in priority order.
    pub const ALIASES: [&'static str; 2] = ["orgId", "id"];

    /// Pick the organization name out of a parameter map.
    ///
    /// The first alias with a non-blank value wins.
    pub fn from_map(params: &HashMap<String, String>) -> Self {
        let org_name = Self::ALIASES
            .iter()
            .filter_map(|alias| params.get(*alias))
            .find(|value| !value.trim().is_empty())
            .cloned();
        Self { org_name }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let params: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_map(&params)
    }

    /// Params naming `name` directly.
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_pairs([("orgId", name.into())])
    }

    pub fn org_name(&self) -> Option<&str> {
        self.org_name.as_deref()
    }

    fn require(&self) -> Result<&str> {
        self.org_name().ok_or(OrganizationError::MissingOrgIdentifier)
    }
}

/// Authenticated caller, verified upstream.
///
/// Authentication middleware inserts this into request extensions; the gate
/// trusts it as given.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub user_id: String,
    pub email: String,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

/// Member and admin checks over an [`OrganizationStore`].
///
/// Checks are read-only. Storage failures propagate unchanged and are never
/// reported as denials.
pub struct AuthorizationGate<T, S>
where
    T: TableStore + 'static,
    S: UrlSigner,
{
    store: Arc<OrganizationStore<T, S>>,
}

impl<T, S> Clone for AuthorizationGate<T, S>
where
    T: TableStore + 'static,
    S: UrlSigner,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T, S> AuthorizationGate<T, S>
where
    T: TableStore + 'static,
    S: UrlSigner,
{
    #[must_use]
    pub fn new(store: Arc<OrganizationStore<T, S>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &OrganizationStore<T, S> {
        &self.store
    }

    async fn membership(&self, caller: &CallerIdentity, org_name: &str) -> Result<Membership> {
        match self.store.get_membership(org_name, &caller.user_id).await? {
            Some(membership) => Ok(membership),
            None => {
                warn!(
                    org = %org_name,
                    user_id = %caller.user_id,
                    reason = "not_member",
                    "Organization access denied"
                );
                Err(OrganizationError::NotMember {
                    name: org_name.to_string(),
                })
            }
        }
    }

    /// Require the caller to be a member (or admin) of the named organization.
    ///
    /// # Errors
    ///
    /// - `MissingOrgIdentifier` if no organization parameter was supplied
    /// - `NotMember` if the caller has no relationship with the organization
    #[instrument(skip(self, caller, params), fields(user_id = %caller.user_id, org = ?params.org_name()))]
    pub async fn check_org_member(
        &self,
        caller: &CallerIdentity,
        params: &OrgRouteParams,
    ) -> Result<Membership> {
        let org_name = params.require()?;
        let membership = self.membership(caller, org_name).await?;
        debug!(role = %membership.role, "Membership verified");
        Ok(membership)
    }

    /// Require the caller to be an admin of the named organization.
    ///
    /// # Errors
    ///
    /// - `MissingOrgIdentifier` if no organization parameter was supplied
    /// - `NotMember` if the caller has no relationship with the organization
    /// - `NotAdmin` if the caller is a member without the admin role
    #[instrument(skip(self, caller, params), fields(user_id = %caller.user_id, org = ?params.org_name()))]
    pub async fn check_org_admin(
        &self,
        caller: &CallerIdentity,
        params: &OrgRouteParams,
    ) -> Result<Membership> {
        let org_name = params.require()?;
        let membership = self.membership(caller, org_name).await?;

        if !membership.role.has_at_least(&OrgRole::Admin) {
            warn!(
                org = %org_name,
                user_id = %caller.user_id,
                role = %membership.role,
                reason = "not_admin",
                "Organization admin access denied"
            );
            return Err(OrganizationError::NotAdmin {
                name: org_name.to_string(),
            });
        }

        debug!("Admin verified");
        Ok(membership)
    }
}
