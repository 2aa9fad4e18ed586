//! Organization store.
//!
//! Single-table persistence for organizations and user-organization
//! relationships, with logo URL regeneration on every read.

use super::error::{OrganizationError, Result};
use super::keys::{
    ORG_LISTING_PARTITION, ORG_PREFIX, USER_PREFIX, membership_index_key, membership_key,
    org_key, org_listing_key, org_partition, user_partition,
};
use super::logos::{BackfillError, KeyBackfill, LogoOutcome, LogoResolver, UrlSigner};
use super::storage::{
    AttributeChange, Cursor, IndexName, Item, PutCondition, Query, StoreError, TableStore,
    UpdateCondition, decode_item, encode_item,
};
use super::types::{Membership, OrgRole, Organization, OrganizationPage, OrganizationUpdate};
use super::update::UpdateBuilder;
use chrono::Utc;
use futures::future::{join_all, try_join_all};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Fixed page size of [`OrganizationStore::list_public_organizations`].
pub const PUBLIC_PAGE_SIZE: usize = 9;

fn storage(operation: &'static str) -> impl FnOnce(StoreError) -> OrganizationError {
    move |source| OrganizationError::storage(operation, source)
}

/// Organization store - generic over the table backend and URL signer.
///
/// Construct once per process and share by reference (or `Arc`) with the
/// authorization gate and route handlers.
///
/// # Example
///
/// ```rust,ignore
/// use photocomp::organizations::{HmacUrlSigner, InMemoryTable, OrganizationStore};
/// use std::sync::Arc;
///
/// let signer = HmacUrlSigner::from_config(&config.logos)?;
/// let store = OrganizationStore::new(Arc::new(InMemoryTable::new()), signer);
///
/// let org = store.get_organization_by_name("acme").await?;
/// ```
pub struct OrganizationStore<T, S>
where
    T: TableStore + 'static,
    S: UrlSigner,
{
    table: Arc<T>,
    resolver: LogoResolver<S>,
    backfill: KeyBackfill<T>,
}

impl<T, S> OrganizationStore<T, S>
where
    T: TableStore + 'static,
    S: UrlSigner,
{
    /// Create a store over `table`, signing logo URLs with `signer`.
    #[must_use]
    pub fn new(table: Arc<T>, signer: S) -> Self {
        Self {
            backfill: KeyBackfill::new(Arc::clone(&table)),
            resolver: LogoResolver::new(signer),
            table,
        }
    }

    /// Report background key persistence failures on `errors`.
    #[must_use]
    pub fn with_backfill_errors(mut self, errors: mpsc::UnboundedSender<BackfillError>) -> Self {
        self.backfill = self.backfill.with_error_channel(errors);
        self
    }

    /// Get a reference to the underlying table.
    pub fn table(&self) -> &T {
        &self.table
    }

    /// Get a reference to the logo resolver.
    pub fn resolver(&self) -> &LogoResolver<S> {
        &self.resolver
    }

    /// Refresh an organization's logo URL, scheduling key persistence when a
    /// key was recovered from a legacy URL.
    async fn resolve_logo(&self, org: &mut Organization) {
        if let LogoOutcome::Recovered { key, legacy_url } = self.resolver.resolve(org).await {
            // Detached; the read does not wait for it
            drop(self.backfill.submit(&org.name, &key, &legacy_url));
        }
    }

    async fn query_all(&self, mut query: Query, operation: &'static str) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        loop {
            let page = self.table.query(&query).await.map_err(storage(operation))?;
            items.extend(page.items);
            match page.last_evaluated {
                Some(cursor) => query = query.starting_after(Some(cursor)),
                None => break,
            }
        }
        Ok(items)
    }

    async fn fetch_organization(&self, name: &str, operation: &'static str) -> Result<Option<Organization>> {
        let key = org_key(name)?;
        let Some(item) = self.table.get_item(&key).await.map_err(storage(operation))? else {
            return Ok(None);
        };
        let mut org: Organization = decode_item(item).map_err(storage(operation))?;
        self.resolve_logo(&mut org).await;
        Ok(Some(org))
    }

    /// Insert a new organization.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if any organization already holds the name, compared
    /// case-insensitively.
    #[instrument(skip(self, org), fields(org.name = %org.name))]
    pub async fn create_organization(&self, org: &Organization) -> Result<()> {
        let item = encode_item(org, &org_key(&org.name)?, &org_listing_key(&org.name)?)
            .map_err(storage("create organization"))?;

        match self.table.put_item(item, PutCondition::IfNotExists).await {
            Ok(()) => {
                info!(org_id = %org.id, created_by = %org.created_by, "Organization created");
                Ok(())
            }
            Err(StoreError::ConditionalCheckFailed) => {
                debug!("Organization name already taken");
                Err(OrganizationError::already_exists(&org.name))
            }
            Err(e) => Err(OrganizationError::storage("create organization", e)),
        }
    }

    /// Grant or overwrite a membership.
    #[instrument(skip(self, membership), fields(org.name = %membership.org_name, user_id = %membership.user_id))]
    pub async fn create_membership(&self, membership: &Membership) -> Result<()> {
        let item = encode_item(
            membership,
            &membership_key(&membership.org_name, &membership.user_id)?,
            &membership_index_key(&membership.org_name, &membership.user_id)?,
        )
        .map_err(storage("create membership"))?;

        self.table
            .put_item(item, PutCondition::Always)
            .await
            .map_err(storage("create membership"))?;

        info!(role = %membership.role, "Membership granted");
        Ok(())
    }

    /// Create an organization and make its creator an admin.
    ///
    /// The creator is `org.created_by`. If the admin grant fails the
    /// organization record is removed again.
    #[instrument(skip(self, org, creator_email), fields(org.name = %org.name))]
    pub async fn register_organization(
        &self,
        org: Organization,
        creator_email: Option<&str>,
    ) -> Result<(Organization, Membership)> {
        self.create_organization(&org).await?;

        let mut membership = Membership::admin(&org.name, &org.created_by);
        if let Some(email) = creator_email {
            membership = membership.with_email(email);
        }

        if let Err(e) = self.create_membership(&membership).await {
            warn!(error = %e, "Admin grant failed, rolling back organization");
            if let Err(rollback) = self.table.delete_item(&org_key(&org.name)?).await {
                warn!(error = %rollback, "Rollback of organization failed");
            }
            return Err(e);
        }

        Ok((org, membership))
    }

    /// Look up an organization by name, refreshing its logo URL.
    ///
    /// Returns `Ok(None)` if no organization holds the name.
    #[instrument(skip(self))]
    pub async fn get_organization_by_name(&self, name: &str) -> Result<Option<Organization>> {
        self.fetch_organization(name, "get organization").await
    }

    /// Look up a user's relationship with an organization.
    ///
    /// `Ok(None)` means the user is not a member.
    #[instrument(skip(self))]
    pub async fn get_membership(&self, name: &str, user_id: &str) -> Result<Option<Membership>> {
        let key = membership_key(name, user_id)?;
        self.table
            .get_item(&key)
            .await
            .map_err(storage("get membership"))?
            .map(|item| decode_item(item).map_err(storage("get membership")))
            .transpose()
    }

    /// Every organization the user belongs to.
    ///
    /// Organization records are fetched concurrently. Relationships pointing at
    /// a missing organization are skipped.
    #[instrument(skip(self))]
    pub async fn list_organizations_by_user(&self, user_id: &str) -> Result<Vec<Organization>> {
        const OPERATION: &str = "list user organizations";

        let query = Query::primary(user_partition(user_id)?).with_sort_prefix(ORG_PREFIX);
        let memberships = self
            .query_all(query, OPERATION)
            .await?
            .into_iter()
            .map(|item| decode_item::<Membership>(item).map_err(storage(OPERATION)))
            .collect::<Result<Vec<_>>>()?;

        let fetched = try_join_all(
            memberships
                .iter()
                .map(|m| self.fetch_organization(&m.org_name, OPERATION)),
        )
        .await?;

        let orgs: Vec<Organization> = memberships
            .iter()
            .zip(fetched)
            .filter_map(|(membership, org)| {
                if org.is_none() {
                    warn!(org = %membership.org_name, "Membership refers to a missing organization");
                }
                org
            })
            .collect();

        debug!(count = orgs.len(), "Listed user organizations");
        Ok(orgs)
    }

    /// One page of the public organization listing, ordered by name.
    ///
    /// Pass back the returned `next_cursor` to continue. A cursor missing any
    /// of its key attributes restarts from the first page.
    #[instrument(skip(self, cursor), fields(has_cursor = cursor.is_some()))]
    pub async fn list_public_organizations(&self, cursor: Option<Cursor>) -> Result<OrganizationPage> {
        const OPERATION: &str = "list public organizations";

        let attributes = IndexName::Gsi1.cursor_attributes();
        let cursor = cursor.filter(|c| {
            let complete = c.has_attributes(attributes);
            if !complete {
                debug!("Incomplete cursor, starting from the beginning");
            }
            complete
        });

        let query = Query::gsi1(ORG_LISTING_PARTITION)
            .with_sort_prefix(ORG_PREFIX)
            .with_limit(PUBLIC_PAGE_SIZE)
            .starting_after(cursor);
        let page = self.table.query(&query).await.map_err(storage(OPERATION))?;

        let mut organizations = page
            .items
            .into_iter()
            .map(|item| decode_item::<Organization>(item).map_err(storage(OPERATION)))
            .collect::<Result<Vec<_>>>()?;
        join_all(organizations.iter_mut().map(|org| self.resolve_logo(org))).await;

        Ok(OrganizationPage {
            organizations,
            next_cursor: page.last_evaluated,
        })
    }

    /// Apply a partial update and return the updated organization.
    ///
    /// # Errors
    ///
    /// `NoFieldsProvided` if `update` carries no non-blank field (nothing is
    /// written), `OrganizationNotFound` if no organization holds the name.
    #[instrument(skip(self, update))]
    pub async fn update_organization(
        &self,
        name: &str,
        update: &OrganizationUpdate,
    ) -> Result<Organization> {
        let key = org_key(name)?;
        let changes = UpdateBuilder::from_update(update).build()?;
        let fields = changes.len();

        let item = match self
            .table
            .update_item(&key, changes, UpdateCondition::ItemExists)
            .await
        {
            Ok(item) => item,
            Err(StoreError::ConditionalCheckFailed) => {
                return Err(OrganizationError::not_found(name));
            }
            Err(e) => return Err(OrganizationError::storage("update organization", e)),
        };

        let mut org: Organization = decode_item(item).map_err(storage("update organization"))?;
        info!(fields, "Organization updated");
        self.resolve_logo(&mut org).await;
        Ok(org)
    }

    /// Every membership of an organization, ordered by user ID.
    #[instrument(skip(self))]
    pub async fn list_members(&self, name: &str) -> Result<Vec<Membership>> {
        const OPERATION: &str = "list members";

        let query = Query::gsi1(org_partition(name)?).with_sort_prefix(USER_PREFIX);
        self.query_all(query, OPERATION)
            .await?
            .into_iter()
            .map(|item| decode_item(item).map_err(storage(OPERATION)))
            .collect()
    }

    /// Revoke a membership. Removing a missing membership succeeds.
    #[instrument(skip(self))]
    pub async fn remove_member(&self, name: &str, user_id: &str) -> Result<()> {
        let key = membership_key(name, user_id)?;
        self.table
            .delete_item(&key)
            .await
            .map_err(storage("remove member"))?;

        info!("Member removed");
        Ok(())
    }

    /// Change an existing member's role.
    ///
    /// # Errors
    ///
    /// `MembershipNotFound` if the user is not a member.
    #[instrument(skip(self))]
    pub async fn update_member_role(
        &self,
        name: &str,
        user_id: &str,
        role: OrgRole,
    ) -> Result<Membership> {
        let key = membership_key(name, user_id)?;
        let changes = vec![
            AttributeChange::set("role", role.as_str()),
            AttributeChange::set("updatedAt", Utc::now().to_rfc3339()),
        ];

        let item = match self
            .table
            .update_item(&key, changes, UpdateCondition::ItemExists)
            .await
        {
            Ok(item) => item,
            Err(StoreError::ConditionalCheckFailed) => {
                return Err(OrganizationError::membership_not_found(name, user_id));
            }
            Err(e) => return Err(OrganizationError::storage("update member role", e)),
        };

        info!(%role, "Member role updated");
        decode_item(item).map_err(storage("update member role"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizations::keys::org_key;
    use crate::organizations::storage::{InMemoryTable, string_attribute};
    use crate::organizations::test::{CountingSigner, FailingSigner, FailingTable, store};
    use crate::organizations::ErrorKind;
    use chrono::Duration;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let store = store();
        let org = Organization::new("Acme", "user-1");

        store.create_organization(&org).await.unwrap();
        let err = store
            .create_organization(&Organization::new("ACME", "user-2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_get_preserves_display_casing() {
        let store = store();
        store
            .create_organization(&Organization::new("Acme Photo", "user-1"))
            .await
            .unwrap();

        let org = store.get_organization_by_name("ACME PHOTO").await.unwrap().unwrap();
        assert_eq!(org.name, "Acme Photo");
        assert!(store.get_organization_by_name("Other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_identifiers_rejected() {
        let store = store();
        let err = store.get_organization_by_name("  ").await.unwrap_err();
        assert!(matches!(err, OrganizationError::InvalidIdentifier { .. }));
        let err = store.get_membership("Acme", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_membership_lifecycle() {
        let store = store();
        assert!(store.get_membership("Acme", "user-1").await.unwrap().is_none());

        store
            .create_membership(&Membership::member("Acme", "user-1"))
            .await
            .unwrap();
        let membership = store.get_membership("acme", "user-1").await.unwrap().unwrap();
        assert_eq!(membership.role, OrgRole::Member);

        store.remove_member("Acme", "user-1").await.unwrap();
        assert!(store.get_membership("Acme", "user-1").await.unwrap().is_none());
        // Idempotent
        store.remove_member("Acme", "user-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_member_role() {
        let store = store();
        let err = store
            .update_member_role("Acme", "user-1", OrgRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::MembershipNotFound { .. }));

        let mut membership = Membership::member("Acme", "user-1");
        membership.updated_at = Utc::now() - Duration::hours(1);
        store.create_membership(&membership).await.unwrap();

        let updated = store
            .update_member_role("Acme", "user-1", OrgRole::Admin)
            .await
            .unwrap();
        assert_eq!(updated.role, OrgRole::Admin);
        assert!(updated.updated_at > membership.updated_at);
        assert_eq!(updated.created_at, membership.created_at);
    }

    #[tokio::test]
    async fn test_update_organization() {
        let store = store();
        store
            .create_organization(&Organization::new("Acme", "user-1").with_website("https://old.test"))
            .await
            .unwrap();

        let updated = store
            .update_organization(
                "acme",
                &OrganizationUpdate {
                    description: Some("Photo club".into()),
                    website: Some("  ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("Photo club"));
        assert_eq!(updated.website.as_deref(), Some("https://old.test"));
    }

    #[tokio::test]
    async fn test_update_organization_errors() {
        let store = store();
        let err = store
            .update_organization(
                "Acme",
                &OrganizationUpdate {
                    description: Some("x".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::OrganizationNotFound { .. }));
        assert!(store.table().is_empty().await);

        let err = store
            .update_organization("Acme", &OrganizationUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::NoFieldsProvided));
    }

    #[tokio::test]
    async fn test_list_members() {
        let store = store();
        for user in ["user-3", "user-1", "user-2"] {
            store
                .create_membership(&Membership::member("Acme", user))
                .await
                .unwrap();
        }
        store
            .create_membership(&Membership::member("Other", "user-1"))
            .await
            .unwrap();

        let members = store.list_members("ACME").await.unwrap();
        let ids: Vec<_> = members.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["user-1", "user-2", "user-3"]);
        assert!(store.list_members("Nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_user_skips_dangling() {
        let store = store();
        store
            .register_organization(Organization::new("Acme", "user-1"), None)
            .await
            .unwrap();
        store
            .create_membership(&Membership::member("Ghost", "user-1"))
            .await
            .unwrap();

        let orgs = store.list_organizations_by_user("user-1").await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].name, "Acme");
        assert!(store.list_organizations_by_user("user-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_grants_admin() {
        let store = store();
        let (org, membership) = store
            .register_organization(Organization::new("Acme", "user-1"), Some("u1@acme.test"))
            .await
            .unwrap();
        assert_eq!(org.name, "Acme");
        assert_eq!(membership.role, OrgRole::Admin);
        assert_eq!(membership.email.as_deref(), Some("u1@acme.test"));

        let stored = store.get_membership("Acme", "user-1").await.unwrap().unwrap();
        assert!(stored.role.is_admin());
    }

    #[tokio::test]
    async fn test_incomplete_cursor_starts_over() {
        let store = store();
        for i in 0..3 {
            store
                .create_organization(&Organization::new(format!("Org {i}"), "user-1"))
                .await
                .unwrap();
        }

        let partial = Cursor::from_attributes([("GSI1PK", "ORG"), ("GSI1SK", "ORG#ORG 1")]);
        let page = store.list_public_organizations(Some(partial)).await.unwrap();
        assert_eq!(page.organizations.len(), 3);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_reads_refresh_logo_urls() {
        let signer = CountingSigner::new();
        let store = OrganizationStore::new(Arc::new(InMemoryTable::new()), signer.clone());
        store
            .create_organization(&Organization::new("Acme", "user-1").with_logo_key("logos/acme.png"))
            .await
            .unwrap();

        let org = store.get_organization_by_name("Acme").await.unwrap().unwrap();
        assert_eq!(org.logo_url.as_deref(), Some("https://signed.test/logos/acme.png?n=1"));
        let page = store.list_public_organizations(None).await.unwrap();
        assert_eq!(
            page.organizations[0].logo_url.as_deref(),
            Some("https://signed.test/logos/acme.png?n=2")
        );
    }

    #[tokio::test]
    async fn test_legacy_url_key_is_backfilled() {
        let table = Arc::new(InMemoryTable::new());
        let store = OrganizationStore::new(table.clone(), CountingSigner::new());
        store
            .create_organization(
                &Organization::new("Acme", "user-1")
                    .with_legacy_logo_url("https://old.test/logos/acme.png?X-Amz-Expires=60"),
            )
            .await
            .unwrap();

        let org = store.get_organization_by_name("Acme").await.unwrap().unwrap();
        assert_eq!(org.logo_s3_key.as_deref(), Some("logos/acme.png"));

        let key = org_key("Acme").unwrap();
        let persisted = tokio::time::timeout(StdDuration::from_secs(5), async {
            loop {
                let item = table.get_item(&key).await.unwrap().unwrap();
                if let Some(k) = string_attribute(&item, "logoS3Key") {
                    return k.to_string();
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(persisted, "logos/acme.png");
    }

    #[tokio::test]
    async fn test_backfill_never_undoes_a_newer_logo() {
        let new_logo = OrganizationUpdate {
            logo_url: Some("https://old.test/logos/new.png".into()),
            logo_s3_key: Some("logos/new.png".into()),
            ..Default::default()
        };
        let url_only = OrganizationUpdate {
            logo_url: Some("https://old.test/logos/new.png".into()),
            ..Default::default()
        };

        for update in [new_logo, url_only] {
            let table = Arc::new(InMemoryTable::new());
            let store = OrganizationStore::new(table.clone(), CountingSigner::new());
            store
                .create_organization(
                    &Organization::new("Acme", "user-1")
                        .with_legacy_logo_url("https://old.test/logos/old.png"),
                )
                .await
                .unwrap();

            // The read queues a write of the old key
            let read = store.get_organization_by_name("Acme").await.unwrap().unwrap();
            assert_eq!(read.logo_s3_key.as_deref(), Some("logos/old.png"));

            store.update_organization("Acme", &update).await.unwrap();
            tokio::time::sleep(StdDuration::from_millis(50)).await;

            let item = table.get_item(&org_key("Acme").unwrap()).await.unwrap().unwrap();
            assert_eq!(string_attribute(&item, "logoS3Key"), Some("logos/new.png"));

            let served = store.get_organization_by_name("Acme").await.unwrap().unwrap();
            assert!(served.logo_url.unwrap().starts_with("https://signed.test/logos/new.png"));
        }
    }

    #[tokio::test]
    async fn test_signing_failure_does_not_fail_reads() {
        let store = OrganizationStore::new(Arc::new(InMemoryTable::new()), FailingSigner);
        let mut org = Organization::new("Acme", "user-1").with_logo_key("logos/acme.png");
        org.logo_url = Some("https://old.test/logos/acme.png".into());
        store.create_organization(&org).await.unwrap();

        let fetched = store.get_organization_by_name("Acme").await.unwrap().unwrap();
        assert_eq!(fetched.logo_url.as_deref(), Some("https://old.test/logos/acme.png"));
    }

    #[tokio::test]
    async fn test_storage_errors_carry_operation() {
        let store = OrganizationStore::new(Arc::new(FailingTable), CountingSigner::new());

        let err = store.get_membership("Acme", "user-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("get membership"));

        let err = store.list_public_organizations(None).await.unwrap_err();
        assert!(matches!(
            err,
            OrganizationError::Storage {
                operation: "list public organizations",
                ..
            }
        ));
    }
}
