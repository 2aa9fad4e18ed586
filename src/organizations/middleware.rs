//! Axum middleware for organization-scoped routes.

use super::gate::{AuthorizationGate, CallerIdentity, OrgRouteParams};
use super::logos::UrlSigner;
use super::storage::TableStore;
use super::types::{Membership, OrgRole};
use crate::error::PhotoCompError;
use axum::RequestExt;
use axum::extract::{FromRequestParts, Path, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Membership verified by [`require_org_member`] or [`require_org_admin`].
///
/// Available to handlers behind either middleware.
///
/// ```rust,ignore
/// async fn settings(CurrentMembership(membership): CurrentMembership) -> String {
///     format!("{} is {}", membership.user_id, membership.role)
/// }
/// ```
#[derive(Clone, Debug)]
pub struct CurrentMembership(pub Membership);

impl CurrentMembership {
    pub fn into_inner(self) -> Membership {
        self.0
    }
}

impl<S> FromRequestParts<S> for CurrentMembership
where
    S: Send + Sync,
{
    type Rejection = PhotoCompError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        std::future::ready(
            parts
                .extensions
                .get::<CurrentMembership>()
                .cloned()
                .ok_or_else(|| {
                    PhotoCompError::internal("Organization membership was not checked for this route")
                }),
        )
    }
}

async fn authorize<T, S>(
    gate: Arc<AuthorizationGate<T, S>>,
    required: OrgRole,
    mut request: Request,
    next: Next,
) -> Response
where
    T: TableStore + 'static,
    S: UrlSigner + 'static,
{
    let Some(caller) = request.extensions().get::<CallerIdentity>().cloned() else {
        return PhotoCompError::unauthorized("User not authenticated").into_response();
    };

    let params = match request.extract_parts::<Path<HashMap<String, String>>>().await {
        Ok(Path(params)) => OrgRouteParams::from_map(&params),
        Err(_) => OrgRouteParams::default(),
    };

    let checked = match required {
        OrgRole::Admin => gate.check_org_admin(&caller, &params).await,
        OrgRole::Member => gate.check_org_member(&caller, &params).await,
    };

    match checked {
        Ok(membership) => {
            request.extensions_mut().insert(CurrentMembership(membership));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Require the caller to be a member of the organization named in the path.
///
/// Apply with `route_layer` so path parameters are available. Expects a
/// [`CallerIdentity`] in request extensions.
///
/// ```rust,ignore
/// use axum::{Router, middleware, routing::get};
/// use photocomp::organizations::require_org_member;
///
/// let app = Router::new()
///     .route("/orgs/{orgId}/events", get(list_events))
///     .route_layer(middleware::from_fn_with_state(gate.clone(), require_org_member));
/// ```
pub async fn require_org_member<T, S>(
    State(gate): State<Arc<AuthorizationGate<T, S>>>,
    request: Request,
    next: Next,
) -> Response
where
    T: TableStore + 'static,
    S: UrlSigner + 'static,
{
    authorize(gate, OrgRole::Member, request, next).await
}

/// Require the caller to be an admin of the organization named in the path.
pub async fn require_org_admin<T, S>(
    State(gate): State<Arc<AuthorizationGate<T, S>>>,
    request: Request,
    next: Next,
) -> Response
where
    T: TableStore + 'static,
    S: UrlSigner + 'static,
{
    authorize(gate, OrgRole::Admin, request, next).await
}
