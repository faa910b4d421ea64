use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{listing, ListQuery};
use crate::{
    entities::contact,
    services::contacts::{ContactFilter, ContactInput},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ContactSearch {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/contacts",
    summary = "Send a contact message",
    request_body = ContactInput,
    responses(
        (status = 200, description = "Message has been sent.", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Missing field", body = crate::errors::ErrorResponse),
    ),
    tag = "Contacts"
)]
pub async fn create_contact(
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> ApiResult<contact::Model> {
    let contact = state.services.contacts.create_contact(input).await?;
    Ok(Json(ApiResponse::success("Message has been sent.", contact)))
}

#[utoipa::path(
    get,
    path = "/api/v1/contacts",
    summary = "List contact messages",
    params(ListQuery, ContactSearch),
    responses((status = 200, description = "N messages found", body = crate::openapi::ApiEnvelope)),
    security(("Bearer" = [])),
    tag = "Contacts"
)]
pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(search): Query<ContactSearch>,
) -> ApiResult<Vec<contact::Model>> {
    let filter = ContactFilter {
        email: search.email,
        name: search.name,
    };
    let contacts = state
        .services
        .contacts
        .list_contacts(&filter, query.pagination(&state.config)?)
        .await?;
    Ok(Json(listing(contacts, "messages", "No message is available")))
}

#[utoipa::path(
    get,
    path = "/api/v1/contacts/{id}",
    summary = "Get contact message",
    params(("id" = Uuid, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "1 contact found", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "No contact is available", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Contacts"
)]
pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<contact::Model> {
    let contact = state.services.contacts.get_contact(id).await?;
    Ok(Json(ApiResponse::success("1 contact found", contact)))
}

#[utoipa::path(
    put,
    path = "/api/v1/contacts/{id}",
    summary = "Edit contact message",
    params(("id" = Uuid, Path, description = "Contact ID")),
    request_body = ContactInput,
    responses(
        (status = 200, description = "Contact message has been updated", body = crate::openapi::ApiEnvelope),
        (status = 400, description = "Missing field", body = crate::errors::ErrorResponse),
        (status = 404, description = "This contact does not exist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Contacts"
)]
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ContactInput>,
) -> ApiResult<contact::Model> {
    let contact = state.services.contacts.update_contact(id, input).await?;
    Ok(Json(ApiResponse::success(
        "Contact message has been updated",
        contact,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/contacts/{id}",
    summary = "Delete contact message",
    params(("id" = Uuid, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Contact message has been deleted", body = crate::openapi::ApiEnvelope),
        (status = 404, description = "This contact does not exist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Contacts"
)]
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.contacts.delete_contact(id).await?;
    Ok(Json(ApiResponse::empty("Contact message has been deleted")))
}
