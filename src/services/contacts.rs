use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{contains_ci, db_error, non_empty, require_fields, Pagination};
use crate::db::DbPool;
use crate::entities::contact;
use crate::errors::ServiceError;

/// Body of the public contact form and of the admin edit form.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub mobile_number: Option<String>,
    pub full_address: Option<String>,
    pub connection_type: Option<String>,
    pub package_choice: Option<String>,
}

impl ContactInput {
    fn check_email(&self) -> Result<(), ServiceError> {
        self.validate()
            .map_err(|_| ServiceError::ValidationError("Please provide a valid Email".into()))
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    non_empty(value.as_deref()).map(str::to_string)
}

fn required(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct ContactService {
    db_pool: Arc<DbPool>,
}

impl ContactService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input))]
    pub async fn create_contact(&self, input: ContactInput) -> Result<contact::Model, ServiceError> {
        require_fields(&[
            (input.name.as_deref(), "Name"),
            (input.email.as_deref(), "Email"),
            (input.message.as_deref(), "Message"),
        ])?;
        input.check_email()?;

        let model = contact::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(required(&input.name)),
            email: Set(required(&input.email)),
            subject: Set(optional(&input.subject)),
            message: Set(required(&input.message)),
            mobile_number: Set(optional(&input.mobile_number)),
            full_address: Set(optional(&input.full_address)),
            connection_type: Set(optional(&input.connection_type)),
            package_choice: Set(optional(&input.package_choice)),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(db_error("Failed to store contact message"))?;

        info!(contact_id = %model.id, "Contact message received");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn list_contacts(
        &self,
        filter: &ContactFilter,
        page: Pagination,
    ) -> Result<Vec<contact::Model>, ServiceError> {
        let mut query = contact::Entity::find();
        if let Some(email) = non_empty(filter.email.as_deref()) {
            query = query.filter(contains_ci(contact::Column::Email, email));
        }
        if let Some(name) = non_empty(filter.name.as_deref()) {
            query = query.filter(contains_ci(contact::Column::Name, name));
        }

        query
            .order_by_desc(contact::Column::CreatedAt)
            .paginate(&*self.db_pool, page.limit)
            .fetch_page(page.page_index())
            .await
            .map_err(db_error("Failed to list contacts"))
    }

    #[instrument(skip(self))]
    pub async fn get_contact(&self, id: Uuid) -> Result<contact::Model, ServiceError> {
        contact::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(db_error("Failed to load contact"))?
            .ok_or_else(|| ServiceError::NotFound("No contact is available".into()))
    }

    #[instrument(skip(self, input))]
    pub async fn update_contact(
        &self,
        id: Uuid,
        input: ContactInput,
    ) -> Result<contact::Model, ServiceError> {
        require_fields(&[
            (input.email.as_deref(), "Email"),
            (input.name.as_deref(), "Name"),
            (input.subject.as_deref(), "Subject"),
            (input.message.as_deref(), "Message"),
        ])?;
        input.check_email()?;

        let existing = contact::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(db_error("Failed to load contact"))?
            .ok_or_else(|| ServiceError::NotFound("This contact does not exist".into()))?;

        let mut model: contact::ActiveModel = existing.into();
        model.name = Set(required(&input.name));
        model.email = Set(required(&input.email));
        model.subject = Set(optional(&input.subject));
        model.message = Set(required(&input.message));

        let updated = model
            .update(&*self.db_pool)
            .await
            .map_err(db_error("Failed to update contact"))?;
        info!(contact_id = %id, "Contact message updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_contact(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = contact::Entity::delete_many()
            .filter(contact::Column::Id.eq(id))
            .exec(&*self.db_pool)
            .await
            .map_err(db_error("Failed to delete contact"))?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("This contact does not exist".into()));
        }
        info!(contact_id = %id, "Contact message deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_email() {
        let input = ContactInput {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(input.check_email().is_err());

        let input = ContactInput {
            email: Some("nadia@example.com".into()),
            ..Default::default()
        };
        assert!(input.check_email().is_ok());
    }

    #[test]
    fn blank_optionals_become_none() {
        assert_eq!(optional(&Some("   ".into())), None);
        assert_eq!(optional(&Some(" Dhaka ".into())), Some("Dhaka".into()));
        assert_eq!(required(&Some(" Nadia ".into())), "Nadia");
    }

    #[test]
    fn parses_camel_case_form() {
        let input: ContactInput = serde_json::from_value(serde_json::json!({
            "name": "Nadia",
            "email": "nadia@example.com",
            "message": "Hello",
            "mobileNumber": "01700000000",
            "packageChoice": "Gold"
        }))
        .unwrap();
        assert_eq!(input.mobile_number.as_deref(), Some("01700000000"));
        assert_eq!(input.package_choice.as_deref(), Some("Gold"));
    }
}
