//! Attribute definitions and typed item values

use std::collections::{HashMap, HashSet};

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        attribute::{Attribute, AttributeValueInput, CreateAttribute, ItemAttributeValue, SetItemAttributes},
        user::UserClaims,
    },
    repository::Repository,
    services::{access::ensure_owner_or_admin, items::ItemsService},
};

/// Check a full set of values against the attributes usable by `owner_id`
pub fn check_values(owner_id: i32, values: &[AttributeValueInput], attributes: &HashMap<i32, Attribute>) -> AppResult<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.attribute_id) {
            return Err(AppError::Validation(format!(
                "Attribute {} is set more than once",
                value.attribute_id
            )));
        }

        let attribute = attributes
            .get(&value.attribute_id)
            .filter(|a| a.user_id.map(|u| u == owner_id).unwrap_or(true))
            .ok_or_else(|| AppError::Validation(format!("Unknown attribute {}", value.attribute_id)))?;

        attribute.data_type.validate_value(&value.value).map_err(|e| match e {
            AppError::Validation(msg) => AppError::Validation(format!("{}: {}", attribute.name, msg)),
            other => other,
        })?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct AttributesService {
    repository: Repository,
    items: ItemsService,
}

impl AttributesService {
    pub fn new(repository: Repository, items: ItemsService) -> Self {
        Self { repository, items }
    }

    /// Built-in attributes plus the caller's own
    pub async fn list(&self, claims: &UserClaims) -> AppResult<Vec<Attribute>> {
        self.repository.attributes.list_visible(claims.user_id).await
    }

    pub async fn create(&self, claims: &UserClaims, request: CreateAttribute) -> AppResult<Attribute> {
        request.validate()?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be blank".to_string()));
        }

        if self.repository.attributes.name_exists(claims.user_id, name).await? {
            return Err(AppError::Conflict(format!("Attribute '{}' already exists", name)));
        }

        let attribute = self
            .repository
            .attributes
            .create(claims.user_id, name, request.data_type)
            .await?;
        tracing::info!(user_id = claims.user_id, attribute_id = attribute.id, "Custom attribute created");
        Ok(attribute)
    }

    /// Delete a custom attribute and every value using it
    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        let attribute = self.repository.attributes.get_by_id(id).await?;
        let owner_id = attribute
            .user_id
            .ok_or_else(|| AppError::BusinessRule("Built-in attributes cannot be deleted".to_string()))?;
        ensure_owner_or_admin(claims, owner_id, "attribute")?;

        self.repository.attributes.delete(id).await?;
        tracing::info!(user_id = claims.user_id, attribute_id = id, "Custom attribute deleted");
        Ok(())
    }

    pub async fn item_values(&self, claims: &UserClaims, item_id: i32) -> AppResult<Vec<ItemAttributeValue>> {
        self.items.get_readable(claims, item_id).await?;
        self.repository.attributes.item_values(item_id).await
    }

    /// Replace all attribute values of an item
    pub async fn set_item_values(
        &self,
        claims: &UserClaims,
        item_id: i32,
        request: SetItemAttributes,
    ) -> AppResult<Vec<ItemAttributeValue>> {
        let item = self.items.get_writable(claims, item_id).await?;

        let ids: Vec<i32> = request.values.iter().map(|v| v.attribute_id).collect();
        let attributes: HashMap<i32, Attribute> = self
            .repository
            .attributes
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        check_values(item.user_id, &request.values, &attributes)?;

        self.repository.attributes.set_item_values(item_id, &request.values).await?;
        self.repository.attributes.item_values(item_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attribute::AttributeType;

    fn attributes() -> HashMap<i32, Attribute> {
        [
            (1, "Pages", AttributeType::Number, None),
            (2, "Website", AttributeType::Url, None),
            (3, "Shelf code", AttributeType::Text, Some(7)),
            (4, "Secret", AttributeType::Text, Some(8)),
        ]
        .into_iter()
        .map(|(id, name, data_type, user_id)| {
            (
                id,
                Attribute {
                    id,
                    name: name.to_string(),
                    data_type,
                    user_id,
                },
            )
        })
        .collect()
    }

    fn value(attribute_id: i32, value: &str) -> AttributeValueInput {
        AttributeValueInput {
            attribute_id,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_valid_values() {
        let values = vec![value(1, "320"), value(2, "https://example.org"), value(3, "B-12")];
        assert!(check_values(7, &values, &attributes()).is_ok());
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let err = check_values(7, &[value(1, "three hundred")], &attributes()).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.starts_with("Pages")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_foreign_and_unknown_attributes() {
        assert!(check_values(7, &[value(4, "x")], &attributes()).is_err());
        assert!(check_values(7, &[value(99, "x")], &attributes()).is_err());
    }

    #[test]
    fn test_duplicate_attribute() {
        assert!(check_values(7, &[value(1, "1"), value(1, "2")], &attributes()).is_err());
    }
}
