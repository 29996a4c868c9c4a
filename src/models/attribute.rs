//! Typed item attributes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Data type of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Text,
    Number,
    Date,
    Boolean,
    Url,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Text => "text",
            AttributeType::Number => "number",
            AttributeType::Date => "date",
            AttributeType::Boolean => "boolean",
            AttributeType::Url => "url",
        }
    }

    /// Check that `value` is well-formed for this type
    pub fn validate_value(&self, value: &str) -> Result<(), AppError> {
        let value = value.trim();
        let valid = match self {
            AttributeType::Text => !value.is_empty(),
            AttributeType::Number => value.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false),
            AttributeType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            AttributeType::Boolean => matches!(value, "true" | "false"),
            AttributeType::Url => {
                (value.starts_with("http://") || value.starts_with("https://"))
                    && !value.contains(char::is_whitespace)
            }
        };

        if valid {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "'{}' is not a valid {} value",
                value,
                self.as_str()
            )))
        }
    }
}

impl std::str::FromStr for AttributeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(AttributeType::Text),
            "number" => Ok(AttributeType::Number),
            "date" => Ok(AttributeType::Date),
            "boolean" => Ok(AttributeType::Boolean),
            "url" => Ok(AttributeType::Url),
            _ => Err(format!("Invalid attribute type: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for AttributeType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for AttributeType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for AttributeType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Attribute definition. Built-in attributes have no owner.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attribute {
    pub id: i32,
    pub name: String,
    pub data_type: AttributeType,
    pub user_id: Option<i32>,
}

/// Create a custom attribute
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAttribute {
    #[validate(length(min = 1, max = 128, message = "Name must be 1-128 characters"))]
    pub name: String,
    pub data_type: AttributeType,
}

/// Attribute value attached to an item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ItemAttributeValue {
    pub attribute_id: i32,
    pub name: String,
    pub data_type: AttributeType,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttributeValueInput {
    pub attribute_id: i32,
    pub value: String,
}

/// Replace all attribute values of an item
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetItemAttributes {
    pub values: Vec<AttributeValueInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_values() {
        assert!(AttributeType::Number.validate_value("42").is_ok());
        assert!(AttributeType::Number.validate_value(" 3.5 ").is_ok());
        assert!(AttributeType::Number.validate_value("forty").is_err());
        assert!(AttributeType::Number.validate_value("NaN").is_err());
    }

    #[test]
    fn test_date_values() {
        assert!(AttributeType::Date.validate_value("2024-02-29").is_ok());
        assert!(AttributeType::Date.validate_value("2023-02-29").is_err());
        assert!(AttributeType::Date.validate_value("29/02/2024").is_err());
    }

    #[test]
    fn test_boolean_and_url_values() {
        assert!(AttributeType::Boolean.validate_value("true").is_ok());
        assert!(AttributeType::Boolean.validate_value("yes").is_err());
        assert!(AttributeType::Url.validate_value("https://example.com/a").is_ok());
        assert!(AttributeType::Url.validate_value("ftp://example.com").is_err());
        assert!(AttributeType::Url.validate_value("https://exa mple.com").is_err());
    }

    #[test]
    fn test_text_must_not_be_blank() {
        assert!(AttributeType::Text.validate_value("Tolkien").is_ok());
        assert!(AttributeType::Text.validate_value("   ").is_err());
    }
}
