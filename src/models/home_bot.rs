// src/models/home_bot.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::common::validation::validate_not_blank;

/// One record of the appliance lifespan reference index.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LifespanRecord {
    pub brand: String,
    pub model: String,
    pub avg_lifespan_years: i64,
    #[serde(default)]
    pub description: String,
}

impl LifespanRecord {
    /// Text that gets embedded for this record.
    pub fn search_text(&self) -> String {
        if self.description.is_empty() {
            format!("{} {}", self.brand, self.model)
        } else {
            format!("{} {} {}", self.brand, self.model, self.description)
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AskLifecyclePayload {
    #[validate(
        required(message = "The question field is required."),
        custom(function = "validate_not_blank")
    )]
    pub question: Option<String>,

    #[validate(
        required(message = "The applianceAge field is required."),
        range(min = 0, message = "applianceAge cannot be negative.")
    )]
    pub appliance_age: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LifecycleAnswer {
    pub answer: String,
    pub forecasted_replacement_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn age_must_be_an_integer() {
        let result: Result<AskLifecyclePayload, _> =
            serde_json::from_value(json!({"question": "When?", "applianceAge": "five"}));
        assert!(result.is_err());
    }

    #[test]
    fn both_fields_are_required() {
        let payload: AskLifecyclePayload = serde_json::from_value(json!({})).unwrap();
        let errors = payload.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }
}
