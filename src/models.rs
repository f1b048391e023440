use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidationErrors};

/// Format accepted for client-supplied `create_at` values (`DD/MM/YYYY HH:MM:SS`).
pub const CREATE_AT_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Format used by the store when it assigns the creation timestamp itself.
/// Day and month are not zero-padded.
pub const DEFAULT_CREATE_AT_FORMAT: &str = "%-d/%-m/%Y %H:%M:%S";

/// Prefix of every field-validation failure message.
pub const INCORRECT_FIELDS_PREFIX: &str = "Incorrect fields: ";

// --- Core Application Schema (Mapped to Database) ---

/// Order
///
/// The single domain entity, stored in the `orders` table.
/// `state` is one of the opaque codes 1 to 4 for anything accepted through the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Order {
    // Assigned by the store on creation (SERIAL).
    pub id: i32,
    pub description: String,
    pub state: i32,

    /// Maps SQL column and JSON key `create_at` to the Rust field `created_at`.
    #[serde(rename = "create_at")]
    #[sqlx(rename = "create_at")]
    #[schema(example = "7/3/2024 09:15:00")]
    pub created_at: String,
}

/// NewOrder
///
/// The store-facing shape of a create call. `created_at` is `None` when the
/// client did not send one, in which case the store stamps the current time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewOrder {
    pub description: String,
    pub state: i32,
    pub created_at: Option<String>,
}

/// OrderUpdate
///
/// Fields replaced by an update. The creation timestamp is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderUpdate {
    pub description: String,
    pub state: i32,
}

/// Returns the current local time rendered in the store's default format.
pub fn timestamp_now() -> String {
    Local::now().format(DEFAULT_CREATE_AT_FORMAT).to_string()
}

// --- Request Payloads (Input Schemas) ---

/// Declaration order of a request's validated fields.
///
/// `validator` reports failures in a map, so the failure message is rebuilt
/// by walking this list to keep it deterministic.
pub trait FieldOrder {
    const FIELDS: &'static [&'static str];
}

/// CreateOrderRequest
///
/// Input payload for `POST /api/v1/orders`. Missing fields decode to their
/// zero value so they are reported by validation rather than by the decoder.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub description: String,

    #[serde(default)]
    #[validate(range(min = 1, max = 4))]
    pub state: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_create_at"))]
    #[schema(example = "07/03/2024 09:15:00")]
    pub create_at: Option<String>,
}

impl FieldOrder for CreateOrderRequest {
    const FIELDS: &'static [&'static str] = &["description", "state", "create_at"];
}

impl From<CreateOrderRequest> for NewOrder {
    fn from(req: CreateOrderRequest) -> Self {
        NewOrder {
            description: req.description,
            state: req.state,
            // An empty string is treated the same as an absent timestamp.
            created_at: req.create_at.filter(|value| !value.is_empty()),
        }
    }
}

/// UpdateOrderRequest
///
/// Input payload for `PUT /api/v1/orders/{id}`. A `create_at` key in the body is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub description: String,

    #[serde(default)]
    #[validate(range(min = 1, max = 4))]
    pub state: i32,
}

impl FieldOrder for UpdateOrderRequest {
    const FIELDS: &'static [&'static str] = &["description", "state"];
}

impl From<UpdateOrderRequest> for OrderUpdate {
    fn from(req: UpdateOrderRequest) -> Self {
        OrderUpdate {
            description: req.description,
            state: req.state,
        }
    }
}

fn validate_create_at(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    if has_create_at_shape(value) && NaiveDateTime::parse_from_str(value, CREATE_AT_FORMAT).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("datetime"))
    }
}

/// chrono accepts unpadded `%d`/`%m`/`%M`/`%S`, so the digit widths are
/// checked first: `DD/MM/YYYY` followed by `H:MM:SS` or `HH:MM:SS`.
fn has_create_at_shape(value: &str) -> bool {
    fn digits(part: &str, widths: &[usize]) -> bool {
        widths.contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
    }

    let Some((date, time)) = value.split_once(' ') else {
        return false;
    };
    let date: Vec<&str> = date.split('/').collect();
    let time: Vec<&str> = time.split(':').collect();

    matches!(date.as_slice(), [d, m, y] if digits(d, &[2]) && digits(m, &[2]) && digits(y, &[4]))
        && matches!(time.as_slice(), [h, m, s] if digits(h, &[1, 2]) && digits(m, &[2]) && digits(s, &[2]))
}

/// Builds the `Incorrect fields: a|b|` message for a failed validation,
/// listing field names in declaration order.
pub fn incorrect_fields<T: FieldOrder>(errors: &ValidationErrors) -> String {
    let failed = errors.errors();
    let mut message = String::from(INCORRECT_FIELDS_PREFIX);
    for field in T::FIELDS.iter().filter(|field| failed.contains_key(*field)) {
        message.push_str(field);
        message.push('|');
    }
    message
}

/// PageParams
///
/// Raw `page_id` / `page_size` query parameters. Kept as strings so that
/// missing and non-numeric values can be reported with their own message.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number.
    pub page_id: Option<String>,
    /// Number of orders per page, between 5 and 10.
    pub page_size: Option<String>,
}

// --- Responses ---

/// MessageResponse
///
/// Body of every error response and of the delete confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_at_accepts_fixed_format_and_empty() {
        assert!(validate_create_at("07/03/2024 09:15:00").is_ok());
        assert!(validate_create_at("07/03/2024 9:15:00").is_ok());
        assert!(validate_create_at("").is_ok());
    }

    #[test]
    fn create_at_requires_padded_fields() {
        assert!(validate_create_at("7/3/2024 09:15:00").is_err());
        assert!(validate_create_at("07/3/2024 09:15:00").is_err());
        assert!(validate_create_at("7/3/2024 9:15:00").is_err());
        assert!(validate_create_at("07/03/2024 09:5:00").is_err());
        assert!(validate_create_at("07/03/2024 09:15:0").is_err());
        assert!(validate_create_at("07/03/24 09:15:00").is_err());
    }

    #[test]
    fn create_at_rejects_other_formats() {
        assert!(validate_create_at("2024-03-07 09:15:00").is_err());
        assert!(validate_create_at("07/03/2024").is_err());
        assert!(validate_create_at("31/02/2024 10:00:00").is_err());
        assert!(validate_create_at("07/03/2024  09:15:00").is_err());
        assert!(validate_create_at("+7/03/2024 09:15:00").is_err());
    }

    #[test]
    fn default_timestamp_parses_under_store_format() {
        let stamp = timestamp_now();
        assert!(NaiveDateTime::parse_from_str(&stamp, DEFAULT_CREATE_AT_FORMAT).is_ok());
    }
}
