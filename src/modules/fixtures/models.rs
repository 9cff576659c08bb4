use seedbed_db::bson::{oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Sample account holder in `users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Unique across the collection once the email index exists
    pub email: String,
    pub role: String,
    pub created_at: DateTime,
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub age: i32,
    pub city: String,
    pub interests: Vec<String>,
}

/// Catalogue entry in `products`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub description: String,
    pub in_stock: bool,
    pub quantity: i32,
    pub tags: Vec<String>,
    /// Free-form; each product carries its own keys
    pub specifications: Document,
    pub created_at: DateTime,
}

/// Purchase in `orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub order_number: String,
    pub status: String,
    pub total_amount: f64,
    pub items: Vec<LineItem>,
    pub shipping_address: Address,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ObjectId,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// Connectivity record in `testdb.test_collection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub test_field: String,
    pub number: i32,
    pub active: bool,
    pub created_at: DateTime,
}

/// Convert a whole-cent amount to the stored decimal value.
pub fn amount(cents: u64) -> f64 {
    cents as f64 / 100.0
}

/// Whole cents of a stored amount.
pub fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedbed_db::bson::to_document;

    #[test]
    fn amounts_are_exact_decimal_literals() {
        assert_eq!(amount(21998), 219.98);
        assert_eq!(amount(129999), 1299.99);
        assert_eq!(cents(199.99) + cents(19.99), 21998);
    }

    #[test]
    fn users_serialize_with_camel_case_and_no_null_id() {
        let user = User {
            id: None,
            name: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            role: "admin".to_string(),
            created_at: DateTime::from_millis(0),
            profile: Profile {
                age: 30,
                city: "New York".to_string(),
                interests: vec!["programming".to_string()],
            },
        };
        let document = to_document(&user).unwrap();
        assert!(!document.contains_key("_id"));
        assert!(document.get_datetime("createdAt").is_ok());
        assert_eq!(
            document.get_document("profile").unwrap().get_i32("age").unwrap(),
            30
        );
    }
}
