//! Literal sample records.
//!
//! Order `userId` and `productId` values are fresh identifiers and do not
//! point at the inserted users or products.

use seedbed_db::bson::{doc, oid::ObjectId, DateTime};
use seedbed_db::IndexSpec;

use super::models::{amount, Address, LineItem, Order, Product, Profile, TestRecord, User};

pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const ORDERS: &str = "orders";
pub const TEST_COLLECTION: &str = "test_collection";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn user(name: &str, email: &str, role: &str, age: i32, city: &str, interests: &[&str], now: DateTime) -> User {
    User {
        id: None,
        name: name.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        created_at: now,
        profile: Profile {
            age,
            city: city.to_string(),
            interests: strings(interests),
        },
    }
}

pub fn users(now: DateTime) -> Vec<User> {
    vec![
        user(
            "John Doe",
            "john.doe@example.com",
            "admin",
            30,
            "New York",
            &["programming", "reading", "gaming"],
            now,
        ),
        user(
            "Jane Smith",
            "jane.smith@example.com",
            "user",
            28,
            "San Francisco",
            &["design", "photography", "travel"],
            now,
        ),
        user(
            "Bob Johnson",
            "bob.johnson@example.com",
            "user",
            35,
            "Chicago",
            &["music", "cooking", "sports"],
            now,
        ),
    ]
}

pub fn products(now: DateTime) -> Vec<Product> {
    vec![
        Product {
            id: None,
            name: "Laptop Pro".to_string(),
            category: "Electronics".to_string(),
            price: amount(129_999),
            description: "High-performance laptop for professionals".to_string(),
            in_stock: true,
            quantity: 50,
            tags: strings(&["laptop", "computer", "professional"]),
            specifications: doc! {
                "cpu": "Intel i7",
                "ram": "16GB",
                "storage": "512GB SSD",
                "screen": "15.6 inch",
            },
            created_at: now,
        },
        Product {
            id: None,
            name: "Wireless Headphones".to_string(),
            category: "Electronics".to_string(),
            price: amount(19_999),
            description: "Premium wireless headphones with noise cancellation".to_string(),
            in_stock: true,
            quantity: 100,
            tags: strings(&["headphones", "audio", "wireless"]),
            specifications: doc! {
                "type": "Over-ear",
                "batteryLife": "30 hours",
                "noiseCancellation": true,
                "bluetooth": "5.0",
            },
            created_at: now,
        },
        Product {
            id: None,
            name: "Coffee Mug".to_string(),
            category: "Home & Kitchen".to_string(),
            price: amount(1_999),
            description: "Ceramic coffee mug with ergonomic handle".to_string(),
            in_stock: true,
            quantity: 200,
            tags: strings(&["mug", "coffee", "ceramic"]),
            specifications: doc! {
                "material": "Ceramic",
                "capacity": "350ml",
                "dishwasherSafe": true,
                "microwaveSafe": true,
            },
            created_at: now,
        },
    ]
}

/// A line item priced in whole cents.
struct Line {
    name: &'static str,
    quantity: u32,
    unit_cents: u64,
}

/// Build an order whose total is summed in cents, so it equals the line
/// items exactly once stored.
fn order(number: &str, status: &str, lines: &[Line], address: Address, now: DateTime) -> Order {
    let total_cents: u64 = lines
        .iter()
        .map(|line| line.unit_cents * u64::from(line.quantity))
        .sum();

    Order {
        id: None,
        user_id: ObjectId::new(),
        order_number: number.to_string(),
        status: status.to_string(),
        total_amount: amount(total_cents),
        items: lines
            .iter()
            .map(|line| LineItem {
                product_id: ObjectId::new(),
                name: line.name.to_string(),
                quantity: line.quantity as i32,
                price: amount(line.unit_cents),
            })
            .collect(),
        shipping_address: address,
        created_at: now,
        updated_at: now,
    }
}

fn address(street: &str, city: &str, state: &str, zip_code: &str) -> Address {
    Address {
        street: street.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        zip_code: zip_code.to_string(),
        country: "USA".to_string(),
    }
}

pub fn orders(now: DateTime) -> Vec<Order> {
    vec![
        order(
            "ORD-001",
            "completed",
            &[Line {
                name: "Laptop Pro",
                quantity: 1,
                unit_cents: 129_999,
            }],
            address("123 Main St", "New York", "NY", "10001"),
            now,
        ),
        order(
            "ORD-002",
            "pending",
            &[
                Line {
                    name: "Wireless Headphones",
                    quantity: 1,
                    unit_cents: 19_999,
                },
                Line {
                    name: "Coffee Mug",
                    quantity: 1,
                    unit_cents: 1_999,
                },
            ],
            address("456 Oak Ave", "San Francisco", "CA", "94102"),
            now,
        ),
    ]
}

pub fn test_records(now: DateTime) -> Vec<TestRecord> {
    vec![
        TestRecord {
            id: None,
            test_field: "Test Value 1".to_string(),
            number: 42,
            active: true,
            created_at: now,
        },
        TestRecord {
            id: None,
            test_field: "Test Value 2".to_string(),
            number: 84,
            active: false,
            created_at: now,
        },
    ]
}

/// Secondary indexes on the primary database, in build order.
pub fn indexes() -> Vec<(&'static str, IndexSpec)> {
    vec![
        (USERS, IndexSpec::ascending("email").unique()),
        (USERS, IndexSpec::ascending("role")),
        (PRODUCTS, IndexSpec::ascending("category")),
        (PRODUCTS, IndexSpec::text(&["name", "description"])),
        (ORDERS, IndexSpec::ascending("userId")),
        (ORDERS, IndexSpec::ascending("status")),
        (ORDERS, IndexSpec::descending("createdAt")),
    ]
}
