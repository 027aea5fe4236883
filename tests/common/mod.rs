//! Shared fixtures for integration tests.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// The canonical test model: a user with a handful of scalar fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub age: i64,
}

exostore::external_type!(User);

impl User {
    pub fn alice() -> Self {
        Self {
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            age: 30,
        }
    }

    pub fn bob() -> Self {
        Self {
            name: "Bob".to_string(),
            email: "b@x.com".to_string(),
            age: 25,
        }
    }
}

/// A model exercising nested and optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub number: String,
    pub customer: User,
    pub items: Vec<String>,
    pub note: Option<String>,
}

exostore::external_type!(Order);

impl Order {
    pub fn sample() -> Self {
        Self {
            number: "ORD-1".to_string(),
            customer: User::alice(),
            items: vec!["widget".to_string(), "gadget".to_string()],
            note: None,
        }
    }
}
