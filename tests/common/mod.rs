//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use bson::oid::ObjectId;
use mysplit::auth::SessionIssuer;
use mysplit::expenses::ExpenseRule;
use mysplit::identity::NewUser;
use mysplit::schemas::{ExpenseSplit, NewExpense, User};
use mysplit::store::MemoryStore;
use mysplit::AppState;

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "correct horse battery";

pub fn sessions() -> SessionIssuer {
    SessionIssuer::new(SECRET, 60)
}

/// Fresh in-memory store plus services wired to it.
pub fn setup() -> (Arc<MemoryStore>, AppState) {
    setup_with_rules(Vec::new())
}

pub fn setup_with_rules(rules: Vec<Arc<dyn ExpenseRule>>) -> (Arc<MemoryStore>, AppState) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), sessions(), rules);
    (store, state)
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email(name),
        mobile_number: format!("+1-555-{name}"),
        password: PASSWORD.to_string(),
    }
}

pub fn email(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase())
}

pub async fn register(state: &AppState, name: &str) -> User {
    state
        .identity
        .register(new_user(name))
        .await
        .expect("registration failed")
}

pub fn new_expense(
    group_id: ObjectId,
    paid_by: ObjectId,
    created_by: ObjectId,
    amount: f64,
) -> NewExpense {
    NewExpense {
        group_id,
        paid_by,
        created_by,
        amount,
        description: "Dinner".to_string(),
        split: vec![ExpenseSplit {
            user_id: paid_by,
            amount,
        }],
    }
}
