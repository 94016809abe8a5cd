//! In-memory backend that records every request, for tests.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::data::{Backend, BackendError};

#[derive(Default)]
pub struct FakeBackend {
    rows: HashMap<String, Vec<Value>>,
    failing: HashSet<String>,
    insert_failure: Option<Option<String>>,
    pub selects: RefCell<Vec<String>>,
    pub inserts: RefCell<Vec<(String, Value)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        FakeBackend::default()
    }

    /// Rows returned for `collection`, already in backend order.
    pub fn with_rows(mut self, collection: &str, rows: Vec<Value>) -> Self {
        self.rows.insert(collection.to_string(), rows);
        self
    }

    /// Reads of `collection` answer with a 503.
    pub fn failing(mut self, collection: &str) -> Self {
        self.failing.insert(collection.to_string());
        self
    }

    /// Inserts answer with a 400 carrying `message`.
    pub fn failing_inserts(mut self, message: Option<&str>) -> Self {
        self.insert_failure = Some(message.map(str::to_string));
        self
    }
}

#[async_trait(?Send)]
impl Backend for FakeBackend {
    async fn select_newest_first(&self, collection: &str) -> Result<Vec<Value>, BackendError> {
        self.selects.borrow_mut().push(collection.to_string());
        if self.failing.contains(collection) {
            return Err(BackendError::Status {
                collection: collection.to_string(),
                status: 503,
                message: Some("service unavailable".to_string()),
            });
        }
        Ok(self.rows.get(collection).cloned().unwrap_or_default())
    }

    async fn insert(&self, collection: &str, row: Value) -> Result<Vec<Value>, BackendError> {
        self.inserts
            .borrow_mut()
            .push((collection.to_string(), row.clone()));
        if let Some(message) = &self.insert_failure {
            return Err(BackendError::Status {
                collection: collection.to_string(),
                status: 400,
                message: message.clone(),
            });
        }
        let mut stored = row;
        if let Value::Object(fields) = &mut stored {
            fields.insert("id".to_string(), json!(uuid::Uuid::new_v4()));
            fields.insert("created_at".to_string(), json!("2024-06-01T12:00:00+00:00"));
        }
        Ok(vec![stored])
    }
}

pub fn story(title: &str, created_at: &str) -> Value {
    json!({
        "id": uuid::Uuid::new_v4(),
        "title": title,
        "description": format!("{} description", title),
        "image_url": format!("https://img.example/{}.png", title),
        "tags": ["web", "seo"],
        "client_name": "Acme Bakery",
        "industry": "Food",
        "created_at": created_at,
        "updated_at": created_at,
    })
}

pub fn review(author: &str, rating: i32, created_at: &str) -> Value {
    json!({
        "id": uuid::Uuid::new_v4(),
        "author": author,
        "company": "Corner Shop",
        "content": "Great work, fast delivery.",
        "rating": rating,
        "image_url": "https://img.example/avatar.png",
        "is_featured": true,
        "created_at": created_at,
    })
}

pub fn project(
    title: &str,
    project_url: Option<&str>,
    github_url: Option<&str>,
    created_at: &str,
) -> Value {
    json!({
        "id": uuid::Uuid::new_v4(),
        "title": title,
        "description": format!("{} description", title),
        "image_url": format!("https://img.example/{}.png", title),
        "project_url": project_url,
        "github_url": github_url,
        "tags": ["rust"],
        "is_featured": false,
        "created_at": created_at,
        "updated_at": created_at,
    })
}
