//! The employee record synchronized between the local store and the remote
//! directory.

use serde::{Deserialize, Serialize};

/// A single employee as held locally and served by the remote directory.
///
/// `id` is the primary key everywhere: upserting a record whose id already
/// exists replaces the prior record whole, never field by field. The serde
/// names match the remote directory's JSON fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier, assigned by the remote directory.
    pub id: u32,
    /// Display name.
    #[serde(rename = "employee_name")]
    pub name: String,
    /// Salary in whole currency units.
    #[serde(rename = "employee_salary")]
    pub salary: u32,
    /// Age in years.
    #[serde(rename = "employee_age")]
    pub age: u32,
    /// Profile image URL; empty when none is set.
    #[serde(rename = "profile_image", default)]
    pub image_url: String,
}

impl Employee {
    /// Create an employee with an empty image URL.
    pub fn new(id: u32, name: impl Into<String>, salary: u32, age: u32) -> Self {
        Self {
            id,
            name: name.into(),
            salary,
            age,
            image_url: String::new(),
        }
    }

    /// Set the profile image URL.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }
}
