use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::{deserialize_some, optional_text, required_text},
    error::{AppResult, FieldErrors},
    models::Category,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

impl CreateCategoryRequest {
    pub fn into_command(self) -> AppResult<NewCategory> {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", self.name);
        errors.finish(NewCategory {
            name,
            description: optional_text(self.description),
            active: self.active.unwrap_or(true),
        })
    }
}

impl UpdateCategoryRequest {
    pub fn into_patch(self) -> AppResult<CategoryPatch> {
        let mut errors = FieldErrors::new();
        let name = self
            .name
            .map(|name| required_text(&mut errors, "name", Some(name)));
        errors.finish(CategoryPatch {
            name,
            description: self.description.map(optional_text),
            active: self.active,
        })
    }
}
