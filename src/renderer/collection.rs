//! Rendering a list of records through item templates
//!
//! Each record is bound under the collection's type name (`Product`) and the
//! collection metadata under the same name prefixed with `$` (`$Product`).

use serde::Deserialize;

use crate::context::RenderContext;
use crate::eval::Value;
use crate::renderer::template::Renderer;

/// Templates for the parts of a rendered collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollectionTemplates {
    /// Rendered once before the items
    pub first_item: Option<String>,
    /// Rendered once per record
    pub item: Option<String>,
    /// Rendered instead of the items when there are none
    pub no_item: Option<String>,
    /// Rendered once after the items
    pub last_item: Option<String>,
    /// Rendered by [`Renderer::render_collection_error`]
    pub error: Option<String>,
}

impl CollectionTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first_item(mut self, template: impl Into<String>) -> Self {
        self.first_item = Some(template.into());
        self
    }

    pub fn with_item(mut self, template: impl Into<String>) -> Self {
        self.item = Some(template.into());
        self
    }

    pub fn with_no_item(mut self, template: impl Into<String>) -> Self {
        self.no_item = Some(template.into());
        self
    }

    pub fn with_last_item(mut self, template: impl Into<String>) -> Self {
        self.last_item = Some(template.into());
        self
    }

    pub fn with_error(mut self, template: impl Into<String>) -> Self {
        self.error = Some(template.into());
        self
    }
}

fn meta_key(type_name: &str) -> String {
    format!("${}", type_name)
}

impl Renderer {
    /// Render `items` through `templates` and concatenate the pieces
    ///
    /// `base` supplies the socket snapshot and any extra variables.
    pub fn render_collection(
        &self,
        templates: &CollectionTemplates,
        type_name: &str,
        items: &[Value],
        meta: &Value,
        base: &RenderContext,
    ) -> String {
        let meta_ctx = base.clone().with(meta_key(type_name), meta.clone());
        let mut pieces = Vec::with_capacity(items.len() + 2);

        if let Some(first) = &templates.first_item {
            pieces.push(self.render(first, &meta_ctx));
        }
        match (&templates.no_item, &templates.item) {
            (Some(no_item), _) if items.is_empty() => pieces.push(self.render(no_item, &meta_ctx)),
            (_, Some(item)) => {
                for record in items {
                    let ctx = meta_ctx.clone().with(type_name, record.clone());
                    pieces.push(self.render(item, &ctx));
                }
            }
            _ => {}
        }
        if let Some(last) = &templates.last_item {
            pieces.push(self.render(last, &meta_ctx));
        }

        pieces.concat()
    }

    /// Render the error template with `{ "$<type>": { error: { message } } }`
    ///
    /// Empty when there is no error template.
    pub fn render_collection_error(
        &self,
        templates: &CollectionTemplates,
        type_name: &str,
        message: &str,
        base: &RenderContext,
    ) -> String {
        let Some(template) = &templates.error else {
            return String::new();
        };
        let error = Value::object([("message", Value::from(message))]);
        let ctx = base
            .clone()
            .with(meta_key(type_name), Value::object([("error", error)]));
        self.render(template, &ctx)
    }
}
