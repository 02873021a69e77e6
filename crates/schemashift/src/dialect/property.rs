//! Column property and foreign key action fragments of a dialect.

use std::collections::HashMap;

use crate::core::schema::{ColumnProperty, ForeignKeyAction, ForeignKeyEvent};

/// Immutable map from single column properties to SQL fragments.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    fragments: HashMap<ColumnProperty, String>,
}

impl PropertyMap {
    pub fn builder() -> PropertyMapBuilder {
        PropertyMapBuilder::default()
    }

    /// Fragment for a property, or an empty string when the dialect has none.
    pub fn resolve(&self, property: ColumnProperty) -> &str {
        self.fragments.get(&property).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyMapBuilder {
    fragments: HashMap<ColumnProperty, String>,
}

impl PropertyMapBuilder {
    pub fn put(mut self, property: ColumnProperty, fragment: impl Into<String>) -> Self {
        self.fragments.insert(property, fragment.into());
        self
    }

    pub fn build(self) -> PropertyMap {
        PropertyMap {
            fragments: self.fragments,
        }
    }
}

/// Immutable map from referential actions to SQL fragments.
#[derive(Debug, Clone, Default)]
pub struct ForeignKeyActionMap {
    fragments: HashMap<ForeignKeyAction, String>,
}

impl ForeignKeyActionMap {
    pub fn builder() -> ForeignKeyActionMapBuilder {
        ForeignKeyActionMapBuilder::default()
    }

    /// Render `ON DELETE <fragment>` / `ON UPDATE <fragment>`, or an empty
    /// string when the action is not mapped.
    pub fn resolve(&self, action: ForeignKeyAction, event: ForeignKeyEvent) -> String {
        match self.fragments.get(&action) {
            Some(fragment) if !fragment.is_empty() => format!("{} {}", event.keyword(), fragment),
            _ => String::new(),
        }
    }

    pub fn supports(&self, action: ForeignKeyAction) -> bool {
        self.fragments.contains_key(&action)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForeignKeyActionMapBuilder {
    fragments: HashMap<ForeignKeyAction, String>,
}

impl ForeignKeyActionMapBuilder {
    pub fn put(mut self, action: ForeignKeyAction, fragment: impl Into<String>) -> Self {
        self.fragments.insert(action, fragment.into());
        self
    }

    /// Referential actions shared by every built-in dialect.
    pub fn standard(self) -> Self {
        self.put(ForeignKeyAction::Cascade, "CASCADE")
            .put(ForeignKeyAction::SetNull, "SET NULL")
            .put(ForeignKeyAction::SetDefault, "SET DEFAULT")
    }

    pub fn build(self) -> ForeignKeyActionMap {
        ForeignKeyActionMap {
            fragments: self.fragments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_map_missing_is_empty() {
        let map = PropertyMap::builder()
            .put(ColumnProperty::NOT_NULL, "NOT NULL")
            .build();
        assert_eq!(map.resolve(ColumnProperty::NOT_NULL), "NOT NULL");
        assert_eq!(map.resolve(ColumnProperty::UNSIGNED), "");
    }

    #[test]
    fn test_fk_action_rendering() {
        let map = ForeignKeyActionMap::builder()
            .standard()
            .put(ForeignKeyAction::Restrict, "RESTRICT")
            .build();
        assert_eq!(
            map.resolve(ForeignKeyAction::Cascade, ForeignKeyEvent::Delete),
            "ON DELETE CASCADE"
        );
        assert_eq!(
            map.resolve(ForeignKeyAction::SetNull, ForeignKeyEvent::Update),
            "ON UPDATE SET NULL"
        );
        assert_eq!(
            map.resolve(ForeignKeyAction::NoAction, ForeignKeyEvent::Delete),
            ""
        );
    }
}
