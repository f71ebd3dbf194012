//! # Databases
//!
//! A lightweight table attached to the workspace: a list of typed
//! [`Property`] columns and rows of cells. Cells are a closed union,
//! [`PropertyValue`], and every write is checked against the column's
//! [`PropertyKind`] so a row can never hold a value its column cannot show.
//!
//! Select columns accept an option by id or, case-insensitively, by name; the
//! id is what gets stored.

use crate::error::{NoteError, Result};
use crate::model::{id_type, Color, PageId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

id_type!(
    /// Identifier of a database.
    DatabaseId
);
id_type!(
    /// Identifier of a row within a database.
    RowId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Text,
    Number,
    Select,
    MultiSelect,
    Date,
    Checkbox,
    Url,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyKind::Text => "text",
            PropertyKind::Number => "number",
            PropertyKind::Select => "select",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::Date => "date",
            PropertyKind::Checkbox => "checkbox",
            PropertyKind::Url => "url",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: Color,
}

fn default_color() -> Color {
    Color::Default
}

impl SelectOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: Color) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl Property {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    /// Finds an option by id, then by case-insensitive name.
    pub fn resolve_option(&self, key: &str) -> Option<&SelectOption> {
        self.options.iter().find(|o| o.id == key).or_else(|| {
            let key = key.to_lowercase();
            self.options.iter().find(|o| o.name.to_lowercase() == key)
        })
    }

    /// Checks `value` against this column and returns it in stored form
    /// (select options resolved to their ids).
    pub fn normalize(&self, value: PropertyValue) -> Result<PropertyValue> {
        if value.kind() != self.kind {
            return Err(NoteError::InvalidProperty(format!(
                "'{}' holds {} values, got {}",
                self.name,
                self.kind,
                value.kind()
            )));
        }
        match value {
            PropertyValue::Number(n) if !n.is_finite() => Err(NoteError::InvalidProperty(
                format!("'{}' needs a finite number", self.name),
            )),
            PropertyValue::Url(url) if !looks_like_url(&url) => Err(NoteError::InvalidProperty(
                format!("'{}' is not a URL: {}", self.name, url),
            )),
            PropertyValue::Select(key) => Ok(PropertyValue::Select(self.option_id(&key)?)),
            PropertyValue::MultiSelect(keys) => {
                let mut ids = Vec::with_capacity(keys.len());
                for key in &keys {
                    let id = self.option_id(key)?;
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                Ok(PropertyValue::MultiSelect(ids))
            }
            other => Ok(other),
        }
    }

    fn option_id(&self, key: &str) -> Result<String> {
        self.resolve_option(key)
            .map(|o| o.id.clone())
            .ok_or_else(|| {
                NoteError::InvalidProperty(format!("'{}' has no option '{}'", self.name, key))
            })
    }
}

fn looks_like_url(s: &str) -> bool {
    match s.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+.-".contains(c))
                && !rest.is_empty()
                && !s.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    /// Option id.
    Select(String),
    /// Option ids, without duplicates.
    MultiSelect(Vec<String>),
    Date(NaiveDate),
    Checkbox(bool),
    Url(String),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Text(_) => PropertyKind::Text,
            PropertyValue::Number(_) => PropertyKind::Number,
            PropertyValue::Select(_) => PropertyKind::Select,
            PropertyValue::MultiSelect(_) => PropertyKind::MultiSelect,
            PropertyValue::Date(_) => PropertyKind::Date,
            PropertyValue::Checkbox(_) => PropertyKind::Checkbox,
            PropertyValue::Url(_) => PropertyKind::Url,
        }
    }

    /// Plain-text rendering used for filtering and row search.
    pub fn as_text(&self) -> String {
        match self {
            PropertyValue::Text(s) | PropertyValue::Select(s) | PropertyValue::Url(s) => s.clone(),
            PropertyValue::Number(n) => n.to_string(),
            PropertyValue::MultiSelect(ids) => ids.join(", "),
            PropertyValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            PropertyValue::Checkbox(b) => b.to_string(),
        }
    }

    fn compare(&self, other: &PropertyValue) -> Ordering {
        match (self, other) {
            (PropertyValue::Number(a), PropertyValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (PropertyValue::Date(a), PropertyValue::Date(b)) => a.cmp(b),
            (PropertyValue::Checkbox(a), PropertyValue::Checkbox(b)) => a.cmp(b),
            _ => self.as_text().to_lowercase().cmp(&other.as_text().to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseRow {
    pub id: RowId,
    /// Page holding the row's body, if one was opened.
    #[serde(default)]
    pub page_id: Option<PageId>,
    #[serde(default)]
    pub cells: BTreeMap<String, PropertyValue>,
}

impl DatabaseRow {
    pub fn cell(&self, property: &str) -> Option<&PropertyValue> {
        self.cells.get(property)
    }

    fn cell_text(&self, property: &str) -> String {
        self.cell(property).map(PropertyValue::as_text).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Contains,
    Equals,
    NotEquals,
}

/// Case-insensitive condition on the text rendering of one cell.
/// A missing cell reads as the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub property: String,
    pub op: FilterOp,
    pub value: String,
}

impl RowFilter {
    pub fn new(property: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &DatabaseRow) -> bool {
        let cell = row.cell_text(&self.property).to_lowercase();
        let value = self.value.to_lowercase();
        match self.op {
            FilterOp::Contains => cell.contains(&value),
            FilterOp::Equals => cell == value,
            FilterOp::NotEquals => cell != value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: DatabaseId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub properties: Vec<Property>,
    pub rows: Vec<DatabaseRow>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DatabaseId::new(),
            name: name.into(),
            icon: None,
            properties: Vec::new(),
            rows: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn property(&self, id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn row(&self, id: RowId) -> Option<&DatabaseRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn unknown_property(&self, id: &str) -> NoteError {
        NoteError::InvalidProperty(format!("'{}' has no property '{}'", self.name, id))
    }

    fn normalize(&self, property: &str, value: PropertyValue) -> Result<PropertyValue> {
        self.property(property)
            .ok_or_else(|| self.unknown_property(property))?
            .normalize(value)
    }

    pub fn add_property(&mut self, property: Property) -> Result<()> {
        if self.property(&property.id).is_some() {
            return Err(NoteError::InvalidProperty(format!(
                "'{}' already has a property '{}'",
                self.name, property.id
            )));
        }
        self.properties.push(property);
        self.touch();
        Ok(())
    }

    /// Removes the column together with every cell it held.
    pub fn remove_property(&mut self, id: &str) -> Option<Property> {
        let idx = self.properties.iter().position(|p| p.id == id)?;
        let removed = self.properties.remove(idx);
        for row in &mut self.rows {
            row.cells.remove(id);
        }
        self.touch();
        Some(removed)
    }

    /// Adds a row after validating every cell. Nothing is added on error.
    pub fn add_row(
        &mut self,
        cells: impl IntoIterator<Item = (String, PropertyValue)>,
    ) -> Result<RowId> {
        let mut validated = BTreeMap::new();
        for (property, value) in cells {
            let value = self.normalize(&property, value)?;
            validated.insert(property, value);
        }
        let row = DatabaseRow {
            id: RowId::new(),
            page_id: None,
            cells: validated,
        };
        let id = row.id;
        self.rows.push(row);
        self.touch();
        Ok(id)
    }

    /// Sets (`Some`) or clears (`None`) one cell.
    pub fn set_cell(
        &mut self,
        row: RowId,
        property: &str,
        value: Option<PropertyValue>,
    ) -> Result<()> {
        let value = value.map(|v| self.normalize(property, v)).transpose()?;
        if self.property(property).is_none() {
            return Err(self.unknown_property(property));
        }
        let target = self
            .rows
            .iter_mut()
            .find(|r| r.id == row)
            .ok_or_else(|| NoteError::RecordNotFound {
                table: "row",
                id: row.to_string(),
            })?;
        match value {
            Some(value) => target.cells.insert(property.to_string(), value),
            None => target.cells.remove(property),
        };
        self.touch();
        Ok(())
    }

    pub fn link_page(&mut self, row: RowId, page: PageId) -> Option<&DatabaseRow> {
        let target = self.rows.iter_mut().find(|r| r.id == row)?;
        target.page_id = Some(page);
        Some(&*target)
    }

    pub fn remove_row(&mut self, row: RowId) -> Option<DatabaseRow> {
        let idx = self.rows.iter().position(|r| r.id == row)?;
        let removed = self.rows.remove(idx);
        self.touch();
        Some(removed)
    }

    /// Rows passing every filter, in insertion order.
    pub fn rows_matching(&self, filters: &[RowFilter]) -> Vec<&DatabaseRow> {
        self.rows
            .iter()
            .filter(|row| filters.iter().all(|f| f.matches(row)))
            .collect()
    }

    /// Rows ordered by one column. Missing cells sort first when ascending;
    /// ties keep insertion order.
    pub fn sorted_rows(&self, property: &str, direction: SortDirection) -> Vec<&DatabaseRow> {
        let mut rows: Vec<&DatabaseRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            let ord = match (a.cell(property), b.cell(property)) {
                (Some(x), Some(y)) => x.compare(y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        rows
    }

    /// Board view: one column per option of a select property, in option order.
    pub fn group_by_select(&self, property: &str) -> Result<Vec<(&SelectOption, Vec<&DatabaseRow>)>> {
        let prop = self
            .property(property)
            .ok_or_else(|| self.unknown_property(property))?;
        if prop.kind != PropertyKind::Select {
            return Err(NoteError::InvalidProperty(format!(
                "'{}' is not a select property",
                prop.name
            )));
        }
        Ok(prop
            .options
            .iter()
            .map(|option| {
                let rows = self
                    .rows
                    .iter()
                    .filter(|r| matches!(r.cell(property), Some(PropertyValue::Select(id)) if *id == option.id))
                    .collect();
                (option, rows)
            })
            .collect())
    }

    /// Rows where any cell contains `query`, case-insensitive.
    pub fn search_rows(&self, query: &str) -> Vec<&DatabaseRow> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.rows
            .iter()
            .filter(|row| {
                row.cells
                    .values()
                    .any(|v| v.as_text().to_lowercase().contains(&query))
            })
            .collect()
    }
}
