use uuid::Uuid;

use crate::convert::FieldValue;
use crate::model::{TableBinding, Value};

/// SQL text plus named parameters
///
/// Parameter names carry their `@` prefix. Values are always bound, never
/// spliced into the text; [`Statement::render_inline`] exists only for logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    text: String,
    params: Vec<(String, Value)>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Bind a named parameter; the `@` prefix is added when missing
    ///
    /// Re-binding a name replaces its value.
    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        let name = param_name(name);
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name, value)),
        }
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<(String, Value)>) {
        (self.text, self.params)
    }

    /// The text with every bound `@name` replaced by its literal
    pub fn render_inline(&self) -> String {
        let mut rendered = String::with_capacity(self.text.len());
        let mut chars = self.text.char_indices().peekable();
        while let Some((start, ch)) = chars.next() {
            if ch != '@' {
                rendered.push(ch);
                continue;
            }
            let mut end = start + 1;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let token = &self.text[start..end];
            match self.params.iter().find(|(n, _)| n == token) {
                Some((_, value)) => rendered.push_str(&value.to_literal()),
                None => rendered.push_str(token),
            }
        }
        rendered
    }

    /// `SELECT COUNT(*) FROM [schema].[T] WHERE (Id = @id)`
    pub fn exists_by_id(table: &TableBinding, id: Uuid) -> Self {
        Self::new(format!(
            "SELECT COUNT(*) FROM {} WHERE (Id = @id)",
            table.qualified()
        ))
        .bind("@id", id.to_value())
    }

    /// `SELECT * FROM [schema].[T] WHERE (Id = @id)`
    pub fn select_by_id(table: &TableBinding, id: Uuid) -> Self {
        Self::new(format!("SELECT * FROM {} WHERE (Id = @id)", table.qualified()))
            .bind("@id", id.to_value())
    }

    /// `SELECT * FROM [schema].[T]`
    pub fn select_all(table: &TableBinding) -> Self {
        Self::new(format!("SELECT * FROM {}", table.qualified()))
    }

    /// `SELECT COUNT(*) FROM [schema].[T]`
    pub fn count_all(table: &TableBinding) -> Self {
        Self::new(format!("SELECT COUNT(*) FROM {}", table.qualified()))
    }

    /// `INSERT INTO [T] (c1, c2) VALUES (@c1, @c2)`
    pub fn insert(table: &TableBinding, columns: Vec<(String, Value)>) -> Self {
        let names: Vec<&str> = columns.iter().map(|(c, _)| c.as_str()).collect();
        let placeholders: Vec<String> = names.iter().map(|c| param_name(c)).collect();
        let text = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.bare(),
            names.join(", "),
            placeholders.join(", ")
        );
        columns
            .into_iter()
            .fold(Self::new(text), |stmt, (column, value)| stmt.bind(&column, value))
    }

    /// `UPDATE [schema].[T] SET c2 = @c2, ... WHERE (Id = @Id)`
    ///
    /// An `Id` entry in `columns` is not assigned; `id` is bound as `@Id`.
    /// Returns `None` when nothing besides the id is left to assign.
    pub fn update(table: &TableBinding, id: Uuid, columns: Vec<(String, Value)>) -> Option<Self> {
        let assigned: Vec<(String, Value)> = columns
            .into_iter()
            .filter(|(c, _)| !c.eq_ignore_ascii_case("Id"))
            .collect();
        if assigned.is_empty() {
            return None;
        }
        let set_list: Vec<String> = assigned
            .iter()
            .map(|(c, _)| format!("{} = {}", c, param_name(c)))
            .collect();
        let text = format!(
            "UPDATE {} SET {} WHERE (Id = @Id)",
            table.qualified(),
            set_list.join(", ")
        );
        let stmt = assigned
            .into_iter()
            .fold(Self::new(text), |stmt, (column, value)| stmt.bind(&column, value));
        Some(stmt.bind("@Id", id.to_value()))
    }

    /// `DELETE FROM [schema].[T] WHERE (Id = @id)`
    pub fn delete(table: &TableBinding, id: Uuid) -> Self {
        Self::new(format!("DELETE FROM {} WHERE (Id = @id)", table.qualified()))
            .bind("@id", id.to_value())
    }
}

fn param_name(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}
