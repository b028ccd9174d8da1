/// Schema used when neither the record type nor the connection names one
pub const DEFAULT_SCHEMA: &str = "main";

/// The table a record type is persisted in
///
/// `schema` is optional: a binding without one is resolved against the
/// session's default schema when a repository is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableBinding {
    schema: Option<String>,
    name: String,
}

impl TableBinding {
    /// Explicit schema and table name
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Table name only; the schema comes from the session
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Convention: the unqualified type name with generic arguments stripped
    ///
    /// `app::model::Product` binds to `Product`, `app::Wrapper<Foo>` to
    /// `Wrapper`.
    pub fn conventional<T: ?Sized>() -> Self {
        Self::unqualified(type_stem(std::any::type_name::<T>()))
    }

    /// Fill in `schema` unless the binding already names one
    pub fn or_schema(mut self, schema: &str) -> Self {
        if self.schema.is_none() {
            self.schema = Some(schema.to_string());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// `[schema].[Name]`, or `[Name]` when no schema is set
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }

    /// `[Name]` regardless of schema
    pub fn bare(&self) -> String {
        quote_ident(&self.name)
    }
}

/// Bracket-quote an identifier, doubling any closing bracket inside it
pub fn quote_ident(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

fn type_stem(type_name: &str) -> &str {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
