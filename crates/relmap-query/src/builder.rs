//! Statement builders for INSERT, UPDATE and DELETE.
//!
//! Every builder is a pure function of a [`TableDefinition`] and an entity
//! instance:
//! - scalar fields bind to `:<identifier>` placeholders
//! - parent relation columns bind to `:<relation>_<parent key>` and take their
//!   value from the referenced parent instance; a bound parent wins over a
//!   scalar field mapped to the same column, and an unbound one defers to it
//! - special columns are computed here, never read from the instance
//! - UPDATE and DELETE are constrained by the key columns, never unconstrained

use chrono::{DateTime, Utc};
use relmap_core::{
    ColumnDefinition, Entity, Error, ParentRelationDefinition, Result, SpecialColumn, Statement,
    TableDefinition, Value, field_value, placeholder, quote_ident, validate_placeholder_name,
};

/// Starting value of a version column.
pub const INITIAL_VERSION: i64 = 1;

/// Columns identifying one row: the primary keys, or else the columns of
/// the single unique index.
pub fn key_columns(definition: &TableDefinition) -> Result<Vec<&ColumnDefinition>> {
    let primary = definition.primary_keys();
    if !primary.is_empty() {
        return Ok(primary);
    }
    let index = definition.single_unique_index().map_err(|_| {
        Error::configuration(format!(
            "{} has no primary key and no single unique index to identify rows",
            definition.entity_type
        ))
    })?;
    definition.index_columns(index)
}

/// Value a relation column binds to: the parent's referenced key field, or
/// `None` when no parent is bound.
fn relation_values(
    entity: &dyn Entity,
    relation: &ParentRelationDefinition,
) -> Result<Option<Vec<Value>>> {
    let Some(parent) = entity.parent(&relation.identifier) else {
        return Ok(None);
    };
    let parent = parent.borrow();
    relation
        .columns
        .iter()
        .map(|column| field_value(&*parent, &column.parent_identifier))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

type ResolvedRelation<'d> = (&'d ParentRelationDefinition, Option<Vec<Value>>);

fn resolve_relations<'d>(
    definition: &'d TableDefinition,
    entity: &dyn Entity,
) -> Result<Vec<ResolvedRelation<'d>>> {
    definition
        .parent_relations
        .iter()
        .map(|relation| relation_values(entity, relation).map(|values| (relation, values)))
        .collect()
}

/// Whether a bound parent supplies the column `column` maps to.
fn supplied_by_parent(relations: &[ResolvedRelation<'_>], column: &ColumnDefinition) -> bool {
    relations.iter().any(|(relation, values)| {
        values.is_some()
            && relation
                .columns
                .iter()
                .any(|c| c.column_name == column.column_name)
    })
}

/// Scalar field mapped to the same database column as a relation column.
fn scalar_for<'d>(definition: &'d TableDefinition, column_name: &str) -> Option<&'d ColumnDefinition> {
    definition
        .columns
        .iter()
        .find(|c| c.column_name == column_name)
}

/// A generated INSERT.
#[derive(Debug, Clone)]
pub struct InsertStatement<'d> {
    pub statement: Statement,
    /// Column whose database-generated value is returned by the statement.
    pub auto_number: Option<&'d ColumnDefinition>,
    /// Values the generator bound on the instance's behalf, by identifier:
    /// special columns plus scalar fields that a parent key overrode.
    pub generated: Vec<(String, Value)>,
}

/// INSERT builder.
///
/// # Example
///
/// ```ignore
/// let insert = InsertBuilder::new(&definition, &*blog.borrow()).build()?;
/// // INSERT INTO "blogs" ("url") VALUES (:url) RETURNING "blog_id"
/// ```
#[derive(Debug)]
pub struct InsertBuilder<'a> {
    definition: &'a TableDefinition,
    entity: &'a dyn Entity,
    now: Option<DateTime<Utc>>,
}

impl<'a> InsertBuilder<'a> {
    pub fn new(definition: &'a TableDefinition, entity: &'a dyn Entity) -> Self {
        Self {
            definition,
            entity,
            now: None,
        }
    }

    /// Use `now` as the clock for timestamp columns.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn build(&self) -> Result<InsertStatement<'a>> {
        let def = self.definition;
        let now = self.now.unwrap_or_else(Utc::now);
        let mut columns = Vec::new();
        let mut statement = Statement::default();
        let mut generated = Vec::new();
        let relations = resolve_relations(def, self.entity)?;

        for column in &def.columns {
            if column.is_auto_number || supplied_by_parent(&relations, column) {
                continue;
            }
            validate_placeholder_name(&column.identifier)?;
            let value = match column.special_column {
                SpecialColumn::CreateTimestamp | SpecialColumn::UpdateTimestamp => {
                    let value = Value::Timestamp(now);
                    generated.push((column.identifier.clone(), value.clone()));
                    value
                }
                SpecialColumn::VersionNumber => {
                    let value = Value::BigInt(INITIAL_VERSION);
                    generated.push((column.identifier.clone(), value.clone()));
                    value
                }
                SpecialColumn::None => {
                    let value = field_value(self.entity, &column.identifier)?;
                    // Let the database apply its default.
                    if value.is_null() && column.default_value.is_some() {
                        continue;
                    }
                    value
                }
            };
            columns.push(quote_ident(&column.column_name));
            statement.bind(placeholder(&column.identifier), value);
        }

        for (relation, values) in &relations {
            for (i, column) in relation.columns.iter().enumerate() {
                let scalar = scalar_for(def, &column.column_name);
                let value = match values {
                    Some(values) => values.get(i).cloned().unwrap_or(Value::Null),
                    // The scalar field already supplied this column.
                    None if scalar.is_some() => continue,
                    None => Value::Null,
                };
                let name = relation.parameter_identifier(column);
                validate_placeholder_name(&name)?;
                if let Some(scalar) = scalar {
                    generated.push((scalar.identifier.clone(), value.clone()));
                }
                columns.push(quote_ident(&column.column_name));
                statement.bind(placeholder(&name), value);
            }
        }

        let mut sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", def.qualified_name())
        } else {
            let names: Vec<&str> = statement.params().iter().map(|(n, _)| n.as_str()).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                def.qualified_name(),
                columns.join(", "),
                names.join(", ")
            )
        };

        let auto_number = def.auto_number();
        if let Some(column) = auto_number {
            sql.push_str(" RETURNING ");
            sql.push_str(&quote_ident(&column.column_name));
        }

        let params = statement.params().to_vec();
        Ok(InsertStatement {
            statement: Statement::with_params(sql, params),
            auto_number,
            generated,
        })
    }
}

/// A generated UPDATE.
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub statement: Statement,
    /// Whether the statement is guarded by a version column.
    pub versioned: bool,
    /// Values the row holds after a successful update, by identifier.
    pub generated: Vec<(String, Value)>,
    /// Key identifiers and values the WHERE clause matches on.
    pub conditions: Vec<(String, Value)>,
}

/// UPDATE builder.
///
/// Sets every column except keys, the auto-number column and creation
/// timestamps. A version column is guarded in WHERE and incremented in SET.
#[derive(Debug)]
pub struct UpdateBuilder<'a> {
    definition: &'a TableDefinition,
    entity: &'a dyn Entity,
    now: Option<DateTime<Utc>>,
}

impl<'a> UpdateBuilder<'a> {
    pub fn new(definition: &'a TableDefinition, entity: &'a dyn Entity) -> Self {
        Self {
            definition,
            entity,
            now: None,
        }
    }

    /// Use `now` as the clock for update timestamps.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn build(&self) -> Result<UpdateStatement> {
        let def = self.definition;
        let now = self.now.unwrap_or_else(Utc::now);
        let keys = key_columns(def)?;
        let is_key = |c: &ColumnDefinition| keys.iter().any(|k| k.identifier == c.identifier);

        let mut sets = Vec::new();
        let mut statement = Statement::default();
        let mut generated = Vec::new();
        let mut version_guard = None;
        let relations = resolve_relations(def, self.entity)?;

        for column in &def.columns {
            if column.is_auto_number || is_key(column) || supplied_by_parent(&relations, column) {
                continue;
            }
            validate_placeholder_name(&column.identifier)?;
            let name = quote_ident(&column.column_name);
            match column.special_column {
                SpecialColumn::CreateTimestamp => {}
                SpecialColumn::UpdateTimestamp => {
                    let value = Value::Timestamp(now);
                    generated.push((column.identifier.clone(), value.clone()));
                    sets.push(format!("{name} = {}", placeholder(&column.identifier)));
                    statement.bind(placeholder(&column.identifier), value);
                }
                SpecialColumn::VersionNumber => {
                    let current = field_value(self.entity, &column.identifier)?;
                    match current.as_i64() {
                        Some(v) => {
                            generated.push((column.identifier.clone(), Value::BigInt(v + 1)));
                            sets.push(format!("{name} = {name} + 1"));
                        }
                        // NULL + 1 stays NULL, so a missing version restarts.
                        None => {
                            let next = format!("{}_next", column.identifier);
                            validate_placeholder_name(&next)?;
                            generated
                                .push((column.identifier.clone(), Value::BigInt(INITIAL_VERSION)));
                            sets.push(format!("{name} = {}", placeholder(&next)));
                            statement.bind(placeholder(&next), Value::BigInt(INITIAL_VERSION));
                        }
                    }
                    version_guard = Some((column, current));
                }
                SpecialColumn::None => {
                    let value = field_value(self.entity, &column.identifier)?;
                    sets.push(format!("{name} = {}", placeholder(&column.identifier)));
                    statement.bind(placeholder(&column.identifier), value);
                }
            }
        }

        for (relation, values) in relations {
            // An unbound parent leaves the stored foreign key untouched.
            let Some(values) = values else {
                continue;
            };
            for (column, value) in relation.columns.iter().zip(values) {
                let scalar = scalar_for(def, &column.column_name);
                // Keys only ever appear in WHERE.
                if scalar.is_some_and(is_key) {
                    continue;
                }
                let name = relation.parameter_identifier(column);
                validate_placeholder_name(&name)?;
                if let Some(scalar) = scalar {
                    generated.push((scalar.identifier.clone(), value.clone()));
                }
                sets.push(format!(
                    "{} = {}",
                    quote_ident(&column.column_name),
                    placeholder(&name)
                ));
                statement.bind(placeholder(&name), value);
            }
        }

        let mut conditions = Vec::with_capacity(keys.len());
        let mut predicates = Vec::with_capacity(keys.len() + 1);
        for key in &keys {
            validate_placeholder_name(&key.identifier)?;
            let value = field_value(self.entity, &key.identifier)?;
            predicates.push(format!(
                "{} = {}",
                quote_ident(&key.column_name),
                placeholder(&key.identifier)
            ));
            statement.bind(placeholder(&key.identifier), value.clone());
            conditions.push((key.identifier.clone(), value));
        }

        // Key-only tables still need a valid SET list.
        if sets.is_empty() {
            let key = keys[0];
            sets.push(format!(
                "{} = {}",
                quote_ident(&key.column_name),
                placeholder(&key.identifier)
            ));
        }

        let versioned = version_guard.is_some();
        if let Some((column, current)) = version_guard {
            let name = quote_ident(&column.column_name);
            if current.is_null() {
                predicates.push(format!("{name} IS NULL"));
            } else {
                predicates.push(format!("{name} = {}", placeholder(&column.identifier)));
                statement.bind(placeholder(&column.identifier), current.clone());
            }
            conditions.push((column.identifier.clone(), current));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            def.qualified_name(),
            sets.join(", "),
            predicates.join(" AND ")
        );
        let params = statement.params().to_vec();
        Ok(UpdateStatement {
            statement: Statement::with_params(sql, params),
            versioned,
            generated,
            conditions,
        })
    }
}

/// DELETE builder. The WHERE clause covers the key columns only.
#[derive(Debug)]
pub struct DeleteBuilder<'a> {
    definition: &'a TableDefinition,
    entity: &'a dyn Entity,
}

impl<'a> DeleteBuilder<'a> {
    pub fn new(definition: &'a TableDefinition, entity: &'a dyn Entity) -> Self {
        Self { definition, entity }
    }

    pub fn build(&self) -> Result<Statement> {
        let def = self.definition;
        let keys = key_columns(def)?;
        let mut statement = Statement::default();
        let mut predicates = Vec::with_capacity(keys.len());
        for key in keys {
            validate_placeholder_name(&key.identifier)?;
            predicates.push(format!(
                "{} = {}",
                quote_ident(&key.column_name),
                placeholder(&key.identifier)
            ));
            statement.bind(
                placeholder(&key.identifier),
                field_value(self.entity, &key.identifier)?,
            );
        }
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            def.qualified_name(),
            predicates.join(" AND ")
        );
        Ok(Statement::with_params(sql, statement.params().to_vec()))
    }
}
