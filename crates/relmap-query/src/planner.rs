//! Join planning for cascading reads.
//!
//! Starting at the root type the planner walks parent relations and child
//! collections breadth-first, filtered by a [`CascadeReadRule`]. Each entity
//! type is joined at most once per plan, which breaks cycles. Every joined
//! table yields one [`TypeMap`] telling the materializer which result
//! columns populate which fields and how the instance links to the others.

use std::collections::{HashSet, VecDeque};

use relmap_core::{Error, Registry, Result, TableDefinition};

use crate::builder::key_columns;
use crate::rule::{CascadeReadRule, edge_allowed};
use crate::select::{JoinCondition, JoinKind, SelectQuery};

/// One result column feeding one scalar field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub identifier: String,
    pub column_name: String,
    /// Alias the column is selected under.
    pub column_alias: String,
}

/// How a joined instance relates to an instance planned before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeLink {
    /// This instance is the parent that `source`'s `relation` points to.
    /// The parent's own collections are left untouched.
    Parent { source: usize, relation: String },
    /// This instance belongs to `source`'s `collection`, and its own
    /// `relation` points back at `source`.
    Child {
        source: usize,
        collection: String,
        relation: String,
    },
}

/// Per-table plan: alias, columns and identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMap {
    pub entity_type: String,
    pub table_alias: String,
    pub columns: Vec<ColumnMap>,
    /// Identifiers forming the identity key.
    pub key: Vec<String>,
    /// `None` for the root.
    pub link: Option<TypeLink>,
}

impl TypeMap {
    #[must_use]
    pub fn column(&self, identifier: &str) -> Option<&ColumnMap> {
        self.columns.iter().find(|c| c.identifier == identifier)
    }
}

/// A joined SELECT plus the type maps to materialize its rows.
#[derive(Debug, Clone)]
pub struct SelectPlan {
    pub query: SelectQuery,
    /// Root first, then in join order.
    pub type_maps: Vec<TypeMap>,
}

/// Plans joined SELECTs over the registered definitions.
#[derive(Debug, Clone, Copy)]
pub struct JoinPlanner<'a> {
    registry: &'a Registry,
    rule: Option<&'a CascadeReadRule>,
}

struct Node {
    index: usize,
    entity_type: String,
    alias: String,
    optional: bool,
}

impl<'a> JoinPlanner<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            rule: None,
        }
    }

    pub fn with_rule(mut self, rule: Option<&'a CascadeReadRule>) -> Self {
        self.rule = rule;
        self
    }

    /// Plan a SELECT rooted at `root_type`.
    pub fn plan(&self, root_type: &str) -> Result<SelectPlan> {
        let root_def = self.registry.definition(root_type)?;
        let mut query = SelectQuery::new(root_def.qualified_name(), "t0");
        let mut type_maps = vec![type_map(root_def, "t0", None)];
        let mut visited: HashSet<String> = HashSet::from([root_type.to_string()]);
        let mut queue = VecDeque::from([Node {
            index: 0,
            entity_type: root_type.to_string(),
            alias: "t0".to_string(),
            optional: false,
        }]);

        while let Some(node) = queue.pop_front() {
            let def = self.registry.definition(&node.entity_type)?;

            for relation in &def.parent_relations {
                let parent_type = &relation.parent_type;
                if visited.contains(parent_type)
                    || !edge_allowed(self.rule, &node.entity_type, parent_type)
                {
                    continue;
                }
                let parent_def = self.registry.definition(parent_type)?;
                let alias = format!("t{}", type_maps.len());
                let mut on = Vec::with_capacity(relation.columns.len());
                for column in &relation.columns {
                    let key = parent_def.column_def(&column.parent_identifier).ok_or_else(|| {
                        Error::configuration(format!(
                            "relation {}.{} references unknown field {}.{}",
                            def.entity_type,
                            relation.identifier,
                            parent_type,
                            column.parent_identifier
                        ))
                    })?;
                    on.push(JoinCondition::new(
                        &alias,
                        &key.column_name,
                        &node.alias,
                        &column.column_name,
                    ));
                }
                // An optional source row or a nullable key must not drop rows.
                let kind = if relation.is_required() && !node.optional {
                    JoinKind::Inner
                } else {
                    JoinKind::Left
                };
                query.join(kind, parent_def.qualified_name(), &alias, on);

                let link = TypeLink::Parent {
                    source: node.index,
                    relation: relation.identifier.clone(),
                };
                tracing::trace!(from = %node.entity_type, to = %parent_type, alias = %alias, "Joining parent");
                visited.insert(parent_type.clone());
                queue.push_back(Node {
                    index: type_maps.len(),
                    entity_type: parent_type.clone(),
                    alias: alias.clone(),
                    optional: kind == JoinKind::Left,
                });
                type_maps.push(type_map(parent_def, &alias, Some(link)));
            }

            for child in self.registry.get(&node.entity_type)?.children() {
                let child_type = &child.element_type;
                if visited.contains(child_type)
                    || !edge_allowed(self.rule, &node.entity_type, child_type)
                {
                    continue;
                }
                let child_def = self.registry.definition(child_type)?;
                let inverse = child_def.relation_to(&node.entity_type).ok_or_else(|| {
                    Error::configuration(format!(
                        "{child_type} has no parent relation back to {} for collection {}",
                        node.entity_type, child.identifier
                    ))
                })?;
                let alias = format!("t{}", type_maps.len());
                let mut on = Vec::with_capacity(inverse.columns.len());
                for column in &inverse.columns {
                    let key = def.column_def(&column.parent_identifier).ok_or_else(|| {
                        Error::configuration(format!(
                            "relation {child_type}.{} references unknown field {}.{}",
                            inverse.identifier, node.entity_type, column.parent_identifier
                        ))
                    })?;
                    on.push(JoinCondition::new(
                        &alias,
                        &column.column_name,
                        &node.alias,
                        &key.column_name,
                    ));
                }
                query.join(JoinKind::Left, child_def.qualified_name(), &alias, on);

                let link = TypeLink::Child {
                    source: node.index,
                    collection: child.identifier.clone(),
                    relation: inverse.identifier.clone(),
                };
                tracing::trace!(from = %node.entity_type, to = %child_type, alias = %alias, "Joining children");
                visited.insert(child_type.clone());
                queue.push_back(Node {
                    index: type_maps.len(),
                    entity_type: child_type.clone(),
                    alias: alias.clone(),
                    optional: true,
                });
                type_maps.push(type_map(child_def, &alias, Some(link)));
            }
        }

        for map in &type_maps {
            for column in &map.columns {
                query.column(&map.table_alias, &column.column_name, &column.column_alias);
            }
        }

        tracing::debug!(
            root = %root_type,
            tables = type_maps.len(),
            "Planned cascading select"
        );
        Ok(SelectPlan { query, type_maps })
    }
}

fn type_map(def: &TableDefinition, alias: &str, link: Option<TypeLink>) -> TypeMap {
    let columns = def
        .columns
        .iter()
        .map(|c| ColumnMap {
            identifier: c.identifier.clone(),
            column_name: c.column_name.clone(),
            column_alias: format!("{alias}_{}", c.column_name),
        })
        .collect();
    TypeMap {
        entity_type: def.entity_type.clone(),
        table_alias: alias.to_string(),
        columns,
        key: identity_key(def),
        link,
    }
}

/// Primary keys, else the single unique index, else every column.
fn identity_key(def: &TableDefinition) -> Vec<String> {
    match key_columns(def) {
        Ok(keys) => keys.into_iter().map(|c| c.identifier.clone()).collect(),
        Err(_) => def.columns.iter().map(|c| c.identifier.clone()).collect(),
    }
}
