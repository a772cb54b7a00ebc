//! SQL data-definition parser
//!
//! `CREATE TABLE` statements become table concepts and `{table}.{column}`
//! column concepts linked `skos:broader` to their table. Tables keep their
//! schema qualifier, so `sales.users` and `hr.users` are distinct. A foreign
//! key becomes `skos:relatedMatch` between the two columns when both are
//! declared in the same document. Other statements are ignored.

use crate::{Error, FormatParser, Result, SourceInput};
use sqlparser::ast::{ColumnOption, CreateTable, Ident, ObjectName, Statement, TableConstraint};
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, dialect_from_str};
use sqlparser::parser::{Parser, ParserError};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use ufsa_model::{ColumnInfo, ConceptKind, ForeignKeyRef, GraphFragment, Predicate};
use ufsa_registry::SourceFormat;

/// Parser for SQL DDL scripts
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlDdlParser;

struct TableDef {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: Vec<String>,
    foreign_keys: Vec<ForeignKeyDef>,
}

struct ColumnDef {
    name: String,
    data_type: String,
    not_null: bool,
}

struct ForeignKeyDef {
    columns: Vec<String>,
    table: String,
    /// Empty means the referenced table's primary key
    referred: Vec<String>,
}

impl TableDef {
    fn from_statement(create: &CreateTable) -> Self {
        let mut table = Self {
            name: object_name(&create.name),
            columns: Vec::with_capacity(create.columns.len()),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        };

        for column in &create.columns {
            let mut not_null = false;
            for option in &column.options {
                match &option.option {
                    ColumnOption::NotNull => not_null = true,
                    ColumnOption::Unique { is_primary: true, .. } => {
                        table.primary_key.push(column.name.value.clone());
                    }
                    ColumnOption::ForeignKey {
                        foreign_table,
                        referred_columns,
                        ..
                    } => table.foreign_keys.push(ForeignKeyDef {
                        columns: vec![column.name.value.clone()],
                        table: object_name(foreign_table),
                        referred: idents(referred_columns),
                    }),
                    _ => {}
                }
            }
            table.columns.push(ColumnDef {
                name: column.name.value.clone(),
                data_type: column.data_type.to_string(),
                not_null,
            });
        }

        for constraint in &create.constraints {
            match constraint {
                TableConstraint::PrimaryKey { columns, .. } => {
                    table.primary_key.extend(idents(columns));
                }
                TableConstraint::ForeignKey {
                    columns,
                    foreign_table,
                    referred_columns,
                    ..
                } => table.foreign_keys.push(ForeignKeyDef {
                    columns: idents(columns),
                    table: object_name(foreign_table),
                    referred: idents(referred_columns),
                }),
                _ => {}
            }
        }
        table
    }

    fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    fn is_primary(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

impl FormatParser for SqlDdlParser {
    fn format(&self) -> SourceFormat {
        SourceFormat::SqlDdl
    }

    fn parse(&self, input: &SourceInput<'_>) -> Result<GraphFragment> {
        let source_id = input.source_id();
        let dialect = dialect_for(input)?;
        let statements = Parser::parse_sql(&*dialect, input.content)
            .map_err(|e| Error::syntax(source_id, error_line(&e), e.to_string()))?;

        let mut tables: Vec<TableDef> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for statement in &statements {
            let Statement::CreateTable(create) = statement else {
                continue;
            };
            let table = TableDef::from_statement(create);
            if by_name.insert(table.name.to_lowercase(), tables.len()).is_some() {
                return Err(Error::contract(
                    source_id,
                    SourceFormat::SqlDdl,
                    format!("table '{}' is created twice", table.name),
                ));
            }
            tables.push(table);
        }

        let mut fragment = input.fragment();
        for table in &tables {
            let links = self.resolve_foreign_keys(table, &tables, &by_name, &mut fragment);

            let table_concept = fragment
                .concept(&table.name, table.name.as_str())
                .with_kind(ConceptKind::Table)
                .with_note("primary_key", table.primary_key.join(","));
            let table_id = table_concept.id.clone();
            input.add(&mut fragment, table_concept)?;

            for column in &table.columns {
                let key = format!("{}.{}", table.name, column.name);
                let link = links.get(&column.name);
                let info = ColumnInfo {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    data_type: column.data_type.clone(),
                    nullable: !(column.not_null || table.is_primary(&column.name)),
                    foreign_key: link.map(|l| l.reference.clone()),
                };
                let concept = fragment
                    .concept(&key, key.as_str())
                    .with_notation(column.data_type.as_str())
                    .with_kind(ConceptKind::Column(info));
                let column_id = concept.id.clone();
                input.add(&mut fragment, concept)?;
                fragment.add_relation(column_id.clone(), Predicate::Broader, table_id.clone());

                if let Some(link) = link.filter(|l| l.declared) {
                    let target = fragment.concept_id(&format!("{}.{}", link.reference.table, link.reference.column));
                    fragment.add_relation(column_id, Predicate::RelatedMatch, target);
                }
            }
        }

        debug!(
            source = source_id,
            statements = statements.len(),
            tables = tables.len(),
            concepts = fragment.concept_count(),
            "Parsed SQL DDL"
        );
        Ok(fragment)
    }
}

/// Resolved foreign key of one column
struct Link {
    reference: ForeignKeyRef,
    /// Both ends are declared in this document
    declared: bool,
}

impl SqlDdlParser {
    fn resolve_foreign_keys(
        &self,
        table: &TableDef,
        tables: &[TableDef],
        by_name: &HashMap<String, usize>,
        fragment: &mut GraphFragment,
    ) -> BTreeMap<String, Link> {
        let mut links = BTreeMap::new();
        for fk in &table.foreign_keys {
            let target = find_table(tables, by_name, &fk.table);
            let referred = if fk.referred.is_empty() {
                target.map(|t| t.primary_key.clone()).unwrap_or_default()
            } else {
                fk.referred.clone()
            };
            if referred.len() != fk.columns.len() {
                fragment.warn(format!(
                    "{}: foreign key ({}) to '{}' has mismatched column count, ignored",
                    table.name,
                    fk.columns.join(","),
                    fk.table
                ));
                continue;
            }

            for (column, referred) in fk.columns.iter().zip(referred) {
                let Some(source) = table.column(column) else {
                    fragment.warn(format!(
                        "{}: foreign key column '{column}' is not declared",
                        table.name
                    ));
                    continue;
                };
                let resolved = target.and_then(|t| t.column(&referred).map(|c| (t, c)));
                let (reference, declared) = match resolved {
                    Some((t, c)) => (
                        ForeignKeyRef {
                            table: t.name.clone(),
                            column: c.name.clone(),
                        },
                        true,
                    ),
                    None => {
                        fragment.warn(format!(
                            "{}.{}: referenced column {}.{referred} is not declared in this document",
                            table.name, source.name, fk.table
                        ));
                        (
                            ForeignKeyRef {
                                table: fk.table.clone(),
                                column: referred,
                            },
                            false,
                        )
                    }
                };
                links.insert(source.name.clone(), Link { reference, declared });
            }
        }
        links
    }
}

fn dialect_for(input: &SourceInput<'_>) -> Result<Box<dyn Dialect>> {
    match input.descriptor.metadata("dialect") {
        Some(name) => dialect_from_str(name).ok_or_else(|| {
            Error::contract(
                input.source_id(),
                SourceFormat::SqlDdl,
                format!("unknown SQL dialect '{name}'"),
            )
        }),
        None if input.content.contains('`') => Ok(Box::new(MySqlDialect {})),
        None => Ok(Box::new(GenericDialect {})),
    }
}

/// Qualified name with quoting removed, e.g. `sales.users`
fn object_name(name: &ObjectName) -> String {
    if name.0.is_empty() {
        return name.to_string();
    }
    idents(&name.0).join(".")
}

/// Last segment of a qualified name
fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Exact qualified match first, then a unique match on the unqualified
/// name, so `REFERENCES users` finds `sales.users` when it is the only one
fn find_table<'t>(tables: &'t [TableDef], by_name: &HashMap<String, usize>, name: &str) -> Option<&'t TableDef> {
    if let Some(&idx) = by_name.get(&name.to_lowercase()) {
        return Some(&tables[idx]);
    }
    let wanted = unqualified(name);
    let mut candidates = tables
        .iter()
        .filter(|t| unqualified(&t.name).eq_ignore_ascii_case(wanted));
    match (candidates.next(), candidates.next()) {
        (Some(table), None) => Some(table),
        _ => None,
    }
}

fn idents(idents: &[Ident]) -> Vec<String> {
    idents.iter().map(|i| i.value.clone()).collect()
}

/// Line number from messages like `... at Line: 3, Column: 5`; 0 when absent
fn error_line(error: &ParserError) -> usize {
    let message = error.to_string();
    message
        .find("Line: ")
        .and_then(|idx| {
            message[idx + 6..]
                .split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|n| n.parse().ok())
        })
        .unwrap_or(0)
}
