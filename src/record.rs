//! NDJSON resource records.
//!
//! Records are the line-oriented JSON form of a [`Resource`], used by the
//! binaries to pipe crawled resources into other tools and back into the
//! index writer. Attributes keep their wire `(value, type)` pair, so turning a
//! record back into a resource goes through the same attribute codec as the
//! XML parser.

use crate::model::{Clause, ClauseBuilder, ModelError, Resource, ResourceBuilder, convert_attribute};
use anyhow::{Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::BufRead;
use std::sync::OnceLock;

pub const RECORD_SCHEMA_VERSION: &str = "resource-record-v1";

const RECORD_SCHEMA: &str = include_str!("../schema/resource_record.schema.json");

/// One resource as emitted by `index-crawl`.
///
/// `identity`, `version` and `content_url` are derived from the clauses and
/// are informational only; they are ignored when converting back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub schema_version: String,
    pub base_url: String,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub content_url: Option<String>,
    pub capabilities: Vec<ClauseRecord>,
    pub requirements: Vec<ClauseRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseRecord {
    pub namespace: String,
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
    #[serde(default)]
    pub directives: Vec<DirectiveRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub name: String,
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveRecord {
    pub name: String,
    pub value: String,
}

impl ClauseRecord {
    fn from_clause(clause: &Clause) -> Self {
        Self {
            namespace: clause.namespace().to_string(),
            attributes: clause
                .attributes()
                .map(|(name, value)| AttributeRecord {
                    name: name.to_string(),
                    value: value.to_string(),
                    declared_type: value.declared_type().map(str::to_string),
                })
                .collect(),
            directives: clause
                .directives()
                .map(|(name, value)| DirectiveRecord {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    fn into_builder(self) -> Result<ClauseBuilder, ModelError> {
        let mut builder = ClauseBuilder::new(self.namespace)?;
        for attribute in self.attributes {
            let value = convert_attribute(&attribute.value, attribute.declared_type.as_deref());
            builder.add_attribute(attribute.name, value);
        }
        for directive in self.directives {
            builder.add_directive(directive.name, directive.value);
        }
        Ok(builder)
    }
}

impl From<&Resource> for ResourceRecord {
    fn from(resource: &Resource) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION.to_string(),
            base_url: resource.base_url().to_string(),
            identity: resource.identity().map(str::to_string),
            version: resource.version(),
            content_url: resource.content_url().map(str::to_string),
            capabilities: resource
                .capability_map()
                .values()
                .flatten()
                .map(|cap| ClauseRecord::from_clause(cap))
                .collect(),
            requirements: resource
                .requirement_map()
                .values()
                .flatten()
                .map(|req| ClauseRecord::from_clause(req))
                .collect(),
        }
    }
}

impl ResourceRecord {
    /// Rebuild the resource. Fails only on an empty clause namespace.
    pub fn into_resource(self) -> Result<Resource, ModelError> {
        let mut builder = ResourceBuilder::new(self.base_url);
        for capability in self.capabilities {
            builder.add_capability(capability.into_builder()?.build_capability());
        }
        for requirement in self.requirements {
            builder.add_requirement(requirement.into_builder()?.build_requirement());
        }
        Ok(builder.build())
    }
}

/// Compiled validator for `schema/resource_record.schema.json`.
pub struct RecordSchema {
    compiled: JSONSchema,
}

impl RecordSchema {
    /// Compile the schema shipped with the crate.
    pub fn embedded() -> Result<Self> {
        let compiled = JSONSchema::compile(embedded_schema_value()?)
            .map_err(|err| anyhow!("compiling resource record schema: {err}"))?;
        Ok(Self { compiled })
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if let Err(errors) = self.compiled.validate(value) {
            let details = errors
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            bail!("resource record failed schema validation:\n{}", details);
        }
        Ok(())
    }

    pub fn validate_record(&self, record: &ResourceRecord) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.validate(&value)
    }
}

fn embedded_schema_value() -> Result<&'static Value> {
    static SCHEMA: OnceLock<Option<Value>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| serde_json::from_str(RECORD_SCHEMA).ok())
        .as_ref()
        .ok_or_else(|| anyhow!("embedded resource record schema is not valid JSON"))
}

/// Errors that can occur while reading NDJSON record streams.
#[derive(Debug, thiserror::Error)]
pub enum RecordReadError {
    #[error("failed to read NDJSON stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: unable to parse resource record ({error})")]
    Parse {
        line: usize,
        #[source]
        error: serde_json::Error,
    },
}

/// Read resource records from an NDJSON stream.
///
/// Lines containing only whitespace are skipped. Errors carry the 1-based
/// line number where parsing failed.
pub fn read_resource_records<R: BufRead>(
    mut reader: R,
) -> Result<Vec<ResourceRecord>, RecordReadError> {
    let mut records = Vec::new();
    let mut line_buf = String::new();
    let mut line_number = 0usize;

    loop {
        line_buf.clear();
        let bytes = reader.read_line(&mut line_buf)?;
        if bytes == 0 {
            break;
        }
        line_number += 1;
        let trimmed = line_buf.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str::<ResourceRecord>(trimmed).map_err(|error| {
            RecordReadError::Parse {
                line: line_number,
                error,
            }
        })?;
        records.push(record);
    }

    Ok(records)
}
