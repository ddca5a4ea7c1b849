//! TOML 定义源 - 把 TOML 文档转换为按文件顺序排列的 Bean 定义
//!
//! 每个顶层表是一个 Bean：
//!
//! ```toml
//! [database]
//! class = "Database"
//! constructor-args = ["postgres://localhost", "reference-to:pool"]
//! instanceof = ["Storage"]
//! init = [
//!     { op = "$timeout", value = 30 },
//!     { connect = [] },
//! ]
//!
//! [db]
//! alias = "database"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::definition::{BeanRecord, Definition, InitOp};
use crate::error::{ContainerError, ContainerResult};
use crate::registry::TypeRegistry;
use crate::value::Value;

/// 单个 Bean 表的原始形状
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawBean {
    class: Option<String>,
    builder: Option<String>,
    constructor_args: Option<Vec<toml::Value>>,
    init: Option<Vec<toml::Table>>,
    #[serde(rename = "instanceof")]
    instance_of: Option<Vec<String>>,
    extends: Option<String>,
    #[serde(rename = "abstract", default)]
    is_abstract: bool,
    alias: Option<String>,
}

/// Bean 定义加载器
///
/// `builder = "name"` 通过类型注册表解析为 builder 函数，因此加载器借用注册表。
pub struct DefinitionLoader<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> DefinitionLoader<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// 从文件加载
    pub fn from_file(&self, path: impl AsRef<Path>) -> ContainerResult<Vec<(String, Definition)>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ContainerError::DefinitionSource(format!("Failed to read {:?}: {}", path, e))
        })?;

        tracing::debug!("Loading bean definitions from {:?}", path);
        self.from_str(&content)
    }

    /// 从 TOML 字符串加载
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(&self, content: &str) -> ContainerResult<Vec<(String, Definition)>> {
        let document: toml::Table = toml::from_str(content)
            .map_err(|e| ContainerError::DefinitionSource(format!("Failed to parse TOML: {}", e)))?;

        let definitions = document
            .into_iter()
            .map(|(name, table)| {
                let definition = self.definition(&name, table)?;
                Ok((name, definition))
            })
            .collect::<ContainerResult<Vec<_>>>()?;

        tracing::debug!("Loaded {} bean definition(s)", definitions.len());
        Ok(definitions)
    }

    fn definition(&self, name: &str, value: toml::Value) -> ContainerResult<Definition> {
        if !value.is_table() {
            return Err(ContainerError::invalid_definition(
                name,
                format!("expected a table, found {}", value.type_str()),
            ));
        }

        let raw: RawBean = value
            .try_into()
            .map_err(|e: toml::de::Error| ContainerError::invalid_definition(name, e.message()))?;

        let builder = raw
            .builder
            .map(|builder| {
                self.registry.builder(&builder).ok_or_else(|| {
                    ContainerError::invalid_definition(
                        name,
                        format!("unknown builder '{}'", builder),
                    )
                })
            })
            .transpose()?;

        let init = raw
            .init
            .map(|ops| {
                ops.into_iter()
                    .map(|op| init_op(name, op))
                    .collect::<ContainerResult<Vec<_>>>()
            })
            .transpose()?;

        Ok(Definition::Record(BeanRecord {
            class: raw.class,
            builder,
            constructor_args: raw
                .constructor_args
                .map(|args| args.into_iter().map(convert).collect()),
            init,
            instance_of: raw.instance_of,
            extends: raw.extends,
            is_abstract: raw.is_abstract,
            alias: raw.alias,
        }))
    }
}

/// 解析 `{ op = "...", value = ... }` 或 `{ name = value }` 形式的操作
fn init_op(bean: &str, mut table: toml::Table) -> ContainerResult<InitOp> {
    let malformed = |reason: String| ContainerError::invalid_definition(bean, reason);

    if let Some(op) = table.remove("op") {
        let op = op
            .as_str()
            .ok_or_else(|| malformed("init 'op' must be a string".to_string()))?
            .to_string();
        // 缺省值为空参数列表
        let value = table
            .remove("value")
            .map(convert)
            .unwrap_or_else(|| Value::List(Vec::new()));

        if let Some(extra) = table.keys().next() {
            return Err(malformed(format!(
                "unknown key '{}' in init operation '{}'",
                extra, op
            )));
        }
        return Ok(InitOp::parse(&op, value));
    }

    let mut entries = table.into_iter();
    match (entries.next(), entries.next()) {
        (Some((op, value)), None) => Ok(InitOp::parse(&op, convert(value))),
        _ => Err(malformed(
            "init operation must have exactly one key or an 'op' key".to_string(),
        )),
    }
}

fn convert(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::parse_str(&s),
        toml::Value::Integer(i) => Value::Int(i),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::List(items.into_iter().map(convert).collect()),
        toml::Value::Table(table) => Value::Map(
            table
                .into_iter()
                .map(|(key, value)| (key, convert(value)))
                .collect(),
        ),
    }
}
