//! 定义解析器 - 查找原始定义，展平 `extends` 链并校验定义结构

use std::collections::HashMap;

use crate::definition::{BeanRecord, ConcreteDefinition, Definition, FlattenedDefinition};
use crate::error::{ContainerError, ContainerResult};

/// 定义解析器
///
/// 只读地借用容器的定义表，每次解析都从原始定义重新展平。
pub struct DefinitionResolver<'a> {
    definitions: &'a HashMap<String, Definition>,
}

impl<'a> DefinitionResolver<'a> {
    pub fn new(definitions: &'a HashMap<String, Definition>) -> Self {
        Self { definitions }
    }

    /// 解析 Bean 定义
    ///
    /// `abstract_context` 为 true 表示该定义作为 `extends` 的目标被解析，
    /// 此时定义必须是抽象的，结果为 `FlattenedDefinition::Abstract`。
    pub fn resolve(
        &self,
        name: &str,
        abstract_context: bool,
    ) -> ContainerResult<FlattenedDefinition> {
        self.resolve_chain(name, abstract_context, &mut Vec::new())
    }

    fn resolve_chain(
        &self,
        name: &str,
        abstract_context: bool,
        chain: &mut Vec<String>,
    ) -> ContainerResult<FlattenedDefinition> {
        if chain.iter().any(|n| n == name) {
            return Err(ContainerError::CircularDependency {
                bean: name.to_string(),
                chain: format!("{} -> {} (extends)", chain.join(" -> "), name),
            });
        }
        chain.push(name.to_string());

        let raw = self
            .definitions
            .get(name)
            .ok_or_else(|| ContainerError::NoDefinitionFound(name.to_string()))?;

        let definition = match raw {
            Definition::Record(record) => match &record.extends {
                Some(parent) => {
                    tracing::trace!("Bean '{}' extends '{}'", name, parent);
                    let parent_record = self.resolve_parent(parent, chain)?;
                    Definition::Record(record.merged_over(parent_record))
                }
                None => raw.clone(),
            },
            Definition::Factory(_) => raw.clone(),
        };

        let flattened = Self::validate(name, definition, abstract_context)?;
        tracing::debug!("Definition of '{}' flattened: {:?}", name, flattened);
        Ok(flattened)
    }

    fn resolve_parent(&self, parent: &str, chain: &mut Vec<String>) -> ContainerResult<BeanRecord> {
        match self.resolve_chain(parent, true, chain)? {
            FlattenedDefinition::Abstract(record) => Ok(record),
            _ => Err(ContainerError::invalid_definition(parent, "must be abstract")),
        }
    }

    fn validate(
        name: &str,
        definition: Definition,
        abstract_context: bool,
    ) -> ContainerResult<FlattenedDefinition> {
        if abstract_context && !definition.is_abstract() {
            return Err(ContainerError::invalid_definition(name, "must be abstract"));
        }

        let record = match definition {
            Definition::Factory(factory) => return Ok(FlattenedDefinition::Factory(factory)),
            Definition::Record(record) => record,
        };

        if let Some(target) = &record.alias {
            if record.has_fields_besides_alias() {
                return Err(ContainerError::invalid_definition(
                    name,
                    "must only have alias",
                ));
            }
            return Ok(FlattenedDefinition::Alias(target.clone()));
        }

        if abstract_context {
            return Ok(FlattenedDefinition::Abstract(record));
        }

        if record.is_abstract {
            return Err(ContainerError::invalid_definition(name, "can not be abstract"));
        }

        let class = record
            .class
            .ok_or_else(|| ContainerError::invalid_definition(name, "must have class"))?;

        Ok(FlattenedDefinition::Concrete(ConcreteDefinition {
            class,
            builder: record.builder,
            constructor_args: record.constructor_args.unwrap_or_default(),
            init: record.init.unwrap_or_default(),
            instance_of: record.instance_of.unwrap_or_default(),
        }))
    }
}
