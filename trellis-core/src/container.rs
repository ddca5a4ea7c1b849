use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::bean::{Bean, Instance, InstanceExt};
use crate::constants::CONTAINER_CLASS_NAME;
use crate::definition::{ConcreteDefinition, Definition, FlattenedDefinition, InitOp};
use crate::error::{ContainerError, ContainerResult};
use crate::registry::TypeRegistry;
use crate::resolver::DefinitionResolver;
use crate::utils::dependency::CreationTracker;
use crate::value::Value;

/// `create` 的结果：新建的实例会被缓存，别名转发得到的实例不会
enum Created {
    Built(Instance),
    Forwarded(Instance),
}

/// Bean 容器
///
/// 持有不可变的定义表，按需懒加载地构造、装配并缓存 Bean。
/// 每个 Bean 名称在容器生命周期内最多对应一个实例。
///
/// 容器总是以 `Arc<Container>` 的形式创建，以便 `reference-to:self`
/// 能够把容器自身作为实例注入。注意：把容器注入到被缓存的 Bean 中会形成
/// 引用环，容器及其 Bean 将不会被释放。
pub struct Container {
    /// Bean 定义存储
    definitions: HashMap<String, Definition>,

    /// 定义的原始顺序
    order: Vec<String>,

    /// 类名 -> 构造函数
    registry: TypeRegistry,

    /// 单例 Bean 缓存
    singletons: RwLock<HashMap<String, Instance>>,

    /// 循环依赖检测 - 跟踪正在创建的 Bean
    creation_tracker: CreationTracker,

    /// 指向自身，用于解析自引用
    self_ref: Weak<Container>,
}

impl Container {
    /// 创建容器
    ///
    /// 定义的迭代顺序会被保留（`test(None)` 按此顺序构建）。
    /// 同名定义以最后一个为准，位置保持第一次出现的位置。
    pub fn new<I, S>(registry: TypeRegistry, definitions: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (S, Definition)>,
        S: Into<String>,
    {
        let mut map = HashMap::new();
        let mut order = Vec::new();

        for (name, definition) in definitions {
            let name = name.into();
            if map.insert(name.clone(), definition).is_some() {
                tracing::warn!("Bean definition '{}' overridden", name);
            } else {
                order.push(name);
            }
        }

        tracing::debug!("Container created with {} bean definition(s)", order.len());

        Arc::new_cyclic(|self_ref| Self {
            definitions: map,
            order,
            registry,
            singletons: RwLock::new(HashMap::new()),
            creation_tracker: CreationTracker::new(),
            self_ref: self_ref.clone(),
        })
    }

    /// 构建器模式创建容器
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// 通过名称获取 Bean
    pub fn get(&self, name: &str) -> ContainerResult<Instance> {
        tracing::trace!("Requesting bean: '{}'", name);

        // 检查缓存
        {
            let singletons = self.singletons.read();
            if let Some(bean) = singletons.get(name) {
                tracing::debug!("Returning cached instance of singleton bean '{}'", name);
                return Ok(Arc::clone(bean));
            }
        }

        match self.create(name)? {
            Created::Built(bean) => {
                let mut singletons = self.singletons.write();
                let cached = singletons
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::clone(&bean));

                tracing::debug!("Singleton bean '{}' created and cached", name);
                Ok(Arc::clone(cached))
            }
            Created::Forwarded(bean) => Ok(bean),
        }
    }

    /// 通过名称获取 Bean 并向下转型为具体类型
    pub fn get_as<T: Bean>(&self, name: &str) -> ContainerResult<Arc<T>> {
        let bean = self.get(name)?;
        bean.downcast_arc::<T>()
            .ok_or_else(|| ContainerError::TypeMismatch {
                bean: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// 检查是否包含指定名称的 Bean 定义（不会触发解析或构造）
    pub fn has_bean(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// 获取所有 Bean 的名称（按定义顺序）
    pub fn bean_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// 检查 Bean 是否已经被创建并缓存
    pub fn is_instantiated(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    /// 急切地构建 Bean，用于在启动或部署时校验整份配置
    ///
    /// - `None`：构建所有非抽象的定义（工厂定义总是包含在内），按定义顺序
    /// - `Some(&[])`：返回 `InvalidArgument`
    /// - `Some(names)`：按顺序构建指定的 Bean
    ///
    /// 任何一个 Bean 失败都会立即中止检查。
    pub fn test(&self, names: Option<&[&str]>) -> ContainerResult<()> {
        let check_list: Vec<String> = match names {
            None => self
                .order
                .iter()
                .filter(|name| {
                    self.definitions
                        .get(name.as_str())
                        .is_some_and(|definition| !definition.is_abstract())
                })
                .cloned()
                .collect(),
            Some([]) => {
                return Err(ContainerError::InvalidArgument(
                    "check list can't be empty".to_string(),
                ))
            }
            Some(names) => names.iter().map(|name| name.to_string()).collect(),
        };

        tracing::info!("Checking {} bean(s)", check_list.len());

        for name in &check_list {
            self.get(name)?;
        }

        tracing::info!("All {} bean(s) built successfully", check_list.len());
        Ok(())
    }

    /// 创建 Bean 实例
    fn create(&self, name: &str) -> ContainerResult<Created> {
        // 标记为正在创建，guard 在任何返回路径上都会清理标记
        let _guard = self.creation_tracker.start_creating(name).ok_or_else(|| {
            let chain = self.creation_tracker.current_creating();
            tracing::error!(
                "Circular dependency detected while creating '{}'. Creation chain: {:?}",
                name,
                chain
            );
            ContainerError::CircularDependency {
                bean: name.to_string(),
                chain: format!("{} -> {}", chain.join(" -> "), name),
            }
        })?;

        let definition = DefinitionResolver::new(&self.definitions).resolve(name, false)?;

        match definition {
            FlattenedDefinition::Factory(factory) => {
                tracing::info!("Creating shared instance of bean '{}' from factory", name);
                let bean = factory(self)
                    .map_err(|e| ContainerError::from_callback(name, "factory failed", e))?;
                Ok(Created::Built(bean))
            }
            FlattenedDefinition::Alias(target) => {
                tracing::debug!("Bean '{}' is an alias of '{}'", name, target);
                Ok(Created::Forwarded(self.get(&target)?))
            }
            FlattenedDefinition::Concrete(definition) => {
                tracing::info!(
                    "Creating shared instance of singleton bean '{}' (class '{}')",
                    name,
                    definition.class
                );
                let mut bean = self.instantiate(name, &definition)?;
                Self::check_instance(bean.as_ref(), &definition, name)?;
                self.configure(name, bean.as_mut(), &definition)?;
                Ok(Created::Built(Arc::from(bean)))
            }
            FlattenedDefinition::Abstract(_) => Err(ContainerError::invalid_definition(
                name,
                "can not be abstract",
            )),
        }
    }

    /// 使用 builder 或已注册的构造函数实例化
    fn instantiate(
        &self,
        name: &str,
        definition: &ConcreteDefinition,
    ) -> ContainerResult<Box<dyn Bean>> {
        let (constructor, context) = match &definition.builder {
            Some(builder) => (Arc::clone(builder), "builder failed"),
            None => {
                let constructor = self.registry.constructor(&definition.class).ok_or_else(|| {
                    ContainerError::instantiation_failed(
                        name,
                        format!("class '{}' is not registered", definition.class),
                    )
                })?;
                (constructor, "constructor failed")
            }
        };

        let args = definition
            .constructor_args
            .iter()
            .map(|arg| self.resolve_references(arg))
            .collect::<ContainerResult<Vec<_>>>()?;

        tracing::trace!("Instantiating '{}' with {} argument(s)", name, args.len());

        constructor(args)
            .map_err(|e| ContainerError::from_callback(name, context, e))?
            .ok_or_else(|| ContainerError::instantiation_failed(name, "no instance was produced"))
    }

    /// 检查实例是否满足声明的类和所有 `instance_of` 能力
    fn check_instance(
        instance: &dyn Bean,
        definition: &ConcreteDefinition,
        name: &str,
    ) -> ContainerResult<()> {
        let required = definition
            .instance_of
            .iter()
            .chain(std::iter::once(&definition.class));

        for type_name in required {
            if !instance.is_instance_of(type_name) {
                return Err(ContainerError::instantiation_failed(
                    name,
                    format!(
                        "instance check failed: '{}' is not an instance of '{}'",
                        instance.class_name(),
                        type_name
                    ),
                ));
            }
        }

        Ok(())
    }

    /// 按声明顺序执行 `init` 操作
    fn configure(
        &self,
        name: &str,
        instance: &mut dyn Bean,
        definition: &ConcreteDefinition,
    ) -> ContainerResult<()> {
        for op in &definition.init {
            let value = self.resolve_references(op.value())?;
            tracing::trace!("Applying init operation '{}' on '{}'", op, name);

            let result = match op {
                InitOp::SetProperty { name: property, .. } => {
                    instance.set_property(property, value)
                }
                InitOp::Call { method, .. } => {
                    let args = match value {
                        Value::List(items) => items,
                        single => vec![single],
                    };
                    instance.call(method, args)
                }
            };

            result.map_err(|e| {
                ContainerError::from_callback(
                    name,
                    &format!("init operation '{}' failed", op),
                    e,
                )
            })?;
        }

        Ok(())
    }

    /// 深度优先、从左到右地把引用标记替换为已解析的实例
    pub fn resolve_references(&self, value: &Value) -> ContainerResult<Value> {
        match value {
            Value::SelfReference => Ok(Value::Bean(self.as_instance()?)),
            Value::Reference(target) => Ok(Value::Bean(self.get(target)?)),
            Value::List(items) => items
                .iter()
                .map(|item| self.resolve_references(item))
                .collect::<ContainerResult<Vec<_>>>()
                .map(Value::List),
            Value::Map(entries) => entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.resolve_references(item)?)))
                .collect::<ContainerResult<_>>()
                .map(Value::Map),
            other => Ok(other.clone()),
        }
    }

    /// 容器自身作为实例
    fn as_instance(&self) -> ContainerResult<Instance> {
        self.self_ref
            .upgrade()
            .map(|container| container as Instance)
            .ok_or_else(|| {
                ContainerError::instantiation_failed(
                    crate::constants::SELF_REFERENCE_NAME,
                    "container is no longer available",
                )
            })
    }
}

impl Bean for Container {
    fn class_name(&self) -> &str {
        CONTAINER_CLASS_NAME
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("definitions", &self.order)
            .field("instantiated", &self.singletons.read().len())
            .field("registry", &self.registry)
            .finish()
    }
}

/// 容器构建器
#[derive(Default)]
pub struct ContainerBuilder {
    registry: TypeRegistry,
    definitions: Vec<(String, Definition)>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有的类型注册表
    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// 注册类的构造函数
    pub fn register_class<T, F>(mut self, class: impl Into<String>, f: F) -> Self
    where
        T: Bean,
        F: Fn(Vec<Value>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.registry.register_class(class, f);
        self
    }

    /// 添加 Bean 定义
    pub fn define(mut self, name: impl Into<String>, definition: impl Into<Definition>) -> Self {
        self.definitions.push((name.into(), definition.into()));
        self
    }

    /// 批量添加 Bean 定义（例如 `DefinitionLoader` 的结果）
    pub fn definitions<I>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = (String, Definition)>,
    {
        self.definitions.extend(definitions);
        self
    }

    /// 构建容器
    pub fn build(self) -> Arc<Container> {
        Container::new(self.registry, self.definitions)
    }
}
