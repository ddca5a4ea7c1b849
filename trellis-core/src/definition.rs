//! Bean 定义 - 描述如何创建和配置 Bean

use std::fmt;
use std::sync::Arc;

use crate::bean::{Bean, Instance};
use crate::constants::{CALL_MARKER, PROPERTY_MARKER};
use crate::container::Container;
use crate::value::Value;

/// 工厂函数：接收容器本身，返回实例
pub type FactoryFn = Arc<dyn Fn(&Container) -> anyhow::Result<Instance> + Send + Sync>;

/// 构造函数 / builder：接收已解析的构造参数，返回实例（`None` 表示没有产出实例）
pub type Constructor =
    Arc<dyn Fn(Vec<Value>) -> anyhow::Result<Option<Box<dyn Bean>>> + Send + Sync>;

/// 包装一个返回具体类型的闭包为 `Constructor`
pub fn constructor<T, F>(f: F) -> Constructor
where
    T: Bean,
    F: Fn(Vec<Value>) -> anyhow::Result<T> + Send + Sync + 'static,
{
    Arc::new(
        move |args: Vec<Value>| -> anyhow::Result<Option<Box<dyn Bean>>> {
            Ok(Some(Box::new(f(args)?)))
        },
    )
}

/// 构造后配置操作
#[derive(Debug, Clone, PartialEq)]
pub enum InitOp {
    /// 属性赋值
    SetProperty { name: String, value: Value },
    /// 方法调用，值为列表时作为位置参数列表，否则作为唯一参数
    Call { method: String, value: Value },
}

impl InitOp {
    pub fn set_property(name: impl Into<String>, value: impl Into<Value>) -> Self {
        InitOp::SetProperty {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn call(method: impl Into<String>, value: impl Into<Value>) -> Self {
        InitOp::Call {
            method: method.into(),
            value: value.into(),
        }
    }

    /// 从 `{operationName, value}` 形式解析
    ///
    /// `$name` 表示属性赋值，`@name` 或 `name` 表示方法调用。
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_core::{InitOp, Value};
    ///
    /// assert_eq!(
    ///     InitOp::parse("$host", Value::from("localhost")),
    ///     InitOp::set_property("host", "localhost"),
    /// );
    /// assert_eq!(InitOp::parse("@connect", Value::Null), InitOp::call("connect", Value::Null));
    /// assert_eq!(InitOp::parse("connect", Value::Null), InitOp::call("connect", Value::Null));
    /// ```
    pub fn parse(operation: &str, value: Value) -> Self {
        if let Some(name) = operation.strip_prefix(PROPERTY_MARKER) {
            return InitOp::SetProperty {
                name: name.to_string(),
                value,
            };
        }
        let method = operation.strip_prefix(CALL_MARKER).unwrap_or(operation);
        InitOp::Call {
            method: method.to_string(),
            value,
        }
    }

    /// 操作名称（不带标记）
    pub fn name(&self) -> &str {
        match self {
            InitOp::SetProperty { name, .. } => name,
            InitOp::Call { method, .. } => method,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            InitOp::SetProperty { value, .. } | InitOp::Call { value, .. } => value,
        }
    }
}

impl fmt::Display for InitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitOp::SetProperty { name, .. } => write!(f, "{}{}", PROPERTY_MARKER, name),
            InitOp::Call { method, .. } => write!(f, "{}{}", CALL_MARKER, method),
        }
    }
}

/// 结构化的 Bean 定义记录
///
/// 所有字段都是可选的：`extends` 合并时，子定义中出现的字段覆盖父定义。
/// 字段组合是否合法由 `DefinitionResolver` 在解析时校验。
#[derive(Clone, Default)]
pub struct BeanRecord {
    pub class: Option<String>,
    pub builder: Option<Constructor>,
    pub constructor_args: Option<Vec<Value>>,
    pub init: Option<Vec<InitOp>>,
    pub instance_of: Option<Vec<String>>,
    pub extends: Option<String>,
    pub is_abstract: bool,
    pub alias: Option<String>,
}

impl BeanRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建指定类名的定义
    pub fn with_class(class: impl Into<String>) -> Self {
        Self::new().class(class)
    }

    /// 创建转发到另一个 Bean 的别名定义
    pub fn alias_of(target: impl Into<String>) -> Self {
        Self {
            alias: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn builder(mut self, builder: Constructor) -> Self {
        self.builder = Some(builder);
        self
    }

    /// 设置返回具体类型的 builder 闭包
    pub fn builder_fn<T, F>(self, f: F) -> Self
    where
        T: Bean,
        F: Fn(Vec<Value>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.builder(constructor(f))
    }

    pub fn constructor_args(mut self, args: Vec<Value>) -> Self {
        self.constructor_args = Some(args);
        self
    }

    /// 追加一个构造参数
    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.constructor_args.get_or_insert_with(Vec::new).push(arg.into());
        self
    }

    /// 追加一个构造后配置操作
    pub fn init(mut self, op: InitOp) -> Self {
        self.init.get_or_insert_with(Vec::new).push(op);
        self
    }

    pub fn set_property(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.init(InitOp::set_property(name, value))
    }

    pub fn call(self, method: impl Into<String>, value: impl Into<Value>) -> Self {
        self.init(InitOp::call(method, value))
    }

    /// 追加一个必须满足的能力名称
    pub fn instance_of(mut self, capability: impl Into<String>) -> Self {
        self.instance_of
            .get_or_insert_with(Vec::new)
            .push(capability.into());
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// 标记为抽象定义（只能被 `extends`）
    pub fn mark_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// 除 `alias` 外是否声明了其他字段
    pub(crate) fn has_fields_besides_alias(&self) -> bool {
        self.class.is_some()
            || self.builder.is_some()
            || self.constructor_args.is_some()
            || self.init.is_some()
            || self.instance_of.is_some()
            || self.extends.is_some()
            || self.is_abstract
    }

    /// 以父定义为基础合并：子定义中出现的字段覆盖父定义
    ///
    /// 父定义的 `abstract` 不会被继承，`extends` 在合并结果中被移除。
    pub(crate) fn merged_over(&self, parent: BeanRecord) -> BeanRecord {
        BeanRecord {
            class: self.class.clone().or(parent.class),
            builder: self.builder.clone().or(parent.builder),
            constructor_args: self.constructor_args.clone().or(parent.constructor_args),
            init: self.init.clone().or(parent.init),
            instance_of: self.instance_of.clone().or(parent.instance_of),
            extends: None,
            is_abstract: self.is_abstract,
            alias: self.alias.clone().or(parent.alias),
        }
    }
}

impl fmt::Debug for BeanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanRecord")
            .field("class", &self.class)
            .field("builder", &self.builder.as_ref().map(|_| "<builder>"))
            .field("constructor_args", &self.constructor_args)
            .field("init", &self.init)
            .field("instance_of", &self.instance_of)
            .field("extends", &self.extends)
            .field("is_abstract", &self.is_abstract)
            .field("alias", &self.alias)
            .finish()
    }
}

/// 原始 Bean 定义
#[derive(Clone)]
pub enum Definition {
    /// 以容器为参数的工厂函数
    Factory(FactoryFn),
    /// 结构化定义
    Record(BeanRecord),
}

impl Definition {
    /// 用闭包创建工厂定义
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&Container) -> anyhow::Result<Instance> + Send + Sync + 'static,
    {
        Definition::Factory(Arc::new(f))
    }

    /// 创建别名定义
    pub fn alias(target: impl Into<String>) -> Self {
        Definition::Record(BeanRecord::alias_of(target))
    }

    /// 原始定义是否被标记为抽象
    pub fn is_abstract(&self) -> bool {
        match self {
            Definition::Factory(_) => false,
            Definition::Record(record) => record.is_abstract,
        }
    }
}

impl From<BeanRecord> for Definition {
    fn from(record: BeanRecord) -> Self {
        Definition::Record(record)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Factory(_) => write!(f, "Factory(<fn>)"),
            Definition::Record(record) => record.fmt(f),
        }
    }
}

/// 可直接实例化的定义
#[derive(Clone)]
pub struct ConcreteDefinition {
    pub class: String,
    pub builder: Option<Constructor>,
    pub constructor_args: Vec<Value>,
    pub init: Vec<InitOp>,
    pub instance_of: Vec<String>,
}

impl fmt::Debug for ConcreteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcreteDefinition")
            .field("class", &self.class)
            .field("builder", &self.builder.as_ref().map(|_| "<builder>"))
            .field("constructor_args", &self.constructor_args)
            .field("init", &self.init)
            .field("instance_of", &self.instance_of)
            .finish()
    }
}

/// 展平并校验后的定义
#[derive(Clone)]
pub enum FlattenedDefinition {
    Factory(FactoryFn),
    Alias(String),
    /// 仅在抽象上下文（作为 `extends` 目标）中产生
    Abstract(BeanRecord),
    Concrete(ConcreteDefinition),
}

impl fmt::Debug for FlattenedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlattenedDefinition::Factory(_) => write!(f, "Factory(<fn>)"),
            FlattenedDefinition::Alias(target) => f.debug_tuple("Alias").field(target).finish(),
            FlattenedDefinition::Abstract(record) => {
                f.debug_tuple("Abstract").field(record).finish()
            }
            FlattenedDefinition::Concrete(definition) => {
                f.debug_tuple("Concrete").field(definition).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_init_ops() {
        assert_eq!(
            InitOp::parse("$name", Value::from("x")),
            InitOp::set_property("name", "x")
        );
        assert_eq!(InitOp::parse("@start", Value::Null), InitOp::call("start", Value::Null));
        assert_eq!(InitOp::parse("start", Value::Null), InitOp::call("start", Value::Null));
        assert_eq!(InitOp::parse("$name", Value::Null).name(), "name");
        assert_eq!(InitOp::parse("@@odd", Value::Null).name(), "@odd");
    }

    #[test]
    fn test_init_op_display() {
        assert_eq!(InitOp::set_property("port", 80).to_string(), "$port");
        assert_eq!(InitOp::call("connect", Value::Null).to_string(), "@connect");
    }

    #[test]
    fn test_record_builder_methods() {
        let record = BeanRecord::with_class("Widget")
            .arg("foo")
            .arg(Value::reference("bean1"))
            .set_property("color", "red")
            .call("start", Value::Null)
            .instance_of("Gadget");

        assert_eq!(record.class.as_deref(), Some("Widget"));
        assert_eq!(
            record.constructor_args,
            Some(vec![Value::from("foo"), Value::reference("bean1")])
        );
        assert_eq!(record.init.as_ref().map(Vec::len), Some(2));
        assert_eq!(record.instance_of, Some(vec!["Gadget".to_string()]));
        assert!(!record.is_abstract);
    }

    #[test]
    fn test_merge_child_overrides_parent() {
        let parent = BeanRecord::with_class("Base")
            .arg(1)
            .instance_of("Named")
            .mark_abstract();
        let child = BeanRecord::new().extends("parent").arg(2);

        let merged = child.merged_over(parent);

        assert_eq!(merged.class.as_deref(), Some("Base"));
        assert_eq!(merged.constructor_args, Some(vec![Value::Int(2)]));
        assert_eq!(merged.instance_of, Some(vec!["Named".to_string()]));
        assert!(merged.extends.is_none());
        assert!(!merged.is_abstract);
    }

    #[test]
    fn test_alias_has_no_other_fields() {
        assert!(!BeanRecord::alias_of("target").has_fields_besides_alias());
        assert!(BeanRecord::alias_of("target").class("X").has_fields_besides_alias());
        assert!(BeanRecord::alias_of("target").mark_abstract().has_fields_besides_alias());
    }

    #[test]
    fn test_definition_is_abstract() {
        assert!(Definition::from(BeanRecord::new().mark_abstract()).is_abstract());
        assert!(!Definition::alias("x").is_abstract());
        assert!(!Definition::factory(|_| Ok(std::sync::Arc::new(1i64) as Instance)).is_abstract());
    }
}
