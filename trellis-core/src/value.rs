//! 配置值 - 构造参数、属性值和方法参数共用的动态值树

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::bean::{Bean, Instance, InstanceExt};
use crate::constants::{REFERENCE_PREFIX, SELF_REFERENCE_NAME};

/// 动态值
///
/// `Reference` 和 `SelfReference` 是引用标记，在使用前由容器替换为
/// `Bean`（已解析的实例）。引用标记是独立的变体，容器内部不会对普通字符串
/// 做前缀判断；字符串标记只在配置解析边界通过 [`Value::parse_str`] 识别。
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    /// 保持声明顺序的映射，引用按该顺序解析
    Map(IndexMap<String, Value>),
    /// 对另一个 Bean 的引用
    Reference(String),
    /// 对容器自身的引用
    SelfReference,
    /// 已解析的 Bean 实例
    Bean(Instance),
}

impl Value {
    /// 创建对指定 Bean 的引用
    pub fn reference(name: impl Into<String>) -> Self {
        Value::Reference(name.into())
    }

    /// 解析可能带有引用标记的字符串
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_core::Value;
    ///
    /// assert!(matches!(Value::parse_str("reference-to:self"), Value::SelfReference));
    /// assert!(matches!(Value::parse_str("reference-to:db"), Value::Reference(ref n) if n == "db"));
    /// assert!(matches!(Value::parse_str("plain"), Value::String(ref s) if s == "plain"));
    /// ```
    pub fn parse_str(s: &str) -> Self {
        match s.strip_prefix(REFERENCE_PREFIX) {
            Some(SELF_REFERENCE_NAME) => Value::SelfReference,
            Some(name) => Value::Reference(name.to_string()),
            None => Value::String(s.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// 获取已解析的 Bean 实例
    pub fn as_bean(&self) -> Option<&Instance> {
        match self {
            Value::Bean(instance) => Some(instance),
            _ => None,
        }
    }

    /// 获取已解析的 Bean 并向下转型为具体类型
    pub fn bean_as<T: Bean>(&self) -> Option<Arc<T>> {
        self.as_bean().and_then(|instance| instance.downcast_arc::<T>())
    }

    /// 值树中是否仍含有未解析的引用标记
    pub fn has_references(&self) -> bool {
        match self {
            Value::Reference(_) | Value::SelfReference => true,
            Value::List(items) => items.iter().any(Value::has_references),
            Value::Map(entries) => entries.values().any(Value::has_references),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(entries) => f.debug_map().entries(entries).finish(),
            Value::Reference(name) => write!(f, "Reference({})", name),
            Value::SelfReference => write!(f, "SelfReference"),
            Value::Bean(instance) => write!(f, "Bean({})", instance.class_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::SelfReference, Value::SelfReference) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            // 实例按身份比较
            (Value::Bean(a), Value::Bean(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Bean(instance)
    }
}
