use std::any::Any;
use std::sync::Arc;

use crate::utils::naming::short_type_name;
use crate::value::Value;

/// 容器管理的实例
pub type Instance = Arc<dyn Bean>;

/// 向下转型辅助 trait，为所有 `Any + Send + Sync` 类型自动实现
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Bean trait - 所有可以被容器管理的类型都需要实现此 trait
///
/// 容器只通过这个 trait 了解实例：类型检查使用 `class_name` 和
/// `capabilities`，`init` 配置使用 `set_property` 和 `call`。
/// 所有方法都有默认实现，简单类型只需要 `impl Bean for MyType {}`。
pub trait Bean: AsAny {
    /// 实例的类名，默认为不带模块路径的 Rust 类型名
    fn class_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// 实例额外满足的能力（接口 / 基类）名称
    fn capabilities(&self) -> &[&str] {
        &[]
    }

    /// 实例是否满足指定的类名或能力
    fn is_instance_of(&self, type_name: &str) -> bool {
        self.class_name() == type_name || self.capabilities().contains(&type_name)
    }

    /// 属性赋值（`init` 中的 `$name` 操作）
    fn set_property(&mut self, name: &str, value: Value) -> anyhow::Result<()> {
        let _ = value;
        anyhow::bail!("{} has no writable property '{}'", self.class_name(), name)
    }

    /// 方法调用（`init` 中的 `name` / `@name` 操作）
    fn call(&mut self, method: &str, args: Vec<Value>) -> anyhow::Result<()> {
        let _ = args;
        anyhow::bail!("{} has no callable method '{}'", self.class_name(), method)
    }
}

impl dyn Bean {
    /// 是否为指定的具体类型
    pub fn is<T: Bean>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// 以具体类型借用实例
    pub fn downcast_ref<T: Bean>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// `Instance` 的扩展方法
pub trait InstanceExt {
    /// 向下转型为具体类型，类型不符时返回 `None`
    fn downcast_arc<T: Bean>(&self) -> Option<Arc<T>>;
}

impl InstanceExt for Instance {
    fn downcast_arc<T: Bean>(&self) -> Option<Arc<T>> {
        Arc::clone(self).into_any().downcast::<T>().ok()
    }
}

impl Bean for String {}
impl Bean for i64 {}
impl Bean for f64 {}
impl Bean for bool {}
