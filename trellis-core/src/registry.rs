//! 类型注册表 - 按名称查找构造函数和 builder

use std::collections::HashMap;
use std::fmt;

use crate::bean::Bean;
use crate::definition::{constructor, Constructor};
use crate::value::Value;

/// 类型注册表
///
/// 把定义中的 `class` 名称映射到构造函数，把 builder 名称映射到 builder 函数。
/// 容器通过它完成"按名称构造类型"，TOML 定义源通过它把 `builder = "..."`
/// 解析为可调用对象。
#[derive(Clone, Default)]
pub struct TypeRegistry {
    classes: HashMap<String, Constructor>,
    builders: HashMap<String, Constructor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册类的构造函数
    ///
    /// 重复注册会覆盖之前的构造函数。
    pub fn register_class<T, F>(&mut self, class: impl Into<String>, f: F) -> &mut Self
    where
        T: Bean,
        F: Fn(Vec<Value>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.register_class_constructor(class, constructor(f))
    }

    /// 注册可能不产出实例的原始构造函数
    pub fn register_class_constructor(
        &mut self,
        class: impl Into<String>,
        ctor: Constructor,
    ) -> &mut Self {
        let class = class.into();
        if self.classes.insert(class.clone(), ctor).is_some() {
            tracing::warn!("Constructor for class '{}' replaced", class);
        }
        self
    }

    /// 注册命名 builder
    pub fn register_builder<T, F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        T: Bean,
        F: Fn(Vec<Value>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.register_builder_constructor(name, constructor(f))
    }

    pub fn register_builder_constructor(
        &mut self,
        name: impl Into<String>,
        builder: Constructor,
    ) -> &mut Self {
        let name = name.into();
        if self.builders.insert(name.clone(), builder).is_some() {
            tracing::warn!("Builder '{}' replaced", name);
        }
        self
    }

    /// 获取类的构造函数
    pub fn constructor(&self, class: &str) -> Option<Constructor> {
        self.classes.get(class).cloned()
    }

    /// 获取命名 builder
    pub fn builder(&self, name: &str) -> Option<Constructor> {
        self.builders.get(name).cloned()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn has_builder(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.classes.keys().collect();
        classes.sort();
        let mut builders: Vec<_> = self.builders.keys().collect();
        builders.sort();

        f.debug_struct("TypeRegistry")
            .field("classes", &classes)
            .field("builders", &builders)
            .finish()
    }
}
