// trellis-core: 配置驱动的 Bean 容器
//
// 根据声明式的 Bean 定义懒加载地构造、装配并缓存实例，支持：
// - 单例缓存和别名
// - extends 定义继承与抽象定义
// - 构造参数、builder 和工厂函数
// - 构造后的属性赋值与方法调用
// - Bean 引用、容器自引用和循环依赖检测

pub mod bean;
pub mod constants;
pub mod container;
pub mod definition;
pub mod error;
pub mod global;
pub mod loader;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod utils;
pub mod value;

// 重新导出常用类型
pub use bean::{AsAny, Bean, Instance, InstanceExt};
pub use container::{Container, ContainerBuilder};
pub use definition::{
    constructor, BeanRecord, ConcreteDefinition, Constructor, Definition, FactoryFn,
    FlattenedDefinition, InitOp,
};
pub use error::{ContainerError, ContainerResult};
pub use loader::DefinitionLoader;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use registry::TypeRegistry;
pub use resolver::DefinitionResolver;
pub use value::Value;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::{Bean, Instance, InstanceExt};
    pub use crate::container::Container;
    pub use crate::definition::{BeanRecord, Definition, InitOp};
    pub use crate::error::{ContainerError, ContainerResult};
    pub use crate::global;
    pub use crate::loader::DefinitionLoader;
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::registry::TypeRegistry;
    pub use crate::value::Value;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
