use thiserror::Error;

/// 容器错误
///
/// 每一种错误都会立即中断触发它的 `get` / `test` 调用，容器内部不做重试。
/// 用户回调（构造函数、builder、工厂、属性设置）返回 `anyhow::Result`，
/// 其中携带的 `ContainerError` 会被原样向上传播，而不是再包装一层。
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("No definition found for bean '{0}'")]
    NoDefinitionFound(String),

    #[error("Invalid definition for bean '{bean}': {reason}")]
    InvalidDefinition { bean: String, reason: String },

    #[error("Circular dependency detected while creating '{bean}': {chain}")]
    CircularDependency { bean: String, chain: String },

    #[error("Failed to instantiate bean '{bean}': {reason}")]
    BeanInstantiationFailed { bean: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Bean '{bean}' is not of the expected type '{expected}'")]
    TypeMismatch { bean: String, expected: String },

    #[error("Failed to load bean definitions: {0}")]
    DefinitionSource(String),

    #[error("Global container is not initialized")]
    NotInitialized,

    #[error("Global container is already initialized")]
    AlreadyInitialized,
}

impl ContainerError {
    pub(crate) fn invalid_definition(bean: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            bean: bean.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn instantiation_failed(bean: &str, reason: impl Into<String>) -> Self {
        Self::BeanInstantiationFailed {
            bean: bean.to_string(),
            reason: reason.into(),
        }
    }

    /// 将用户回调返回的错误转换为容器错误
    ///
    /// 如果错误本身就是 `ContainerError`（例如工厂内部嵌套 `get` 失败），
    /// 原样返回；否则包装为 `BeanInstantiationFailed`。
    pub(crate) fn from_callback(bean: &str, context: &str, err: anyhow::Error) -> Self {
        match err.downcast::<ContainerError>() {
            Ok(inner) => inner,
            Err(other) => Self::instantiation_failed(bean, format!("{}: {:#}", context, other)),
        }
    }

    /// 错误所关联的 Bean 名称（如果有）
    pub fn bean_name(&self) -> Option<&str> {
        match self {
            Self::NoDefinitionFound(bean) => Some(bean),
            Self::InvalidDefinition { bean, .. }
            | Self::CircularDependency { bean, .. }
            | Self::BeanInstantiationFailed { bean, .. }
            | Self::TypeMismatch { bean, .. } => Some(bean),
            _ => None,
        }
    }
}

/// 容器操作的统一返回类型
pub type ContainerResult<T> = Result<T, ContainerError>;
