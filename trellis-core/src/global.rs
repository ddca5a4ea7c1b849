//! 进程级全局容器
//!
//! 应用启动时调用一次 `init`，之后在任何位置都可以通过这里的函数访问 Bean。
//! `teardown` 清除全局容器，主要供测试使用。

use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};

use crate::bean::Instance;
use crate::container::Container;
use crate::error::{ContainerError, ContainerResult};

static GLOBAL_CONTAINER: RwLock<Option<Arc<Container>>> = const_rwlock(None);

/// 安装全局容器
pub fn init(container: Arc<Container>) -> ContainerResult<()> {
    let mut global = GLOBAL_CONTAINER.write();
    if global.is_some() {
        return Err(ContainerError::AlreadyInitialized);
    }

    tracing::info!(
        "Global container initialized with {} bean definition(s)",
        container.bean_names().len()
    );
    *global = Some(container);
    Ok(())
}

/// 移除全局容器，返回之前安装的容器（如果有）
pub fn teardown() -> Option<Arc<Container>> {
    let previous = GLOBAL_CONTAINER.write().take();
    if previous.is_some() {
        tracing::info!("Global container torn down");
    }
    previous
}

/// 获取全局容器
pub fn container() -> ContainerResult<Arc<Container>> {
    GLOBAL_CONTAINER
        .read()
        .as_ref()
        .map(Arc::clone)
        .ok_or(ContainerError::NotInitialized)
}

/// 从全局容器获取 Bean
pub fn get(name: &str) -> ContainerResult<Instance> {
    // 先释放全局锁再构造，Bean 的工厂可能会再次访问全局容器
    container()?.get(name)
}

pub fn has_bean(name: &str) -> ContainerResult<bool> {
    Ok(container()?.has_bean(name))
}

pub fn test(names: Option<&[&str]>) -> ContainerResult<()> {
    container()?.test(names)
}
