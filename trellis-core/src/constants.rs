//! 配置标记常量定义
//!
//! 定义文件（以及 `Value::parse_str` / `InitOp::parse`）在解析边界上识别的字符串标记。
//! 容器内部只处理解析后的类型化值，不会再对字符串做前缀判断。

/// 引用其他 Bean 的字符串前缀，例如 `"reference-to:database"`
pub const REFERENCE_PREFIX: &str = "reference-to:";

/// 引用容器自身的名称，与前缀组合为 `"reference-to:self"`
pub const SELF_REFERENCE_NAME: &str = "self";

/// 属性赋值标记，例如 `"$name"` 表示给属性 `name` 赋值
pub const PROPERTY_MARKER: char = '$';

/// 方法调用标记（可选），`"@connect"` 与 `"connect"` 等价
pub const CALL_MARKER: char = '@';

/// 容器自身作为实例时报告的类名
pub const CONTAINER_CLASS_NAME: &str = "Container";
