use std::sync::Arc;

use trellis_core::prelude::*;

// ==================== 配置定义 ====================

/// 数据库配置 - 由 builder 创建
#[derive(Debug)]
struct DatabaseConfig {
    host: String,
    port: i64,
    max_connections: i64,
}

impl Bean for DatabaseConfig {
    fn set_property(&mut self, name: &str, value: Value) -> anyhow::Result<()> {
        match name {
            "max-connections" => {
                self.max_connections = value
                    .as_i64()
                    .ok_or_else(|| anyhow!("max-connections must be an integer"))?;
                Ok(())
            }
            _ => anyhow::bail!("DatabaseConfig has no property '{}'", name),
        }
    }
}

// ==================== 业务服务 ====================

/// 数据库服务 - 构造参数注入配置
#[derive(Debug)]
struct DatabaseService {
    config: Arc<DatabaseConfig>,
    connected: bool,
}

impl DatabaseService {
    fn query(&self, sql: &str) -> String {
        format!(
            "[{}:{}] {} (connected: {})",
            self.config.host, self.config.port, sql, self.connected
        )
    }
}

impl Bean for DatabaseService {
    fn capabilities(&self) -> &[&str] {
        &["Service"]
    }

    fn call(&mut self, method: &str, _args: Vec<Value>) -> anyhow::Result<()> {
        match method {
            "connect" => {
                tracing::info!(
                    "Connecting to {}:{} with {} connection(s)",
                    self.config.host,
                    self.config.port,
                    self.config.max_connections
                );
                self.connected = true;
                Ok(())
            }
            _ => anyhow::bail!("DatabaseService has no method '{}'", method),
        }
    }
}

/// 服务器服务 - 属性注入和方法注入
struct ServerService {
    host: String,
    port: i64,
    workers: i64,
    database: Option<Arc<DatabaseService>>,
    container: Option<Arc<Container>>,
}

impl ServerService {
    fn handle_request(&self, path: &str) -> anyhow::Result<String> {
        let database = self
            .database
            .as_ref()
            .ok_or_else(|| anyhow!("database is not attached"))?;
        Ok(database.query(&format!("SELECT * FROM {}", path.trim_start_matches('/'))))
    }
}

impl Bean for ServerService {
    fn capabilities(&self) -> &[&str] {
        &["Service"]
    }

    fn set_property(&mut self, name: &str, value: Value) -> anyhow::Result<()> {
        match name {
            "workers" => {
                self.workers = value
                    .as_i64()
                    .ok_or_else(|| anyhow!("workers must be an integer"))?;
                Ok(())
            }
            _ => anyhow::bail!("ServerService has no property '{}'", name),
        }
    }

    fn call(&mut self, method: &str, args: Vec<Value>) -> anyhow::Result<()> {
        let first = args.first().ok_or_else(|| anyhow!("{} expects an argument", method))?;
        match method {
            "attach" => {
                self.database = Some(
                    first
                        .bean_as::<DatabaseService>()
                        .ok_or_else(|| anyhow!("attach expects a DatabaseService"))?,
                );
                Ok(())
            }
            "bind-container" => {
                self.container = first.bean_as::<Container>();
                Ok(())
            }
            _ => anyhow::bail!("ServerService has no method '{}'", method),
        }
    }
}

// ==================== 类型注册 ====================

fn string_arg(args: &[Value], index: usize, name: &str) -> anyhow::Result<String> {
    args.get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("argument {} ('{}') must be a string", index, name))
}

fn int_arg(args: &[Value], index: usize, name: &str) -> anyhow::Result<i64> {
    args.get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow!("argument {} ('{}') must be an integer", index, name))
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();

    registry
        .register_builder("database_config", |args: Vec<Value>| {
            Ok(DatabaseConfig {
                host: string_arg(&args, 0, "host")?,
                port: int_arg(&args, 1, "port")?,
                max_connections: 10,
            })
        })
        .register_class("DatabaseService", |args: Vec<Value>| {
            let config = args
                .first()
                .and_then(|v| v.bean_as::<DatabaseConfig>())
                .ok_or_else(|| anyhow!("DatabaseService expects a DatabaseConfig"))?;
            Ok(DatabaseService {
                config,
                connected: false,
            })
        })
        .register_class("ServerService", |args: Vec<Value>| {
            Ok(ServerService {
                host: string_arg(&args, 0, "host")?,
                port: int_arg(&args, 1, "port")?,
                workers: 1,
                database: None,
                container: None,
            })
        });

    registry
}

// ==================== 主程序 ====================

fn main() -> anyhow::Result<()> {
    LoggingConfig::from_env().init()?;

    // 查找定义文件
    let definitions_file = ["demos/app-demo/beans.toml", "beans.toml"]
        .into_iter()
        .find(|path| std::path::Path::new(path).exists())
        .unwrap_or("beans.toml");

    let registry = registry();
    let definitions = DefinitionLoader::new(&registry)
        .from_file(definitions_file)
        .with_context(|| format!("failed to load {}", definitions_file))?;

    let container = Container::builder()
        .registry(registry)
        .definitions(definitions)
        .build();

    // 启动时构建所有 Bean，配置错误在这里暴露
    container.test(None)?;
    global::init(Arc::clone(&container))?;

    let server = global::get("serverService")?
        .downcast_arc::<ServerService>()
        .ok_or_else(|| anyhow!("serverService is not a ServerService"))?;

    tracing::info!(
        "Server listening on {}:{} with {} worker(s)",
        server.host,
        server.port,
        server.workers
    );
    println!("{}", server.handle_request("/users")?);

    // 别名返回同一个实例
    let db = container.get_as::<DatabaseService>("db")?;
    let attached = server.database.as_ref().map(|d| Arc::ptr_eq(d, &db));
    println!("db alias shares the attached instance: {:?}", attached);

    if let Some(bound) = &server.container {
        println!("Beans: {}", bound.bean_names().join(", "));
    }

    global::teardown();
    Ok(())
}
