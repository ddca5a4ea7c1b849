use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use trellis_core::prelude::*;
use trellis_core::{DefinitionResolver, FlattenedDefinition};

/// 记录构造参数的组件
struct Widget {
    label: String,
    dependency: Option<Instance>,
}

impl Bean for Widget {
    fn capabilities(&self) -> &[&str] {
        &["Component"]
    }
}

/// 记录 `init` 调用的组件
#[derive(Default)]
struct Panel {
    container: Option<Arc<Container>>,
    title: String,
}

impl Bean for Panel {
    fn set_property(&mut self, name: &str, value: Value) -> anyhow::Result<()> {
        match name {
            "title" => {
                self.title = value.as_str().unwrap_or_default().to_string();
                Ok(())
            }
            _ => anyhow::bail!("unknown property '{}'", name),
        }
    }

    fn call(&mut self, method: &str, args: Vec<Value>) -> anyhow::Result<()> {
        match method {
            "setX" => {
                self.container = args.first().and_then(|v| v.bean_as::<Container>());
                Ok(())
            }
            _ => anyhow::bail!("unknown method '{}'", method),
        }
    }
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_class("Widget", |args: Vec<Value>| {
            Ok(Widget {
                label: args.first().and_then(Value::as_str).unwrap_or_default().to_string(),
                dependency: args.get(1).and_then(Value::as_bean).cloned(),
            })
        })
        .register_class("Panel", |_| Ok(Panel::default()));
    registry
}

#[test]
fn get_returns_the_same_instance() {
    let container = Container::new(
        registry(),
        vec![
            ("widget", BeanRecord::with_class("Widget").arg("w").into()),
            ("component", Definition::alias("widget")),
            ("again", Definition::alias("component")),
        ],
    );

    let first = container.get("widget").unwrap();
    let second = container.get("widget").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // 别名（包括别名的别名）返回目标的单例
    assert!(Arc::ptr_eq(&first, &container.get("component").unwrap()));
    assert!(Arc::ptr_eq(&first, &container.get("again").unwrap()));
    assert!(!container.is_instantiated("component"));
}

#[test]
fn has_bean_is_key_presence() {
    let container = Container::new(
        registry(),
        vec![
            ("base", BeanRecord::with_class("Widget").mark_abstract().into()),
            ("alias", Definition::alias("missing")),
            ("broken", BeanRecord::new().into()),
        ],
    );

    assert!(container.has_bean("base"));
    assert!(container.has_bean("alias"));
    assert!(container.has_bean("broken"));
    assert!(!container.has_bean("missing"));
    assert!(!container.is_instantiated("base"));
}

#[test]
fn constructor_args_are_resolved() {
    let container = Container::new(
        registry(),
        vec![
            (
                "widget",
                BeanRecord::with_class("Widget")
                    .arg("foo")
                    .arg(Value::parse_str("reference-to:bean1"))
                    .into(),
            ),
            ("bean1", BeanRecord::with_class("Panel").into()),
        ],
    );

    let widget = container.get_as::<Widget>("widget").unwrap();
    let bean1 = container.get("bean1").unwrap();

    assert_eq!(widget.label, "foo");
    assert!(Arc::ptr_eq(widget.dependency.as_ref().unwrap(), &bean1));
}

#[test]
fn extends_flattens_into_child() {
    let definitions: Vec<(&str, Definition)> = vec![
        ("parent", BeanRecord::with_class("Widget").mark_abstract().into()),
        ("child", BeanRecord::new().extends("parent").into()),
    ];
    let map: HashMap<String, Definition> = definitions
        .iter()
        .map(|(name, definition): &(&str, Definition)| (name.to_string(), definition.clone()))
        .collect();

    match DefinitionResolver::new(&map).resolve("child", false).unwrap() {
        FlattenedDefinition::Concrete(definition) => assert_eq!(definition.class, "Widget"),
        other => panic!("Expected Concrete, got {:?}", other),
    }

    let container = Container::new(registry(), definitions);
    assert!(container.get_as::<Widget>("child").is_ok());

    let err = container.get("parent").err().unwrap();
    assert!(matches!(
        err,
        ContainerError::InvalidDefinition { ref reason, .. } if reason == "can not be abstract"
    ));
}

#[test]
fn circular_dependency_clears_markers() {
    let cyclic = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&cyclic);

    let container = Container::new(
        registry(),
        vec![
            (
                "a",
                Definition::factory(move |container| {
                    if flag.load(Ordering::SeqCst) {
                        container.get("b")?;
                    }
                    Ok(Arc::new(String::from("a")) as Instance)
                }),
            ),
            (
                "b",
                BeanRecord::with_class("Widget")
                    .arg("b")
                    .arg(Value::reference("a"))
                    .into(),
            ),
        ],
    );

    match container.get("a").err().unwrap() {
        ContainerError::CircularDependency { bean, chain } => {
            assert_eq!(bean, "a");
            assert_eq!(chain, "a -> b -> a");
        }
        other => panic!("Expected CircularDependency, got {:?}", other),
    }
    assert!(!container.is_instantiated("a"));
    assert!(!container.is_instantiated("b"));

    // 标记已清除，之后不成环的请求可以成功
    cyclic.store(false, Ordering::SeqCst);
    let a = container.get("a").unwrap();
    assert_eq!(a.downcast_arc::<String>().unwrap().as_str(), "a");

    // b 现在可以引用已缓存的 a
    let b = container.get_as::<Widget>("b").unwrap();
    assert!(Arc::ptr_eq(b.dependency.as_ref().unwrap(), &a));
}

#[test]
fn self_dependency_through_init() {
    let container = Container::new(
        registry(),
        vec![(
            "panel",
            BeanRecord::with_class("Panel")
                .call("setX", Value::parse_str("reference-to:panel"))
                .into(),
        )],
    );

    assert!(matches!(
        container.get("panel"),
        Err(ContainerError::CircularDependency { .. })
    ));
}

#[test]
fn test_builds_every_non_abstract_bean() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);

    let container = Container::new(
        registry(),
        vec![
            ("base", BeanRecord::with_class("Widget").mark_abstract().into()),
            ("one", BeanRecord::new().extends("base").arg("one").into()),
            ("two", BeanRecord::with_class("Panel").into()),
            (
                "three",
                Definition::factory(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(3i64) as Instance)
                }),
            ),
        ],
    );

    container.test(None).unwrap();

    assert!(!container.is_instantiated("base"));
    for name in ["one", "two", "three"] {
        assert!(container.is_instantiated(name), "{} should be built", name);
    }

    // 再次检查不会重复构造
    container.test(None).unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn test_with_empty_list_is_invalid() {
    let container = Container::new(registry(), vec![("two", BeanRecord::with_class("Panel").into())]);

    let empty: &[&str] = &[];
    match container.test(Some(empty)).unwrap_err() {
        ContainerError::InvalidArgument(reason) => assert_eq!(reason, "check list can't be empty"),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
    assert!(!container.is_instantiated("two"));
}

#[test]
fn test_with_names_builds_only_those() {
    let container = Container::new(
        registry(),
        vec![
            (
                "onlyThisOne",
                BeanRecord::with_class("Widget")
                    .arg("x")
                    .arg(Value::reference("dep"))
                    .into(),
            ),
            ("dep", BeanRecord::with_class("Panel").into()),
            ("other", BeanRecord::with_class("Panel").into()),
        ],
    );

    container.test(Some(&["onlyThisOne"][..])).unwrap();

    assert!(container.is_instantiated("onlyThisOne"));
    assert!(container.is_instantiated("dep"));
    assert!(!container.is_instantiated("other"));
}

#[test]
fn test_stops_at_first_failure() {
    let container = Container::new(
        registry(),
        vec![
            ("first", BeanRecord::with_class("Panel").into()),
            ("broken", BeanRecord::with_class("Missing").into()),
            ("last", BeanRecord::with_class("Panel").into()),
        ],
    );

    let err = container.test(None).unwrap_err();
    assert_eq!(err.bean_name(), Some("broken"));
    assert!(container.is_instantiated("first"));
    assert!(!container.is_instantiated("last"));
}

#[test]
fn init_receives_the_container_for_self_reference() {
    let container = Container::new(
        registry(),
        vec![(
            "panel",
            BeanRecord::with_class("Panel")
                .init(InitOp::parse("$title", Value::from("Main")))
                .init(InitOp::parse("setX", Value::parse_str("reference-to:self")))
                .into(),
        )],
    );

    let panel = container.get_as::<Panel>("panel").unwrap();
    assert_eq!(panel.title, "Main");
    assert!(Arc::ptr_eq(panel.container.as_ref().unwrap(), &container));
}

#[test]
fn instance_of_is_checked() {
    let container = Container::new(
        registry(),
        vec![
            (
                "ok",
                BeanRecord::with_class("Widget").instance_of("Component").into(),
            ),
            (
                "bad",
                BeanRecord::with_class("Panel").instance_of("Component").into(),
            ),
            (
                "wrong_class",
                BeanRecord::with_class("Widget")
                    .builder_fn(|_| Ok(Panel::default()))
                    .into(),
            ),
        ],
    );

    assert!(container.get("ok").is_ok());

    for name in ["bad", "wrong_class"] {
        match container.get(name).err().unwrap() {
            ContainerError::BeanInstantiationFailed { bean, reason } => {
                assert_eq!(bean, name);
                assert!(reason.contains("instance check failed"), "{}", reason);
            }
            other => panic!("Expected BeanInstantiationFailed, got {:?}", other),
        }
    }
}

#[test]
fn builder_without_instance_fails() {
    let mut registry = registry();
    registry.register_builder_constructor(
        "nothing",
        Arc::new(|_: Vec<Value>| -> anyhow::Result<Option<Box<dyn Bean>>> { Ok(None) }),
    );
    let nothing = registry.builder("nothing").unwrap();

    let container = Container::new(
        registry,
        vec![("empty", BeanRecord::with_class("Widget").builder(nothing).into())],
    );

    assert!(matches!(
        container.get("empty"),
        Err(ContainerError::BeanInstantiationFailed { .. })
    ));
}

#[test]
fn factory_errors_propagate() {
    let container = Container::new(
        registry(),
        vec![
            (
                "nested",
                Definition::factory(|container| Ok(container.get("ghost")?)),
            ),
            (
                "failing",
                Definition::factory(|_| Err(anyhow::anyhow!("disk full"))),
            ),
        ],
    );

    assert!(matches!(
        container.get("nested"),
        Err(ContainerError::NoDefinitionFound(ref name)) if name == "ghost"
    ));

    match container.get("failing").err().unwrap() {
        ContainerError::BeanInstantiationFailed { bean, reason } => {
            assert_eq!(bean, "failing");
            assert!(reason.contains("disk full"));
        }
        other => panic!("Expected BeanInstantiationFailed, got {:?}", other),
    }
}

#[test]
fn toml_definitions_drive_the_container() {
    let registry = registry();
    let definitions = DefinitionLoader::new(&registry)
        .from_str(
            r#"
            [base]
            abstract = true
            class = "Widget"
            instanceof = ["Component"]

            [main]
            extends = "base"
            constructor-args = ["main", "reference-to:panel"]

            [panel]
            class = "Panel"
            init = [
                { op = "$title", value = "Side" },
                { setX = "reference-to:self" },
            ]

            [primary]
            alias = "main"
            "#,
        )
        .unwrap();

    let container = Container::builder()
        .registry(registry)
        .definitions(definitions)
        .build();

    assert_eq!(container.bean_names(), vec!["base", "main", "panel", "primary"]);
    container.test(None).unwrap();

    let main = container.get_as::<Widget>("primary").unwrap();
    assert_eq!(main.label, "main");

    let panel = main.dependency.as_ref().unwrap().downcast_arc::<Panel>().unwrap();
    assert_eq!(panel.title, "Side");
    assert!(Arc::ptr_eq(panel.container.as_ref().unwrap(), &container));
}

/// 记录映射参数的键顺序
struct Holder {
    keys: Vec<String>,
}

impl Bean for Holder {}

#[test]
fn map_references_resolve_in_declaration_order() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let recorder = |name: &'static str| {
        let order = Arc::clone(&order);
        Definition::factory(move |_| {
            order.lock().push(name);
            Ok(Arc::new(name.to_string()) as Instance)
        })
    };

    let mut registry = registry();
    registry.register_class("Holder", |args: Vec<Value>| {
        Ok(Holder {
            keys: args
                .first()
                .and_then(Value::as_map)
                .map(|map| map.keys().cloned().collect())
                .unwrap_or_default(),
        })
    });

    let definitions = DefinitionLoader::new(&registry)
        .from_str(
            r#"
            [holder]
            class = "Holder"
            constructor-args = [{ zeta = "reference-to:zb", alpha = "reference-to:ab" }]
            "#,
        )
        .unwrap();

    let container = Container::builder()
        .registry(registry)
        .definitions(definitions)
        .define("zb", recorder("zb"))
        .define("ab", recorder("ab"))
        .build();

    let holder = container.get_as::<Holder>("holder").unwrap();
    assert_eq!(holder.keys, vec!["zeta", "alpha"]);
    assert_eq!(*order.lock(), vec!["zb", "ab"]);
}

#[test]
fn concurrent_requests_are_not_cycles() {
    let calls = Arc::new(AtomicUsize::new(0));
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let container = {
        let calls = Arc::clone(&calls);
        let entered = Arc::clone(&entered);
        let release = Arc::clone(&release);
        Container::new(
            registry(),
            vec![(
                "slow",
                Definition::factory(move |_| {
                    // 只有第一次构造会停在屏障上
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        entered.wait();
                        release.wait();
                    }
                    Ok(Arc::new(String::from("ok")) as Instance)
                }),
            )],
        )
    };

    let (first, second) = thread::scope(|scope| {
        let first = scope.spawn(|| container.get("slow"));

        // 第一个线程正在构造 slow 时，另一个线程请求同一个 Bean
        entered.wait();
        let second = scope.spawn(|| container.get("slow")).join().unwrap();
        release.wait();

        (first.join().unwrap(), second)
    });

    let first = first.unwrap();
    let second = second.unwrap();

    // 两个线程都构造了实例，先缓存的实例胜出
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &container.get("slow").unwrap()));
}
