//! 业务绑定：让普通数据对象在运行时挂接额外的命名属性
//!
//! 数据源通过 [`LinkedSource::link_declarations`] 声明"字段 → 键"的逻辑链接。
//! 梳理（[`LinkMediator::comb`]）时为每个键创建一个业务成员：
//! 数据源本身存在同名字段则直接绑定该字段，否则预留空位等待外部设置 get/set。

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::vm::notify::PropertyNotifier;

/// 刷新整个绑定模型时通知的属性名
pub const REFRESH_BIND_MODEL: &str = "refresh_bind_model";

/// 一条逻辑链接：字段 `field` 链接到业务键 `key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDecl {
    pub field: &'static str,
    /// 可以是数据源的字段名，也可以是自定义键（由外部实现）
    pub key: &'static str,
}

impl LinkDecl {
    pub const fn new(field: &'static str, key: &'static str) -> Self {
        Self { field, key }
    }
}

/// 可被业务绑定的数据源
pub trait LinkedSource {
    /// 逻辑链接声明表
    fn link_declarations(&self) -> Vec<LinkDecl>;

    /// 读取字段，字段不存在时返回 None
    fn get_field(&self, name: &str) -> Option<Value>;

    /// 写入字段，返回字段是否存在并被写入
    fn set_field(&mut self, name: &str, value: Value) -> bool;
}

pub type Getter<S> = Box<dyn Fn(&S) -> Option<Value>>;
pub type Setter<S> = Box<dyn FnMut(&mut S, Value)>;

/// 业务成员
struct LinkedProperty<S> {
    getter: Option<Getter<S>>,
    setter: Option<Setter<S>>,
}

impl<S: LinkedSource + 'static> LinkedProperty<S> {
    fn unbound() -> Self {
        Self {
            getter: None,
            setter: None,
        }
    }

    /// 直接绑定到数据源的同名字段
    fn bound_to_field(key: &str) -> Self {
        let get_key = key.to_string();
        let set_key = key.to_string();
        Self {
            getter: Some(Box::new(move |s: &S| s.get_field(&get_key))),
            setter: Some(Box::new(move |s: &mut S, v| {
                s.set_field(&set_key, v);
            })),
        }
    }
}

/// 业务发起人：声明了逻辑链接的字段，缓存其最近一次读取的值
#[derive(Debug, Clone, PartialEq)]
pub struct Originator {
    pub name: String,
    pub value: Option<Value>,
    pub keys: Vec<String>,
}

impl Originator {
    pub fn current_value<S: LinkedSource>(&self, source: &S) -> Option<Value> {
        source.get_field(&self.name)
    }

    pub fn refresh_value<S: LinkedSource>(&mut self, source: &S) {
        self.value = source.get_field(&self.name);
    }
}

/// 业务中介者
pub struct LinkMediator<S> {
    originators: IndexMap<String, Originator>,
    properties: IndexMap<String, LinkedProperty<S>>,
}

impl<S> Default for LinkMediator<S> {
    fn default() -> Self {
        Self {
            originators: IndexMap::new(),
            properties: IndexMap::new(),
        }
    }
}

impl<S> fmt::Debug for LinkMediator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkMediator")
            .field("originators", &self.originators)
            .field("keys", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<S: LinkedSource + 'static> LinkMediator<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 梳理数据源的逻辑链接，重复调用会按当前声明重建
    pub fn comb(&mut self, source: &S) {
        self.originators.clear();
        self.properties.clear();

        for decl in source.link_declarations() {
            let originator = self
                .originators
                .entry(decl.field.to_string())
                .or_insert_with(|| Originator {
                    name: decl.field.to_string(),
                    value: source.get_field(decl.field),
                    keys: Vec::new(),
                });
            originator.keys.push(decl.key.to_string());

            let property = if source.get_field(decl.key).is_some() {
                LinkedProperty::bound_to_field(decl.key)
            } else {
                LinkedProperty::unbound()
            };
            self.properties.insert(decl.key.to_string(), property);
        }
        tracing::debug!(
            "业务梳理完成: {} 个发起字段，{} 个业务成员",
            self.originators.len(),
            self.properties.len()
        );
    }

    /// 设置业务成员的 get 方法；未知键忽略，返回是否设置成功
    pub fn set_getter<F>(&mut self, key: &str, getter: F) -> bool
    where
        F: Fn(&S) -> Option<Value> + 'static,
    {
        match self.properties.get_mut(key) {
            Some(property) => {
                property.getter = Some(Box::new(getter));
                true
            }
            None => false,
        }
    }

    /// 设置业务成员的 set 方法；未知键忽略，返回是否设置成功
    pub fn set_setter<F>(&mut self, key: &str, setter: F) -> bool
    where
        F: FnMut(&mut S, Value) + 'static,
    {
        match self.properties.get_mut(key) {
            Some(property) => {
                property.setter = Some(Box::new(setter));
                true
            }
            None => false,
        }
    }

    pub fn get(&self, source: &S, key: &str) -> Option<Value> {
        let getter = self.properties.get(key)?.getter.as_ref()?;
        getter(source)
    }

    pub fn set(&mut self, source: &mut S, key: &str, value: Value) {
        if let Some(setter) = self.properties.get_mut(key).and_then(|p| p.setter.as_mut()) {
            setter(source, value);
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// 字段是否声明了逻辑链接
    pub fn has_link(&self, field: &str) -> bool {
        self.originators.contains_key(field)
    }

    pub fn originators(&self) -> impl Iterator<Item = &Originator> {
        self.originators.values()
    }

    pub fn originator(&self, field: &str) -> Option<&Originator> {
        self.originators.get(field)
    }

    fn originator_mut(&mut self, field: &str) -> Option<&mut Originator> {
        self.originators.get_mut(field)
    }
}

/// 业务模型：数据源 + 中介者 + 属性通知
pub struct LinkedModel<S> {
    source: S,
    mediator: LinkMediator<S>,
    notifier: PropertyNotifier,
}

impl<S: LinkedSource + 'static> LinkedModel<S> {
    pub fn new(source: S) -> Self {
        let mut mediator = LinkMediator::new();
        mediator.comb(&source);
        Self {
            source,
            mediator,
            notifier: PropertyNotifier::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 直接修改数据源；修改后可调用 [`Self::refresh_field`] 检查发起字段
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn mediator(&self) -> &LinkMediator<S> {
        &self.mediator
    }

    pub fn notifier_mut(&mut self) -> &mut PropertyNotifier {
        &mut self.notifier
    }

    /// 同时设置附属业务的 get/set 方法
    pub fn set_process<G, T>(&mut self, key: &str, getter: G, setter: T)
    where
        G: Fn(&S) -> Option<Value> + 'static,
        T: FnMut(&mut S, Value) + 'static,
    {
        self.mediator.set_getter(key, getter);
        self.mediator.set_setter(key, setter);
    }

    pub fn set_process_getter<G>(&mut self, key: &str, getter: G)
    where
        G: Fn(&S) -> Option<Value> + 'static,
    {
        self.mediator.set_getter(key, getter);
    }

    pub fn set_process_setter<T>(&mut self, key: &str, setter: T)
    where
        T: FnMut(&mut S, Value) + 'static,
    {
        self.mediator.set_setter(key, setter);
    }

    pub fn get_process_data(&self, key: &str) -> Option<Value> {
        self.mediator.get(&self.source, key)
    }

    /// 调用业务 set 方法并以键名发出变更通知
    pub fn set_process_data(&mut self, key: &str, value: Value) {
        self.mediator.set(&mut self.source, key, value);
        self.notifier.notify(key);
    }

    /// 通知界面整体刷新
    pub fn refresh_process_data(&mut self) {
        self.notifier.notify(REFRESH_BIND_MODEL);
    }

    /// 发起字段的值与缓存不同时刷新缓存并通知；未声明链接的字段总是通知
    pub fn refresh_field(&mut self, name: &str) {
        let Some(originator) = self.mediator.originator_mut(name) else {
            self.notifier.notify(REFRESH_BIND_MODEL);
            return;
        };
        if originator.value != originator.current_value(&self.source) {
            originator.refresh_value(&self.source);
            self.notifier.notify(REFRESH_BIND_MODEL);
        }
    }
}
