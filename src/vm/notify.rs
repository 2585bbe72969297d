//! 属性变更通知：订阅者按属性名接收变更

use std::fmt;

type Handler = Box<dyn FnMut(&str)>;

#[derive(Default)]
pub struct PropertyNotifier {
    handlers: Vec<Handler>,
}

impl fmt::Debug for PropertyNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyNotifier")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl PropertyNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: FnMut(&str) + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    pub fn notify(&mut self, name: &str) {
        for handler in &mut self.handlers {
            handler(name);
        }
    }

    /// 值不同才赋值并通知，返回是否发生了变化
    pub fn set_field<T: PartialEq>(&mut self, field: &mut T, value: T, name: &str) -> bool {
        if *field == value {
            return false;
        }
        *field = value;
        self.notify(name);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_set_field_notifies_only_on_change() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut notifier = PropertyNotifier::new();
        let sink = seen.clone();
        notifier.subscribe(move |name| sink.borrow_mut().push(name.to_string()));

        let mut value = 1;
        assert!(!notifier.set_field(&mut value, 1, "value"));
        assert!(notifier.set_field(&mut value, 2, "value"));
        assert_eq!(value, 2);
        assert_eq!(*seen.borrow(), vec!["value".to_string()]);
    }
}
