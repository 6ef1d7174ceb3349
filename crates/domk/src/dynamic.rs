//! Dynamic values
//!
//! A binding value may be a source that pushes values over time instead of
//! a plain [`Value`]. The updater subscribes once per `(node, slot)`
//! registration and tags it with a generation token, so a delivery from a
//! superseded registration is dropped.

use std::fmt;
use std::rc::Rc;

use domk_dom::Value;

use crate::subscription::Subscription;

/// Receives pushed values
pub type Sink = Rc<dyn Fn(Value)>;

/// Something that pushes values into a sink until unsubscribed
pub trait DynamicSource {
    /// Start delivering values. Implementations may call `sink`
    /// synchronously before returning.
    fn subscribe(&self, sink: Sink) -> Subscription;

    /// Identity used to detect an unchanged source between passes
    fn identity(&self) -> *const () {
        self as *const Self as *const ()
    }
}

impl<F> DynamicSource for F
where
    F: Fn(Sink) -> Subscription,
{
    fn subscribe(&self, sink: Sink) -> Subscription {
        self(sink)
    }
}

/// Shared handle to a dynamic source
#[derive(Clone)]
pub struct DynamicValue(Rc<dyn DynamicSource>);

impl DynamicValue {
    pub fn new(source: impl DynamicSource + 'static) -> Self {
        Self(Rc::new(source))
    }

    /// Source backed by a subscribe function
    pub fn from_fn(subscribe: impl Fn(Sink) -> Subscription + 'static) -> Self {
        Self::new(subscribe)
    }

    pub fn subscribe(&self, sink: Sink) -> Subscription {
        self.0.subscribe(sink)
    }

    /// Same underlying source
    pub fn ptr_eq(&self, other: &DynamicValue) -> bool {
        self.0.identity() == other.0.identity()
    }
}

impl fmt::Debug for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamicValue({:p})", self.0.identity())
    }
}

/// Binding value: either known now, or pushed later
#[derive(Debug, Clone)]
pub enum ValueSource {
    Static(Value),
    Dynamic(DynamicValue),
}

impl ValueSource {
    /// Same value, or same dynamic source
    pub fn same_as(&self, other: &ValueSource) -> bool {
        match (self, other) {
            (ValueSource::Static(a), ValueSource::Static(b)) => a == b,
            (ValueSource::Dynamic(a), ValueSource::Dynamic(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Default for ValueSource {
    fn default() -> Self {
        ValueSource::Static(Value::Null)
    }
}

impl From<DynamicValue> for ValueSource {
    fn from(value: DynamicValue) -> Self {
        ValueSource::Dynamic(value)
    }
}

macro_rules! static_source {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for ValueSource {
                fn from(value: $t) -> Self {
                    ValueSource::Static(Value::from(value))
                }
            }
        )*
    };
}

static_source!(Value, bool, char, i32, i64, u32, u64, usize, f32, f64, String, &str, &String);

impl<T: Into<Value>> From<Option<T>> for ValueSource {
    fn from(value: Option<T>) -> Self {
        ValueSource::Static(value.map_or(Value::Null, Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_clones_share_identity() {
        let a = DynamicValue::from_fn(|sink| {
            sink(Value::from(1));
            Subscription::empty()
        });
        let b = DynamicValue::from_fn(|_| Subscription::empty());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_from_fn_delivers() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let value = DynamicValue::from_fn(|sink| {
            sink(Value::from("a"));
            sink(Value::from("b"));
            Subscription::empty()
        });
        let s = seen.clone();
        let _sub = value.subscribe(Rc::new(move |v| s.borrow_mut().push(v)));
        assert_eq!(*seen.borrow(), vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_static_sources_compare_by_value() {
        assert!(ValueSource::from(1).same_as(&ValueSource::from(1.0)));
        assert!(!ValueSource::from("1").same_as(&ValueSource::from(1)));
        assert!(ValueSource::from(None::<i32>).same_as(&ValueSource::Static(Value::Null)));
    }
}
