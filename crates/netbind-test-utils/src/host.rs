//! In-memory reference-counted [`ScriptHost`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use netbind_core::{
    EntityKind, Finalization, FinalizerSink, ObjectRef, PromiseCapability, ScriptError,
    ScriptHost, Value,
};

/// Settlement state of a mock promise.
#[derive(Clone, Debug, PartialEq)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

enum Kind {
    Entity(EntityKind),
    Plain(HashMap<String, Value>),
    Function { calls: Vec<Vec<Value>>, throws: bool },
    Array(Vec<Value>),
    Promise(PromiseState),
    Settler { promise: ObjectRef, fulfil: bool },
}

struct Object {
    refs: u32,
    opaque: Option<u64>,
    kind: Kind,
}

#[derive(Default)]
struct State {
    sink: Option<FinalizerSink>,
    next_id: u64,
    objects: HashMap<ObjectRef, Object>,
    fail_new_object: bool,
    finalized: usize,
}

impl State {
    fn insert(&mut self, kind: Kind) -> ObjectRef {
        self.next_id += 1;
        let object = ObjectRef(self.next_id);
        self.objects.insert(
            object,
            Object {
                refs: 1,
                opaque: None,
                kind,
            },
        );
        object
    }

    fn dup(&mut self, object: ObjectRef) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.refs += 1;
        }
    }

    /// Drop one reference; collect the object and everything it alone
    /// kept alive when the count reaches zero.
    fn free(&mut self, object: ObjectRef) {
        let mut pending = vec![object];
        while let Some(object) = pending.pop() {
            let Some(o) = self.objects.get_mut(&object) else {
                continue;
            };
            o.refs -= 1;
            if o.refs > 0 {
                continue;
            }
            let Some(dead) = self.objects.remove(&object) else {
                continue;
            };
            match dead.kind {
                Kind::Entity(kind) => {
                    if let Some(key) = dead.opaque {
                        self.finalized += 1;
                        if let Some(sink) = &self.sink {
                            sink.post(Finalization { kind, key });
                        }
                    }
                }
                Kind::Plain(props) => {
                    pending.extend(props.into_values().filter_map(|v| v.as_object()));
                }
                Kind::Array(items) => {
                    pending.extend(items.into_iter().filter_map(|v| v.as_object()));
                }
                Kind::Settler { promise, .. } => pending.push(promise),
                Kind::Function { .. } | Kind::Promise(_) => {}
            }
        }
    }
}

/// In-memory script host. Clones share state.
#[derive(Clone, Default)]
pub struct MockScriptHost {
    state: Rc<RefCell<State>>,
}

impl MockScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_new_object(&self, fail: bool) {
        self.state.borrow_mut().fail_new_object = fail;
    }

    // ── Script-side objects ────────────────────────────────────

    /// A function that records every call.
    pub fn new_function(&self) -> ObjectRef {
        self.state.borrow_mut().insert(Kind::Function {
            calls: Vec::new(),
            throws: false,
        })
    }

    /// A function that records every call and then throws.
    pub fn new_throwing_function(&self) -> ObjectRef {
        self.state.borrow_mut().insert(Kind::Function {
            calls: Vec::new(),
            throws: true,
        })
    }

    /// A plain object. Object references in `props` are consumed.
    pub fn new_plain(&self, props: Vec<(&str, Value)>) -> ObjectRef {
        let props = props
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect();
        self.state.borrow_mut().insert(Kind::Plain(props))
    }

    /// Drop a reference held by the test (the "script").
    pub fn release(&self, object: ObjectRef) {
        self.state.borrow_mut().free(object);
    }

    // ── Inspection ─────────────────────────────────────────────

    /// Argument lists of every call made to `function`.
    pub fn calls(&self, function: ObjectRef) -> Vec<Vec<Value>> {
        match self.state.borrow().objects.get(&function).map(|o| &o.kind) {
            Some(Kind::Function { calls, .. }) => calls.clone(),
            _ => Vec::new(),
        }
    }

    pub fn promise_state(&self, promise: ObjectRef) -> Option<PromiseState> {
        match self.state.borrow().objects.get(&promise).map(|o| &o.kind) {
            Some(Kind::Promise(state)) => Some(state.clone()),
            _ => None,
        }
    }

    pub fn array_items(&self, array: ObjectRef) -> Vec<Value> {
        match self.state.borrow().objects.get(&array).map(|o| &o.kind) {
            Some(Kind::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Reference count, `None` once collected.
    pub fn refs(&self, object: ObjectRef) -> Option<u32> {
        self.state.borrow().objects.get(&object).map(|o| o.refs)
    }

    pub fn is_alive(&self, object: ObjectRef) -> bool {
        self.refs(object).is_some()
    }

    /// Live objects of an entity class.
    pub fn live_entities(&self, kind: EntityKind) -> usize {
        self.state
            .borrow()
            .objects
            .values()
            .filter(|o| matches!(o.kind, Kind::Entity(k) if k == kind))
            .count()
    }

    /// Every live object, of any class.
    pub fn live_objects(&self) -> usize {
        self.state.borrow().objects.len()
    }

    /// Entity objects collected so far that carried an opaque key.
    pub fn finalized(&self) -> usize {
        self.state.borrow().finalized
    }

    pub fn is_attached(&self) -> bool {
        self.state.borrow().sink.is_some()
    }
}

impl ScriptHost for MockScriptHost {
    fn attach(&mut self, sink: FinalizerSink) -> Result<(), ScriptError> {
        self.state.borrow_mut().sink = Some(sink);
        Ok(())
    }

    fn detach(&mut self) {
        self.state.borrow_mut().sink = None;
    }

    fn new_object(&mut self, kind: EntityKind) -> Result<ObjectRef, ScriptError> {
        let mut st = self.state.borrow_mut();
        if st.fail_new_object {
            return Err(ScriptError::new(
                netbind_core::ScriptErrorKind::InternalError,
                "out of memory",
            ));
        }
        Ok(st.insert(Kind::Entity(kind)))
    }

    fn set_opaque(&mut self, object: ObjectRef, key: u64) -> Result<(), ScriptError> {
        match self.state.borrow_mut().objects.get_mut(&object) {
            Some(o) if matches!(o.kind, Kind::Entity(_)) => {
                o.opaque = Some(key);
                Ok(())
            }
            _ => Err(ScriptError::type_error("object cannot carry an opaque key")),
        }
    }

    fn opaque(&self, object: ObjectRef, kind: EntityKind) -> Option<u64> {
        let st = self.state.borrow();
        let o = st.objects.get(&object)?;
        match o.kind {
            Kind::Entity(k) if k == kind => o.opaque,
            _ => None,
        }
    }

    fn dup(&mut self, object: ObjectRef) -> ObjectRef {
        self.state.borrow_mut().dup(object);
        object
    }

    fn free(&mut self, object: ObjectRef) {
        self.state.borrow_mut().free(object);
    }

    fn get_property(&mut self, object: ObjectRef, name: &str) -> Result<Value, ScriptError> {
        let mut st = self.state.borrow_mut();
        let value = match st.objects.get(&object).map(|o| &o.kind) {
            Some(Kind::Plain(props)) => props.get(name).cloned().unwrap_or(Value::Undefined),
            Some(_) => Value::Undefined,
            None => return Err(ScriptError::type_error("object is gone")),
        };
        if let Some(inner) = value.as_object() {
            st.dup(inner);
        }
        Ok(value)
    }

    fn is_function(&self, value: &Value) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        matches!(
            self.state.borrow().objects.get(&object).map(|o| &o.kind),
            Some(Kind::Function { .. } | Kind::Settler { .. })
        )
    }

    fn call(
        &mut self,
        function: ObjectRef,
        _this: &Value,
        args: &[Value],
    ) -> Result<Value, ScriptError> {
        let mut st = self.state.borrow_mut();
        let (promise, fulfil) = match st.objects.get_mut(&function).map(|o| &mut o.kind) {
            Some(Kind::Function { calls, throws }) => {
                calls.push(args.to_vec());
                return if *throws {
                    Err(ScriptError::error("callback failed"))
                } else {
                    Ok(Value::Undefined)
                };
            }
            Some(Kind::Settler { promise, fulfil }) => (*promise, *fulfil),
            _ => return Err(ScriptError::type_error("not a function")),
        };
        if let Some(Kind::Promise(state)) = st.objects.get_mut(&promise).map(|o| &mut o.kind) {
            if *state == PromiseState::Pending {
                let value = args.first().cloned().unwrap_or(Value::Undefined);
                *state = if fulfil {
                    PromiseState::Fulfilled(value)
                } else {
                    PromiseState::Rejected(value)
                };
            }
        }
        Ok(Value::Undefined)
    }

    fn new_array(&mut self, items: Vec<Value>) -> Result<ObjectRef, ScriptError> {
        Ok(self.state.borrow_mut().insert(Kind::Array(items)))
    }

    fn new_promise(&mut self) -> Result<PromiseCapability, ScriptError> {
        let mut st = self.state.borrow_mut();
        let promise = st.insert(Kind::Promise(PromiseState::Pending));
        // Each settle function keeps the promise alive.
        st.dup(promise);
        let resolve = st.insert(Kind::Settler {
            promise,
            fulfil: true,
        });
        st.dup(promise);
        let reject = st.insert(Kind::Settler {
            promise,
            fulfil: false,
        });
        Ok(PromiseCapability {
            promise,
            resolve,
            reject,
        })
    }
}
