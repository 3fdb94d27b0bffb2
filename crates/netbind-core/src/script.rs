//! The script runtime as seen by the bridge.

use crate::error::ScriptError;
use crate::event::FinalizerSink;
use crate::id::{EntityKind, ObjectRef};
use crate::value::{PromiseCapability, Value};

/// A garbage-collected script runtime.
///
/// Objects are handled through counted [`ObjectRef`]s. When the last
/// reference to an entity-class object goes away and it carries an
/// opaque key, the host posts a
/// [`Finalization`](crate::Finalization) to the sink installed with
/// [`attach`](Self::attach). It never calls back into the bridge.
pub trait ScriptHost {
    /// Install the finalization sink. Called once when a context is created.
    fn attach(&mut self, sink: FinalizerSink) -> Result<(), ScriptError>;

    /// Drop the finalization sink. Called once during teardown.
    fn detach(&mut self);

    /// Create an empty object of an entity class. The returned reference
    /// is owned by the caller.
    fn new_object(&mut self, kind: EntityKind) -> Result<ObjectRef, ScriptError>;

    /// Attach an opaque key to an entity-class object.
    fn set_opaque(&mut self, object: ObjectRef, key: u64) -> Result<(), ScriptError>;

    /// The opaque key of `object` if it is of class `kind`.
    fn opaque(&self, object: ObjectRef, kind: EntityKind) -> Option<u64>;

    /// Take another reference to an object.
    fn dup(&mut self, object: ObjectRef) -> ObjectRef;

    /// Give back one reference.
    fn free(&mut self, object: ObjectRef);

    /// Read a property. The returned value is owned by the caller.
    fn get_property(&mut self, object: ObjectRef, name: &str) -> Result<Value, ScriptError>;

    /// Whether a value is callable.
    fn is_function(&self, value: &Value) -> bool;

    /// Call a function. Arguments are borrowed; the result is owned.
    fn call(
        &mut self,
        function: ObjectRef,
        this: &Value,
        args: &[Value],
    ) -> Result<Value, ScriptError>;

    /// Create an array. Object references in `items` are consumed.
    fn new_array(&mut self, items: Vec<Value>) -> Result<ObjectRef, ScriptError>;

    /// Create a pending promise and its settle functions.
    fn new_promise(&mut self) -> Result<PromiseCapability, ScriptError>;

    /// Give back the reference held by a value, if any.
    fn free_value(&mut self, value: Value) {
        if let Value::Object(object) = value {
            self.free(object);
        }
    }
}
