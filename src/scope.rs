use crate::node::RuntimeError;
use crate::value::{Builtin, Value};
use rustc_hash::FxHashMap;
use std::{cell::RefCell, rc::Rc};

pub type ScopeLink = Rc<RefCell<Scope>>;

#[derive(Debug)]
pub struct Scope {
    stack: FxHashMap<Rc<str>, Value>,
    parent: Option<ScopeLink>,
    // What `this` resolves to. Every scope starts out with its own empty object.
    receiver: Value,
    // Number of function calls active when this scope was entered.
    depth: usize,
}

impl Default for Scope {
    fn default() -> Self {
        Scope {
            stack: FxHashMap::default(),
            parent: None,
            receiver: Value::new_object(),
            depth: 0,
        }
    }
}

impl Scope {
    /// A root scope with the builtins bound.
    pub fn global() -> ScopeLink {
        let mut scope = Scope::default();
        scope.declare("print".into(), Value::Builtin(Builtin::Print));
        Rc::new(RefCell::new(scope))
    }

    pub fn new_child(this: ScopeLink) -> Scope {
        Scope {
            parent: Some(this),
            ..Default::default()
        }
    }

    /// A child entered by a call made from a scope at `depth - 1`.
    pub fn call_frame(closure: ScopeLink, depth: usize) -> Scope {
        Scope {
            depth,
            ..Scope::new_child(closure)
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn try_get_here(&self, id: &str) -> Option<Value> {
        self.stack.get(id).cloned()
    }

    /// Resolves `id` here or in the nearest ancestor that binds it.
    pub fn get(&self, id: &str) -> Option<Value> {
        if id == "this" {
            return Some(self.receiver.clone());
        }
        if let Some(val) = self.try_get_here(id) {
            return Some(val);
        }

        let mut cur = self.parent.clone();
        while let Some(scope) = cur {
            let borrow = (*scope).borrow();
            if let Some(val) = borrow.try_get_here(id) {
                return Some(val);
            }
            let next = borrow.parent.clone();
            drop(borrow);
            cur = next;
        }
        None
    }

    /// Overwrites the nearest existing binding of `id`. Never creates one.
    pub fn assign(&mut self, id: &str, val: Value) -> Result<(), RuntimeError> {
        if id == "this" {
            self.receiver = val;
            return Ok(());
        }
        if let Some(slot) = self.stack.get_mut(id) {
            *slot = val;
            return Ok(());
        }

        let mut cur = self.parent.clone();
        while let Some(scope) = cur {
            let mut borrow = (*scope).borrow_mut();
            if let Some(slot) = borrow.stack.get_mut(id) {
                *slot = val;
                return Ok(());
            }
            let next = borrow.parent.clone();
            drop(borrow);
            cur = next;
        }
        Err(RuntimeError::UndefinedVariable(id.into()))
    }

    pub fn declare(&mut self, id: Rc<str>, val: Value) {
        self.stack.insert(id, val);
    }

    pub fn receiver(&self) -> Value {
        self.receiver.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_chain() {
        let global = Scope::global();
        global.borrow_mut().declare("a".into(), Value::Num(1.0));
        let child = Rc::new(RefCell::new(Scope::new_child(global.clone())));
        let grandchild = Scope::new_child(child.clone());

        assert_eq!(grandchild.get("a"), Some(Value::Num(1.0)));
        assert_eq!(grandchild.get("print"), Some(Value::Builtin(Builtin::Print)));
        assert_eq!(grandchild.get("b"), None);
    }

    #[test]
    fn assign_writes_to_the_declaring_scope() {
        let global = Scope::global();
        global.borrow_mut().declare("a".into(), Value::Num(1.0));
        let mut child = Scope::new_child(global.clone());

        child.assign("a", Value::Num(2.0)).unwrap();
        assert_eq!(child.try_get_here("a"), None);
        assert_eq!(global.borrow().get("a"), Some(Value::Num(2.0)));

        assert_eq!(
            child.assign("missing", Value::Null),
            Err(RuntimeError::UndefinedVariable("missing".into()))
        );
    }

    #[test]
    fn shadowing_leaves_the_outer_binding() {
        let global = Scope::global();
        global.borrow_mut().declare("x".into(), Value::Num(1.0));
        let mut child = Scope::new_child(global.clone());
        child.declare("x".into(), Value::Num(2.0));
        child.assign("x", Value::Num(3.0)).unwrap();

        assert_eq!(child.get("x"), Some(Value::Num(3.0)));
        assert_eq!(global.borrow().get("x"), Some(Value::Num(1.0)));
    }

    #[test]
    fn each_scope_has_its_own_receiver() {
        let global = Scope::global();
        let child = Scope::new_child(global.clone());
        assert_ne!(child.get("this"), global.borrow().get("this"));
    }

    #[test]
    fn call_depth_follows_the_caller() {
        let global = Scope::global();
        let frame = Scope::call_frame(global.clone(), 3);
        assert_eq!(global.borrow().depth(), 0);
        assert_eq!(frame.depth(), 3);
        assert_eq!(Scope::new_child(global).depth(), 0);
    }
}
