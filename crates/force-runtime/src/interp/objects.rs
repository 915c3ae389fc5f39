//! Scopes, user functions, classes and instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::target::ir::FunctionDef;
use crate::value::Value;

/// A namespace in the scope chain.
#[derive(Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
    /// Class bodies are not visible from the methods defined in them.
    class_body: bool,
}

impl Scope {
    pub fn global() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(Rc::clone(parent)),
            ..Self::default()
        })
    }

    pub fn class_body(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(Rc::clone(parent)),
            class_body: true,
            ..Self::default()
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    pub fn assign(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Scope that functions defined here close over.
    pub fn closure_scope(self: &Rc<Self>) -> Rc<Scope> {
        match (&self.parent, self.class_body) {
            (Some(parent), true) => Rc::clone(parent),
            _ => Rc::clone(self),
        }
    }

    pub fn take_vars(&self) -> HashMap<String, Value> {
        std::mem::take(&mut *self.vars.borrow_mut())
    }

    /// Drop every binding, breaking reference cycles through closures.
    pub fn clear(&self) {
        drop(self.take_vars());
    }
}

/// A function defined by the program.
pub struct Function {
    pub def: Rc<FunctionDef>,
    /// Evaluated default for each parameter, if it has one.
    pub defaults: Vec<Option<Value>>,
    pub closure: Rc<Scope>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.def.name
    }
}

pub struct Class {
    pub name: String,
    pub base: Option<Rc<Class>>,
    pub attrs: RefCell<HashMap<String, Value>>,
}

impl Class {
    /// Attribute lookup through the base chain.
    pub fn find(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.attrs.borrow().get(name) {
            return Some(value.clone());
        }
        self.base.as_ref().and_then(|base| base.find(name))
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    pub attrs: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            attrs: RefCell::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_chain() {
        let globals = Scope::global();
        globals.assign("x", Value::Int(1));
        let local = Scope::child(&globals);
        local.assign("y", Value::Int(2));
        assert_eq!(local.lookup("x"), Some(Value::Int(1)));
        assert_eq!(globals.lookup("y"), None);
        // Shadowing stays local.
        local.assign("x", Value::Int(3));
        assert_eq!(globals.lookup("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_class_body_closure() {
        let globals = Scope::global();
        let body = Scope::class_body(&globals);
        assert!(Rc::ptr_eq(&body.closure_scope(), &globals));
        let local = Scope::child(&globals);
        assert!(Rc::ptr_eq(&local.closure_scope(), &local));
    }

    #[test]
    fn test_class_lookup() {
        let base = Rc::new(Class {
            name: "Jedi".into(),
            base: None,
            attrs: RefCell::new(HashMap::from([("rank".to_string(), Value::str("Knight"))])),
        });
        let derived = Class {
            name: "Master".into(),
            base: Some(Rc::clone(&base)),
            attrs: RefCell::new(HashMap::new()),
        };
        assert_eq!(derived.find("rank"), Some(Value::str("Knight")));
        assert_eq!(base.find("title"), None);
    }
}
