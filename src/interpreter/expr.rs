//! Expression dispatch: evaluation of every expression form, member access,
//! assignment places, and call/construct plumbing into the interpreter core.

use crate::ast::{
    Argument, ArrayElement, AssignmentOp, AssignmentTarget, CallExpression, Expression,
    LiteralValue, LogicalOp, MemberProperty, NewExpression, ObjectExpression, ObjectMethod,
    ObjectProperty, PropertyName, UnaryOp, UpdateOp,
};
use crate::error::Error;
use crate::interpreter::{Interpreter, operators};
use crate::value::{
    CheapClone, ClassRef, ClosureRecord, FunctionBody, FunctionRecord, FunctionRef, JsString,
    ObjectKind, ObjectRef, Property, PropertyKey, RuntimeValue, ThisMode, create_array, wrap,
};

use std::sync::Arc;

/// A resolved write target. Member places hold their object and key so the
/// subexpressions are evaluated exactly once per assignment.
enum Place<'a> {
    Variable(&'a crate::ast::Identifier),
    Member {
        object: RuntimeValue,
        key: PropertyKey,
    },
}

impl Interpreter {
    pub(crate) fn eval_expression(&mut self, expression: &Expression) -> Result<RuntimeValue, Error> {
        self.pause_point(expression.node_id(), expression.kind())?;
        match self.dispatch_expression(expression) {
            Err(Error::Unsupported { kind, node }) if self.config.skip_unsupported_nodes => {
                tracing::debug!(%kind, %node, "skipping unsupported node");
                Ok(RuntimeValue::Undefined)
            }
            other => other,
        }
    }

    fn dispatch_expression(&mut self, expression: &Expression) -> Result<RuntimeValue, Error> {
        match expression {
            Expression::Literal(literal) => Ok(match &literal.value {
                LiteralValue::Number(n) => RuntimeValue::Number(*n),
                LiteralValue::String(s) => RuntimeValue::String(s.cheap_clone()),
                LiteralValue::Boolean(b) => RuntimeValue::Boolean(*b),
                LiteralValue::Null => RuntimeValue::Null,
                LiteralValue::Infinity => RuntimeValue::Number(f64::INFINITY),
            }),
            Expression::Identifier(identifier) => self.read_identifier(identifier),
            Expression::This(_) => Ok(self.session.contexts.current().clone()),
            Expression::Super(_) => Err(Error::type_error("'super' keyword unexpected here")),
            Expression::Array(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for slot in &array.elements {
                    match slot {
                        None => elements.push(RuntimeValue::Undefined),
                        Some(ArrayElement::Expression(expr)) => {
                            elements.push(self.eval_expression(expr)?);
                        }
                        Some(ArrayElement::Spread(spread)) => {
                            let value = self.eval_expression(&spread.argument)?;
                            elements.extend(self.iterable_values(&value)?);
                        }
                    }
                }
                Ok(RuntimeValue::Object(create_array(elements)))
            }
            Expression::Object(object) => self.eval_object(object),
            Expression::Function(func) => {
                let closure = FunctionRecord::closure(ClosureRecord {
                    name: func.name.as_ref().map(|n| n.name.cheap_clone()),
                    params: func.params.clone(),
                    body: FunctionBody::Block(Arc::new(func.body.clone())),
                    this_mode: ThisMode::Dynamic,
                });
                let value = RuntimeValue::Function(closure);
                // A named function expression can call itself by name.
                if let Some(name) = &func.name {
                    if let Some(variable) = self.map.resolve(name.id) {
                        self.session.store.set(variable, value.clone());
                    }
                }
                Ok(value)
            }
            Expression::Arrow(arrow) => {
                let closure = FunctionRecord::closure(ClosureRecord {
                    name: None,
                    params: arrow.params.clone(),
                    body: FunctionBody::from(&arrow.body),
                    this_mode: ThisMode::Captured(self.session.contexts.current().clone()),
                });
                Ok(RuntimeValue::Function(closure))
            }
            Expression::Binary(binary) => {
                let left = self.eval_expression(&binary.left)?;
                let right = self.eval_expression(&binary.right)?;
                operators::binary(binary.operator, &left, &right)
            }
            Expression::Logical(logical) => {
                let left = self.eval_expression(&logical.left)?;
                let take_right = match logical.operator {
                    LogicalOp::And => left.to_boolean(),
                    LogicalOp::Or => !left.to_boolean(),
                    LogicalOp::Nullish => left.is_null_or_undefined(),
                };
                if take_right {
                    self.eval_expression(&logical.right)
                } else {
                    Ok(left)
                }
            }
            Expression::Unary(unary) => self.eval_unary(unary.operator, &unary.argument),
            Expression::Update(update) => {
                let place = self.prepare_place(&update.target)?;
                let before = self.read_place(&place)?.to_number();
                let after = match update.operator {
                    UpdateOp::Increment => before + 1.0,
                    UpdateOp::Decrement => before - 1.0,
                };
                self.write_place(&place, wrap(after))?;
                Ok(wrap(if update.prefix { after } else { before }))
            }
            Expression::Assignment(assignment) => {
                let place = self.prepare_place(&assignment.target)?;
                let result = match assignment.operator {
                    AssignmentOp::Assign => self.eval_expression(&assignment.value)?,
                    AssignmentOp::Compound(op) => {
                        let current = self.read_place(&place)?;
                        let rhs = self.eval_expression(&assignment.value)?;
                        operators::binary(op, &current, &rhs)?
                    }
                };
                self.write_place(&place, result.clone())?;
                Ok(result)
            }
            Expression::Conditional(conditional) => {
                if self.eval_expression(&conditional.test)?.to_boolean() {
                    self.eval_expression(&conditional.consequent)
                } else {
                    self.eval_expression(&conditional.alternate)
                }
            }
            Expression::Call(call) => self.eval_call(call),
            Expression::New(new) => self.eval_new(new),
            Expression::Member(member) => {
                if matches!(member.object.as_ref(), Expression::Super(_)) {
                    return Err(Error::type_error("'super' keyword unexpected here"));
                }
                let object = self.eval_expression(&member.object)?;
                let key = self.member_key(&member.property)?;
                self.get_member(&object, &key)
            }
            Expression::Sequence(sequence) => {
                let mut result = RuntimeValue::Undefined;
                for expression in &sequence.expressions {
                    result = self.eval_expression(expression)?;
                }
                Ok(result)
            }
        }
    }

    fn eval_unary(&mut self, operator: UnaryOp, argument: &Expression) -> Result<RuntimeValue, Error> {
        match operator {
            // `typeof` tolerates undeclared names.
            UnaryOp::Typeof => {
                if let Expression::Identifier(identifier) = argument {
                    self.pause_point(argument.node_id(), argument.kind())?;
                    return match self.read_identifier(identifier) {
                        Ok(value) => Ok(operators::unary(UnaryOp::Typeof, &value)),
                        Err(Error::Reference { .. }) => {
                            Ok(RuntimeValue::String("undefined".into()))
                        }
                        Err(error) => Err(error),
                    };
                }
                let value = self.eval_expression(argument)?;
                Ok(operators::unary(UnaryOp::Typeof, &value))
            }
            UnaryOp::Delete => match argument {
                Expression::Member(member) => {
                    let object = self.eval_expression(&member.object)?;
                    let key = self.member_key(&member.property)?;
                    match object {
                        RuntimeValue::Object(obj) => {
                            Ok(RuntimeValue::Boolean(obj.write().delete_property(&key)))
                        }
                        _ => Ok(RuntimeValue::Boolean(true)),
                    }
                }
                // Variables are not deletable.
                Expression::Identifier(_) => Ok(RuntimeValue::Boolean(false)),
                other => {
                    self.eval_expression(other)?;
                    Ok(RuntimeValue::Boolean(true))
                }
            },
            _ => {
                let value = self.eval_expression(argument)?;
                Ok(operators::unary(operator, &value))
            }
        }
    }

    // ---- object literals ----

    /// Evaluate an object literal. The object under construction is pushed as
    /// `this` so sibling properties can reference it.
    fn eval_object(&mut self, object: &ObjectExpression) -> Result<RuntimeValue, Error> {
        let obj = crate::value::create_object();
        self.session
            .contexts
            .push(RuntimeValue::Object(obj.cheap_clone()));
        let result = self.eval_object_properties(object, &obj);
        self.session.contexts.pop()?;
        result?;
        Ok(RuntimeValue::Object(obj))
    }

    fn eval_object_properties(
        &mut self,
        object: &ObjectExpression,
        obj: &ObjectRef,
    ) -> Result<(), Error> {
        for property in &object.properties {
            match property {
                ObjectProperty::Data { key, value, .. } => {
                    let key = self.property_key(key)?;
                    let value = self.eval_expression(value)?;
                    obj.write().set_property(key, value);
                }
                ObjectProperty::Shorthand(identifier) => {
                    let value = self.read_identifier(identifier)?;
                    obj.write()
                        .set_property(PropertyKey::String(identifier.name.cheap_clone()), value);
                }
                ObjectProperty::Method(method) => {
                    let key = self.property_key(&method.key)?;
                    let func = self.method_closure(method);
                    obj.write().set_property(key, RuntimeValue::Function(func));
                }
                ObjectProperty::Getter(method) => {
                    let key = self.property_key(&method.key)?;
                    let func = self.method_closure(method);
                    install_accessor(obj, key, Some(func), None);
                }
                ObjectProperty::Setter(method) => {
                    let key = self.property_key(&method.key)?;
                    let func = self.method_closure(method);
                    install_accessor(obj, key, None, Some(func));
                }
            }
        }
        Ok(())
    }

    fn method_closure(&self, method: &ObjectMethod) -> FunctionRef {
        let name = match &method.key {
            PropertyName::Static(name) => Some(name.cheap_clone()),
            PropertyName::Computed(_) => None,
        };
        FunctionRecord::closure(ClosureRecord {
            name,
            params: method.params.clone(),
            body: FunctionBody::Block(Arc::new(method.body.clone())),
            this_mode: ThisMode::Dynamic,
        })
    }

    fn property_key(&mut self, name: &PropertyName) -> Result<PropertyKey, Error> {
        match name {
            PropertyName::Static(name) => Ok(PropertyKey::String(name.cheap_clone())),
            PropertyName::Computed(expression) => {
                let value = self.eval_expression(expression)?;
                Ok(PropertyKey::from_value(&value))
            }
        }
    }

    // ---- calls ----

    fn eval_call(&mut self, call: &CallExpression) -> Result<RuntimeValue, Error> {
        if matches!(call.callee.as_ref(), Expression::Super(_)) {
            let args = self.eval_arguments(&call.arguments)?;
            return self.invoke_super(args);
        }

        let (callee, receiver) = match call.callee.as_ref() {
            // Method call: the member's object becomes the receiver.
            Expression::Member(member) => {
                self.pause_point(call.callee.node_id(), call.callee.kind())?;
                if matches!(member.object.as_ref(), Expression::Super(_)) {
                    return Err(Error::type_error("'super' keyword unexpected here"));
                }
                let object = self.eval_expression(&member.object)?;
                let key = self.member_key(&member.property)?;
                let callee = self.get_member(&object, &key)?;
                (callee, object)
            }
            // Plain call: `this` falls back to the caller's current context.
            other => {
                let callee = self.eval_expression(other)?;
                (callee, self.session.contexts.current().clone())
            }
        };

        let args = self.eval_arguments(&call.arguments)?;
        let RuntimeValue::Function(func) = &callee else {
            return Err(Error::type_error(format!(
                "{} is not a function",
                describe_expression(&call.callee)
            )));
        };
        Ok(self.invoke(&func.cheap_clone(), receiver, args)?.value)
    }

    fn eval_new(&mut self, new: &NewExpression) -> Result<RuntimeValue, Error> {
        let callee = self.eval_expression(&new.callee)?;
        let args = self.eval_arguments(&new.arguments)?;
        let RuntimeValue::Function(func) = &callee else {
            return Err(Error::type_error(format!(
                "{} is not a constructor",
                describe_expression(&new.callee)
            )));
        };
        self.construct(&func.cheap_clone(), args)
    }

    fn eval_arguments(&mut self, arguments: &[Argument]) -> Result<Vec<RuntimeValue>, Error> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            match argument {
                Argument::Expression(expression) => {
                    values.push(self.eval_expression(expression)?);
                }
                Argument::Spread(spread) => {
                    let value = self.eval_expression(&spread.argument)?;
                    values.extend(self.iterable_values(&value)?);
                }
            }
        }
        Ok(values)
    }

    // ---- member access ----

    pub(crate) fn member_key(&mut self, property: &MemberProperty) -> Result<PropertyKey, Error> {
        match property {
            MemberProperty::Static(name) => Ok(PropertyKey::String(name.cheap_clone())),
            MemberProperty::Computed(expression) => {
                let value = self.eval_expression(expression)?;
                Ok(PropertyKey::from_value(&value))
            }
        }
    }

    pub(crate) fn get_member(
        &mut self,
        object: &RuntimeValue,
        key: &PropertyKey,
    ) -> Result<RuntimeValue, Error> {
        enum Found {
            Value(RuntimeValue),
            Getter(FunctionRef),
        }
        match object {
            RuntimeValue::Object(obj_ref) => {
                let found = {
                    let obj = obj_ref.read();
                    match obj.get_property(key) {
                        Some(Property::Data(value)) => Found::Value(value.clone()),
                        Some(Property::Accessor { get: Some(getter), .. }) => {
                            Found::Getter(getter.cheap_clone())
                        }
                        Some(Property::Accessor { get: None, .. }) => {
                            Found::Value(RuntimeValue::Undefined)
                        }
                        None => {
                            if obj.kind == ObjectKind::Array
                                && matches!(key, PropertyKey::String(s) if *s == *"length")
                            {
                                Found::Value(wrap(f64::from(obj.array_length())))
                            } else if let (Some(class), PropertyKey::String(name)) =
                                (&obj.class, key)
                            {
                                match class.lookup_method(name) {
                                    Some(method) => Found::Value(RuntimeValue::Function(method)),
                                    None => Found::Value(RuntimeValue::Undefined),
                                }
                            } else {
                                Found::Value(RuntimeValue::Undefined)
                            }
                        }
                    }
                };
                match found {
                    Found::Value(value) => Ok(value),
                    Found::Getter(getter) => {
                        Ok(self.invoke(&getter, object.clone(), Vec::new())?.value)
                    }
                }
            }
            RuntimeValue::String(s) => Ok(match key {
                PropertyKey::String(name) if *name == *"length" => {
                    wrap(s.chars().count() as f64)
                }
                PropertyKey::Index(index) => s
                    .chars()
                    .nth(*index as usize)
                    .map_or(RuntimeValue::Undefined, |c| {
                        RuntimeValue::String(c.to_string().into())
                    }),
                _ => RuntimeValue::Undefined,
            }),
            RuntimeValue::Function(func) => {
                if let Some(value) = func.properties.read().get(key) {
                    return Ok(value.clone());
                }
                Ok(match key {
                    // A `static name(){}` shadows the intrinsic `name`.
                    PropertyKey::String(name) => {
                        let static_method =
                            func.as_class().and_then(|class| lookup_static(class, name));
                        match static_method {
                            Some(method) => RuntimeValue::Function(method),
                            None if *name == *"name" => {
                                RuntimeValue::String(func.name().unwrap_or("").into())
                            }
                            None => RuntimeValue::Undefined,
                        }
                    }
                    PropertyKey::Index(_) => RuntimeValue::Undefined,
                })
            }
            RuntimeValue::Null | RuntimeValue::Undefined => Err(Error::type_error(format!(
                "Cannot read properties of {} (reading '{key}')",
                object.to_js_string()
            ))),
            // Number and boolean primitives have no own properties here.
            _ => Ok(RuntimeValue::Undefined),
        }
    }

    pub(crate) fn set_member(
        &mut self,
        object: &RuntimeValue,
        key: PropertyKey,
        value: RuntimeValue,
    ) -> Result<(), Error> {
        match object {
            RuntimeValue::Object(obj_ref) => {
                let setter = match obj_ref.read().get_property(&key) {
                    Some(Property::Accessor { set, .. }) => match set {
                        Some(setter) => Some(setter.cheap_clone()),
                        // A getter-only property silently swallows writes.
                        None => return Ok(()),
                    },
                    _ => None,
                };
                match setter {
                    Some(setter) => {
                        self.invoke(&setter, object.clone(), vec![value])?;
                    }
                    None => obj_ref.write().set_property(key, value),
                }
                Ok(())
            }
            RuntimeValue::Function(func) => {
                func.properties.write().insert(key, value);
                Ok(())
            }
            RuntimeValue::Null | RuntimeValue::Undefined => Err(Error::type_error(format!(
                "Cannot set properties of {} (setting '{key}')",
                object.to_js_string()
            ))),
            // Writes to other primitives are dropped.
            _ => Ok(()),
        }
    }

    // ---- assignment places ----

    fn prepare_place<'a>(&mut self, target: &'a AssignmentTarget) -> Result<Place<'a>, Error> {
        match target {
            AssignmentTarget::Identifier(identifier) => Ok(Place::Variable(identifier)),
            AssignmentTarget::Member(member) => {
                if matches!(member.object.as_ref(), Expression::Super(_)) {
                    return Err(Error::type_error("'super' keyword unexpected here"));
                }
                let object = self.eval_expression(&member.object)?;
                let key = self.member_key(&member.property)?;
                Ok(Place::Member { object, key })
            }
        }
    }

    fn read_place(&mut self, place: &Place<'_>) -> Result<RuntimeValue, Error> {
        match place {
            Place::Variable(identifier) => self.read_identifier(identifier),
            Place::Member { object, key } => self.get_member(object, key),
        }
    }

    fn write_place(&mut self, place: &Place<'_>, value: RuntimeValue) -> Result<(), Error> {
        match place {
            Place::Variable(identifier) => self.write_identifier(identifier, value),
            Place::Member { object, key } => self.set_member(object, key.clone(), value),
        }
    }
}

fn install_accessor(
    obj: &ObjectRef,
    key: PropertyKey,
    getter: Option<FunctionRef>,
    setter: Option<FunctionRef>,
) {
    let mut guard = obj.write();
    match guard.properties.get_mut(&key) {
        // Getter and setter declared separately share one descriptor.
        Some(Property::Accessor { get, set }) => {
            if getter.is_some() {
                *get = getter;
            }
            if setter.is_some() {
                *set = setter;
            }
        }
        _ => {
            guard.properties.insert(
                key,
                Property::Accessor {
                    get: getter,
                    set: setter,
                },
            );
        }
    }
}

/// Static methods resolve through the parent chain like instance methods.
fn lookup_static(class: &ClassRef, name: &JsString) -> Option<FunctionRef> {
    let mut current = Some(class.cheap_clone());
    while let Some(c) = current {
        if let Some(method) = c.static_methods.get(name) {
            return Some(method.cheap_clone());
        }
        current = c.parent.clone();
    }
    None
}

/// Human-readable rendition of a callee for error messages.
fn describe_expression(expression: &Expression) -> String {
    match expression {
        Expression::Identifier(identifier) => identifier.name.to_string(),
        Expression::Member(member) => match &member.property {
            MemberProperty::Static(name) => {
                format!("{}.{}", describe_expression(&member.object), name)
            }
            MemberProperty::Computed(_) => {
                format!("{}[...]", describe_expression(&member.object))
            }
        },
        Expression::This(_) => "this".to_string(),
        Expression::Call(call) => format!("{}(...)", describe_expression(&call.callee)),
        _ => "(intermediate value)".to_string(),
    }
}
