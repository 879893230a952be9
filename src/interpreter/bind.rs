//! Binding patterns: the destructuring half of declarations, parameters,
//! catch clauses, and `for-in`/`for-of` heads.

use crate::ast::{Identifier, NodeKind, ObjectPatternProperty, Pattern, PropertyName};
use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::value::{CheapClone, PropertyKey, RuntimeValue};

impl Interpreter {
    /// Bind `value` to every slot the pattern names. Declarations bypass the
    /// const-assignment check; initializing a binding is not an assignment.
    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: RuntimeValue,
    ) -> Result<(), Error> {
        match pattern {
            Pattern::Identifier(identifier) => {
                self.bind_identifier(identifier, value);
                Ok(())
            }
            Pattern::Array(array) => {
                let items = self.iterable_values(&value)?;
                for (index, slot) in array.elements.iter().enumerate() {
                    let Some(element) = slot else {
                        continue;
                    };
                    if matches!(element, Pattern::Rest(_)) {
                        return Err(Error::Unsupported {
                            kind: NodeKind::SpreadElement,
                            node: array.id,
                        });
                    }
                    let item = items.get(index).cloned().unwrap_or_default();
                    self.bind_pattern(element, item)?;
                }
                Ok(())
            }
            Pattern::Object(object) => {
                for property in &object.properties {
                    match property {
                        ObjectPatternProperty::KeyValue { key, value: target, .. } => {
                            let key = self.pattern_property_key(key)?;
                            let extracted = self.get_member(&value, &key)?;
                            self.bind_pattern(target, extracted)?;
                        }
                        ObjectPatternProperty::Rest(_) => {
                            return Err(Error::Unsupported {
                                kind: NodeKind::SpreadElement,
                                node: object.id,
                            });
                        }
                    }
                }
                Ok(())
            }
            Pattern::Default(default) => {
                // The default applies only when the incoming value is exactly
                // undefined; null and other falsy values pass through.
                if matches!(value, RuntimeValue::Undefined) {
                    let fallback = self.eval_expression(&default.default)?;
                    self.bind_pattern(&default.target, fallback)
                } else {
                    self.bind_pattern(&default.target, value)
                }
            }
            Pattern::Rest(rest) => Err(Error::Unsupported {
                kind: NodeKind::SpreadElement,
                node: match &rest.argument {
                    Pattern::Identifier(identifier) => identifier.id,
                    _ => crate::ast::NodeId(0),
                },
            }),
        }
    }

    fn bind_identifier(&mut self, identifier: &Identifier, value: RuntimeValue) {
        if let Some(variable) = self.map.resolve(identifier.id) {
            self.session.store.set(variable, value);
            return;
        }
        // Unresolved declaration target: auto-vivify a global.
        self.session
            .global
            .write()
            .set_property(PropertyKey::String(identifier.name.cheap_clone()), value);
    }

    fn pattern_property_key(&mut self, name: &PropertyName) -> Result<PropertyKey, Error> {
        match name {
            PropertyName::Static(name) => Ok(PropertyKey::String(name.cheap_clone())),
            PropertyName::Computed(expression) => {
                let value = self.eval_expression(expression)?;
                Ok(PropertyKey::from_value(&value))
            }
        }
    }
}

/// Collect the identifier leaves of a pattern, for `var` hoisting.
pub(crate) fn pattern_identifiers<'a>(pattern: &'a Pattern, out: &mut Vec<&'a Identifier>) {
    match pattern {
        Pattern::Identifier(identifier) => out.push(identifier),
        Pattern::Array(array) => {
            for element in array.elements.iter().flatten() {
                pattern_identifiers(element, out);
            }
        }
        Pattern::Object(object) => {
            for property in &object.properties {
                match property {
                    ObjectPatternProperty::KeyValue { value, .. } => {
                        pattern_identifiers(value, out);
                    }
                    ObjectPatternProperty::Rest(rest) => {
                        pattern_identifiers(&rest.argument, out);
                    }
                }
            }
        }
        Pattern::Default(default) => pattern_identifiers(&default.target, out),
        Pattern::Rest(rest) => pattern_identifiers(&rest.argument, out),
    }
}
