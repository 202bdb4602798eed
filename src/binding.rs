//! Call-argument binding
//!
//! Reconciles call-site arguments with a `Signature`, producing exactly
//! one value per declared parameter. Binding either succeeds completely
//! or fails before the callee runs.

use std::rc::Rc;

use log::trace;
use thiserror::Error;

use crate::ast::Ident;
use crate::function::Signature;
use crate::value::{Mapping, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("{function}() takes at least {required} argument(s) ({given} given)")]
    TooFewArguments {
        function: Ident,
        required: usize,
        given: usize,
    },

    #[error("{function}() takes at most {allowed} positional argument(s) ({given} given)")]
    TooManyArguments {
        function: Ident,
        allowed: usize,
        given: usize,
    },

    #[error("{function}() got multiple values for argument '{name}'")]
    DuplicateArgument { function: Ident, name: Ident },

    #[error("{function}() got an unexpected keyword argument '{name}'")]
    UnexpectedKeywordArgument { function: Ident, name: Ident },

    #[error("{function}() missing required argument '{name}'")]
    MissingArgument { function: Ident, name: Ident },
}

/// Bind a call. Calls without keywords that satisfy the required count
/// take the positional fast path; everything else goes through keyword
/// binding, which names the first missing parameter on failure.
pub fn bind(sig: &Signature, args: Vec<Value>, keywords: Vec<(Ident, Value)>) -> Result<Vec<Value>, BindError> {
    trace!(
        "binding {}(): {} positional, {} keyword",
        sig.name,
        args.len(),
        keywords.len()
    );
    if keywords.is_empty() && args.len() >= sig.required {
        bind_positional(sig, args)
    } else {
        bind_keywords(sig, args, keywords)
    }
}

pub fn bind_positional(sig: &Signature, mut args: Vec<Value>) -> Result<Vec<Value>, BindError> {
    let given = args.len();
    if given < sig.required {
        return Err(BindError::TooFewArguments {
            function: sig.name.clone(),
            required: sig.required,
            given,
        });
    }
    if sig.declared() == 1 && sig.list_catch_all && !sig.map_catch_all {
        return Ok(vec![Value::seq(args)]);
    }
    if given == sig.declared() && !sig.list_catch_all && !sig.map_catch_all {
        return Ok(args);
    }

    let positional = sig.positional_len();
    if given > positional && !sig.list_catch_all {
        return Err(too_many(sig, given));
    }

    let surplus = if given > positional {
        args.split_off(positional)
    } else {
        Vec::new()
    };
    let mut bound = args;
    for index in bound.len()..positional {
        bound.push(aligned_default(sig, index)?);
    }
    if sig.list_catch_all {
        bound.push(Value::seq(surplus));
    }
    if sig.map_catch_all {
        bound.push(Value::Map(Rc::new(Mapping::new())));
    }
    Ok(bound)
}

pub fn bind_keywords(
    sig: &Signature,
    mut args: Vec<Value>,
    keywords: Vec<(Ident, Value)>,
) -> Result<Vec<Value>, BindError> {
    let positional = sig.positional_len();
    let given = args.len();
    if given > positional && !sig.list_catch_all {
        return Err(too_many(sig, given));
    }

    let surplus = if given > positional {
        args.split_off(positional)
    } else {
        Vec::new()
    };
    let mut slots: Vec<Option<Value>> = vec![None; sig.declared()];
    for (slot, value) in slots.iter_mut().zip(args) {
        *slot = Some(value);
    }

    let mut extra = sig.map_catch_all.then(Mapping::new);
    for (name, value) in keywords {
        match sig.params[..positional].iter().position(|p| *p == name) {
            Some(index) if slots[index].is_some() => {
                return Err(BindError::DuplicateArgument {
                    function: sig.name.clone(),
                    name,
                });
            }
            Some(index) => slots[index] = Some(value),
            None => match extra.as_mut() {
                Some(map) => map.insert(name, value),
                None => {
                    return Err(BindError::UnexpectedKeywordArgument {
                        function: sig.name.clone(),
                        name,
                    });
                }
            },
        }
    }

    for (index, slot) in slots.iter_mut().enumerate().take(positional) {
        if slot.is_none() {
            *slot = sig.default_for(index).cloned();
        }
    }
    if let Some(index) = sig.list_slot() {
        slots[index] = Some(Value::seq(surplus));
    }
    if let Some(index) = sig.map_slot() {
        slots[index] = Some(Value::Map(Rc::new(extra.unwrap_or_default())));
    }

    if let Some(missing) = slots.iter().position(Option::is_none) {
        return Err(missing_argument(sig, missing));
    }
    Ok(slots.into_iter().flatten().collect())
}

fn aligned_default(sig: &Signature, index: usize) -> Result<Value, BindError> {
    sig.default_for(index)
        .cloned()
        .ok_or_else(|| missing_argument(sig, index))
}

fn missing_argument(sig: &Signature, index: usize) -> BindError {
    BindError::MissingArgument {
        function: sig.name.clone(),
        name: sig.params[index].clone(),
    }
}

fn too_many(sig: &Signature, given: usize) -> BindError {
    BindError::TooManyArguments {
        function: sig.name.clone(),
        allowed: sig.positional_len(),
        given,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(params: &[&str], defaults: Vec<Value>, list: bool, map: bool) -> Signature {
        Signature::new(
            "f".into(),
            params.iter().map(|p| Ident::from(*p)).collect(),
            defaults,
            list,
            map,
        )
    }

    fn kw(name: &str, value: i64) -> (Ident, Value) {
        (name.into(), Value::I64(value))
    }

    #[test]
    fn exact_arity_binds_as_is() {
        let s = sig(&["a", "b"], vec![], false, false);
        let bound = bind_positional(&s, vec![Value::I64(1), Value::I64(2)]).unwrap();
        assert_eq!(bound, vec![Value::I64(1), Value::I64(2)]);
    }

    #[test]
    fn too_few_positional() {
        let s = sig(&["a", "b"], vec![], false, false);
        let err = bind_positional(&s, vec![Value::I64(1)]).unwrap_err();
        assert!(matches!(err, BindError::TooFewArguments { required: 2, given: 1, .. }));
    }

    #[test]
    fn lone_list_catch_all_wraps_everything() {
        let s = sig(&["rest"], vec![], true, false);
        let bound = bind_positional(&s, vec![Value::I64(1), Value::I64(2)]).unwrap();
        assert_eq!(bound, vec![Value::seq(vec![Value::I64(1), Value::I64(2)])]);
    }

    #[test]
    fn defaults_fill_the_tail() {
        let s = sig(&["a", "b", "c"], vec![Value::I64(20), Value::I64(30)], false, false);
        assert_eq!(s.required, 1);
        let bound = bind_positional(&s, vec![Value::I64(1), Value::I64(2)]).unwrap();
        assert_eq!(bound, vec![Value::I64(1), Value::I64(2), Value::I64(30)]);
    }

    #[test]
    fn catch_alls_receive_surplus_and_empty_mapping() {
        let s = sig(&["a", "rest", "opts"], vec![], true, true);
        let bound = bind_positional(&s, vec![Value::I64(1), Value::I64(2), Value::I64(3)]).unwrap();
        assert_eq!(bound[0], Value::I64(1));
        assert_eq!(bound[1], Value::seq(vec![Value::I64(2), Value::I64(3)]));
        assert_eq!(bound[2], Value::Map(Rc::new(Mapping::new())));
    }

    #[test]
    fn surplus_without_list_catch_all() {
        let s = sig(&["a", "opts"], vec![], false, true);
        let err = bind_positional(&s, vec![Value::I64(1), Value::I64(2)]).unwrap_err();
        assert!(matches!(err, BindError::TooManyArguments { allowed: 1, given: 2, .. }));
    }

    #[test]
    fn keywords_fill_by_name() {
        let s = sig(&["a", "b"], vec![Value::I64(10)], false, false);
        let bound = bind_keywords(&s, vec![], vec![kw("b", 2), kw("a", 3)]).unwrap();
        assert_eq!(bound, vec![Value::I64(3), Value::I64(2)]);
    }

    #[test]
    fn keyword_for_positionally_filled_slot_is_duplicate() {
        let s = sig(&["a"], vec![], false, false);
        let err = bind_keywords(&s, vec![Value::I64(1)], vec![kw("a", 2)]).unwrap_err();
        assert_eq!(
            err,
            BindError::DuplicateArgument {
                function: "f".into(),
                name: "a".into()
            }
        );
    }

    #[test]
    fn unknown_keyword_without_map() {
        let s = sig(&["a"], vec![], false, false);
        let err = bind_keywords(&s, vec![Value::I64(1)], vec![kw("z", 2)]).unwrap_err();
        assert!(matches!(err, BindError::UnexpectedKeywordArgument { ref name, .. } if &**name == "z"));
    }

    #[test]
    fn map_catch_all_last_write_wins() {
        let s = sig(&["opts"], vec![], false, true);
        let bound = bind_keywords(&s, vec![], vec![kw("x", 1), kw("y", 2), kw("x", 3)]).unwrap();
        let Value::Map(map) = &bound[0] else {
            panic!("expected mapping, got {:?}", bound[0]);
        };
        assert_eq!(map.get("x"), Some(&Value::I64(3)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn missing_required_is_named() {
        let s = sig(&["a", "b"], vec![Value::I64(10)], false, false);
        let err = bind(&s, vec![], vec![]).unwrap_err();
        assert_eq!(
            err,
            BindError::MissingArgument {
                function: "f".into(),
                name: "a".into()
            }
        );
    }

    #[test]
    fn catch_all_names_are_not_keyword_targets() {
        let s = sig(&["rest"], vec![], true, false);
        let err = bind_keywords(&s, vec![], vec![kw("rest", 1)]).unwrap_err();
        assert!(matches!(err, BindError::UnexpectedKeywordArgument { .. }));
    }
}
