//! Ported from `toyvm/tests/test_compiler.py`: compiles small source
//! snippets and checks both the emitted bytecode shape and the values a
//! call actually produces. A handful of cases are additionally pushed
//! through `peval` to confirm the rainbow evaluator's output still
//! computes the same answer once the relevant locals are green.

use std::rc::Rc;

use prism::{call, call_with, compile, peval, FunctionData, Value};

fn get_func(module: &prism::Module, name: &str) -> Rc<FunctionData> {
    match module.get(name).unwrap() {
        Value::Function(f) => f,
        _ => panic!("{} is not a function", name),
    }
}

#[test]
fn return_a_literal() {
    let module = compile("def foo():\n    return 42\n").unwrap();
    let f = get_func(&module, "foo");
    assert!(f.code.equals_dedented("load_const Int(42)\nreturn\nload_const None\nreturn"));
    assert_eq!(call(&f, &[]).unwrap(), Value::Integer(42));
}

#[test]
fn add_and_mul_respect_precedence() {
    let module = compile("def foo():\n    return 1 + 2 * 3\n").unwrap();
    let f = get_func(&module, "foo");
    assert!(f.code.equals_dedented(
        "
        load_const Int(1)
        load_const Int(2)
        load_const Int(3)
        mul
        add
        return
        load_const None
        return
        "
    ));
    assert_eq!(call(&f, &[]).unwrap(), Value::Integer(7));

    let folded = peval(&f).unwrap();
    assert!(folded.code.equals_dedented("load_const Int(7)\nreturn\nload_const None\nreturn"));
    assert_eq!(call(&folded, &[]).unwrap(), Value::Integer(7));
}

#[test]
fn a_local_round_trips_through_store_and_load() {
    let module = compile("def foo():\n    a = 4\n    return a\n").unwrap();
    let f = get_func(&module, "foo");
    assert!(f.code.equals_dedented(
        "
        load_const Int(4)
        store_local a
        load_local a
        return
        load_const None
        return
        "
    ));
    assert_eq!(call(&f, &[]).unwrap(), Value::Integer(4));
}

#[test]
fn an_uppercase_local_compiles_to_the_green_forms_and_still_folds() {
    let module = compile("def foo():\n    A = 4\n    return A\n").unwrap();
    let f = get_func(&module, "foo");
    assert!(f.code.equals_dedented(
        "
        load_const Int(4)
        store_local_green A
        load_local_green A
        return
        load_const None
        return
        "
    ));
    assert_eq!(call(&f, &[]).unwrap(), Value::Integer(4));

    let folded = peval(&f).unwrap();
    assert!(folded.code.equals_dedented("load_const Int(4)\nreturn\nload_const None\nreturn"));
}

#[test]
fn parameters_are_always_locals() {
    let module = compile("def foo(a, b):\n    return a + b\n").unwrap();
    let f = get_func(&module, "foo");
    assert!(f.code.equals_dedented(
        "
        load_local a
        load_local b
        add
        return
        load_const None
        return
        "
    ));
    assert_eq!(call(&f, &[Value::Integer(10), Value::Integer(20)]).unwrap(), Value::Integer(30));
}

#[test]
fn if_without_else_skips_the_assignment_when_falsy() {
    let module = compile(
        "
        def foo(a):
            if a:
                a = 42
            return a
        ",
    )
    .unwrap();
    let f = get_func(&module, "foo");
    assert_eq!(call(&f, &[Value::Integer(0)]).unwrap(), Value::Integer(0));
    assert_eq!(call(&f, &[Value::Integer(1)]).unwrap(), Value::Integer(42));
}

#[test]
fn if_else_picks_the_right_arm() {
    let module = compile(
        "
        def foo(a):
            if a:
                b = 10
            else:
                b = 20
            return b
        ",
    )
    .unwrap();
    let f = get_func(&module, "foo");
    assert_eq!(call(&f, &[Value::Integer(0)]).unwrap(), Value::Integer(20));
    assert_eq!(call(&f, &[Value::Integer(1)]).unwrap(), Value::Integer(10));
}

#[test]
fn a_tuple_literal_carries_its_items_in_order() {
    let module = compile("def foo():\n    return (1, 2, 3)\n").unwrap();
    let f = get_func(&module, "foo");
    let result = call(&f, &[]).unwrap();
    let items = match &result {
        Value::Tuple(t) => &t.items,
        other => panic!("expected a tuple, got {:?}", other),
    };
    assert_eq!(items.as_slice(), [Value::Integer(1), Value::Integer(2), Value::Integer(3)].as_slice());
}

#[test]
fn less_than_pushes_an_integer_truth_value() {
    let module = compile("def foo(a, b):\n    return a < b\n").unwrap();
    let f = get_func(&module, "foo");
    assert_eq!(call(&f, &[Value::Integer(2), Value::Integer(3)]).unwrap(), Value::Integer(1));
    assert_eq!(call(&f, &[Value::Integer(3), Value::Integer(2)]).unwrap(), Value::Integer(0));
}

#[test]
fn a_function_with_no_return_yields_none() {
    let module = compile("def foo():\n    pass\n").unwrap();
    let f = get_func(&module, "foo");
    assert!(call(&f, &[]).unwrap().is_none());
}

#[test]
fn print_writes_space_joined_arguments() {
    let module = compile("def foo():\n    print('hello', 42)\n").unwrap();
    let f = get_func(&module, "foo");
    let mut out = Vec::new();
    call_with(&f, &[], &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "hello 42\n");
}

#[test]
fn a_for_loop_over_a_red_tuple_is_untouched_by_peval() {
    let module = compile(
        "
        def foo(tup):
            for x in tup:
                print(x)
        ",
    )
    .unwrap();
    let f = get_func(&module, "foo");
    let tup = Value::new_tuple(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
    let mut out = Vec::new();
    call_with(&f, &[tup], &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "1\n2\n3\n");
}

#[test]
fn unrolling_an_accumulation_loop_sums_every_item() {
    let module = compile(
        "
        def foo():
            TUP = (1, 2, 3)
            a = 0
            for X in UNROLL(TUP):
                a = a + X
            return a
        ",
    )
    .unwrap();
    let f = get_func(&module, "foo");
    assert_eq!(call(&f, &[]).unwrap(), Value::Integer(6));

    let folded = peval(&f).unwrap();
    assert!(!folded.code.dump().contains("for_iter"));
    assert_eq!(call(&folded, &[]).unwrap(), Value::Integer(6));
}
