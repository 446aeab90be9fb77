//! Integration-level frame tests beyond the opcode-handler unit tests
//! colocated in `src/frame.rs`: call semantics, error conditions, nested
//! closures, and a few of the end-to-end scenarios from the spec's
//! testable-properties table that exercise more than one component at once.

use std::rc::Rc;

use prism::{call, call_with, compile, Frame, FunctionData, Opcode, Value};

#[test]
fn int_multiplication() {
    let f = prism::standalone(
        "fn",
        vec![],
        vec![Opcode::LoadConst(Value::Integer(2)), Opcode::LoadConst(Value::Integer(4)), Opcode::Mul, Opcode::Return],
    );
    assert_eq!(call(&f, &[]).unwrap(), Value::Integer(8));
}

#[test]
fn call_invokes_a_function_value_and_returns_its_result() {
    let callee = prism::standalone(
        "callee",
        vec!["x".to_string()],
        vec![Opcode::LoadLocal("x".to_string()), Opcode::LoadConst(Value::Integer(1)), Opcode::Add, Opcode::Return],
    );
    let caller = prism::standalone(
        "caller",
        vec![],
        vec![
            Opcode::LoadConst(Value::Function(callee)),
            Opcode::LoadConst(Value::Integer(41)),
            Opcode::Call(1),
            Opcode::Return,
        ],
    );
    assert_eq!(call(&caller, &[]).unwrap(), Value::Integer(42));
}

#[test]
fn wrong_argument_count_is_a_fatal_arity_error() {
    let f = prism::standalone("fn", vec!["a".to_string(), "b".to_string()], vec![Opcode::Return]);
    assert!(call(&f, &[Value::Integer(1)]).is_err());
}

#[test]
fn reading_an_undefined_local_is_a_fatal_error() {
    let f = prism::standalone("fn", vec![], vec![Opcode::LoadLocal("missing".to_string()), Opcode::Return]);
    assert!(call(&f, &[]).is_err());
}

#[test]
fn non_singleton_stack_at_return_is_rejected() {
    let f = prism::standalone(
        "fn",
        vec![],
        vec![Opcode::LoadConst(Value::Integer(1)), Opcode::LoadConst(Value::Integer(2)), Opcode::Return],
    );
    assert!(call(&f, &[]).is_err());
}

#[test]
fn make_function_captures_a_snapshot_of_the_enclosing_locals() {
    // Builds a nested function value at runtime, closing over the outer
    // frame's locals as they stood at that point, then calls it.
    let nested_code = {
        let mut code = prism::CodeObject::new("nested", vec![]);
        code.emit(Opcode::LoadNonlocal("captured".to_string()));
        code.emit(Opcode::LoadConst(Value::Integer(1)));
        code.emit(Opcode::Add);
        code.emit(Opcode::Return);
        Rc::new(code)
    };
    let outer = prism::standalone(
        "outer",
        vec![],
        vec![
            Opcode::LoadConst(Value::Integer(9)),
            Opcode::StoreLocal("captured".to_string()),
            Opcode::MakeFunction(nested_code),
            Opcode::Call(0),
            Opcode::Return,
        ],
    );
    let mut frame = Frame::new_with_args(outer, &[]).unwrap();
    assert_eq!(frame.run().unwrap(), Value::Integer(10));
}

#[test]
fn s5_cross_function_calls_resolve_through_the_shared_module_globals() {
    let module = compile(
        "
        def inc(x):
            return x + 1

        def foo(x, y):
            return inc(x) * inc(y)
        ",
    )
    .unwrap();
    let inc = get(&module, "inc");
    let foo = get(&module, "foo");
    assert_eq!(call(&inc, &[Value::Integer(2)]).unwrap(), Value::Integer(3));
    assert_eq!(call(&foo, &[Value::Integer(2), Value::Integer(9)]).unwrap(), Value::Integer(30));
}

#[test]
fn s6_unrolled_loops_around_a_red_branch_run_correctly_under_direct_interpretation() {
    // Mirrors the unrolling-around-a-red-if scenario; exercised only under
    // direct interpretation, matching the reference suite's own treatment
    // of this combination as too involved for the evaluator to fold in one
    // pass (the red branch inside the unrolled body is left as a dynamic
    // check on every iteration rather than further specialized).
    let module = compile(
        "
        def foo(flag):
            COLS = ('a', 'b')
            ROWS = ('1', '2')
            out = ''
            for R in UNROLL(ROWS):
                out = out + R
                if flag:
                    for C in UNROLL(COLS):
                        out = out + C
                else:
                    out = out + '-'
            return out
        ",
    )
    .unwrap();
    let foo = get(&module, "foo");
    assert_eq!(call(&foo, &[Value::Integer(1)]).unwrap(), Value::Str(Rc::from("1ab2ab")));
    assert_eq!(call(&foo, &[Value::Integer(0)]).unwrap(), Value::Str(Rc::from("1-2-")));
}

#[test]
fn print_output_is_ordered_and_skips_the_untaken_arm() {
    let module = compile(
        "
        def foo(a):
            if a:
                print('yes')
            else:
                print('no')
        ",
    )
    .unwrap();
    let foo = get(&module, "foo");
    let mut out = Vec::new();
    call_with(&foo, &[Value::Integer(0)], &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "no\n");
}

fn get(module: &prism::Module, name: &str) -> Rc<FunctionData> {
    match module.get(name).unwrap() {
        Value::Function(f) => f,
        _ => panic!("{} is not a function", name),
    }
}
