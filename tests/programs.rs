use klammer::interpreter::{compile, execute, Interpreter};
use klammer::value::Value;

fn run(code: &str) -> Interpreter<'static> {
    let mut interp = Interpreter::with_output(|_| {});
    interp.run(code).unwrap();
    interp
}

fn num(n: f64) -> Option<Value> {
    Some(Value::Num(n))
}

fn string(s: &str) -> Option<Value> {
    Some(Value::String(s.into()))
}

#[test]
fn shadow_and_restore() {
    let mut interp = Interpreter::with_output(|_| {});
    let result = interp.run("
var x = 1;
function f() {
    var x = 2;
    return x;
}
f();
");

    assert_eq!(result, Ok(Value::Num(2.0)));
    assert_eq!(interp.get_global("x"), num(1.0));
}

#[test]
fn closures_keep_their_scope() {
    let interp = run("
function counter() {
    var n = 0;
    return function () {
        n += 1;
        return n;
    };
}
var c = counter();
var other = counter();
c();
c();
var last = c();
var first = other();
");

    assert_eq!(interp.get_global("last"), num(3.0));
    assert_eq!(interp.get_global("first"), num(1.0));
    assert_eq!(interp.get_global("n"), None);
}

#[test]
fn recursion() {
    let interp = run("
function fact(n) {
    if (n <= 1) return 1;
    return n * fact(n - 1);
}
var result = fact(5);
");

    assert_eq!(interp.get_global("result"), num(120.0));
}

#[test]
fn switch_falls_through_until_break() {
    let interp = run("
var r;
switch (1) {
    case 1:
    case 2:
        r = \"two\";
        break;
    case 3:
        r = \"three\";
}
");

    assert_eq!(interp.get_global("r"), string("two"));
}

#[test]
fn switch_default_and_no_match() {
    let interp = run("
var a = 0, b = 0;
switch ('x') {
    case 'y': a = 1;
    default: a = 2;
}
switch (7) {
    case 1: b = 1;
}
");

    assert_eq!(interp.get_global("a"), num(2.0));
    assert_eq!(interp.get_global("b"), num(0.0));
}

#[test]
fn loop_control() {
    let interp = run("
var s = 0;
for (var i = 0; i < 5; i++) {
    if (i == 2) continue;
    if (i == 3) break;
    s += i;
}
");

    assert_eq!(interp.get_global("s"), num(1.0));
    assert_eq!(interp.get_global("i"), num(3.0));
}

#[test]
fn while_with_continue() {
    let interp = run("
var i = 0, s = 0;
while (i < 5) {
    i++;
    if (i % 2 == 0) continue;
    s += i;
}
");

    assert_eq!(interp.get_global("s"), num(9.0));
}

#[test]
fn do_while_runs_at_least_once() {
    let interp = run("
var i = 0;
do { i++; } while (i < 3);
var j = 10;
do j++; while (false);
");

    assert_eq!(interp.get_global("i"), num(3.0));
    assert_eq!(interp.get_global("j"), num(11.0));
}

#[test]
fn continue_in_switch_continues_the_loop() {
    let interp = run("
var hits = 0;
for (var i = 0; i < 4; i++) {
    switch (i) {
        case 1: continue;
        default: hits += 1;
    }
}
");

    assert_eq!(interp.get_global("hits"), num(3.0));
}

#[test]
fn return_leaves_the_loop_and_the_function() {
    let interp = run("
function find(target) {
    for (var i = 0; i < 10; i++) {
        if (i == target) return i;
    }
    return -1;
}
var hit = find(4);
var miss = find(40);
");

    assert_eq!(interp.get_global("hit"), num(4.0));
    assert_eq!(interp.get_global("miss"), num(-1.0));
}

#[test]
fn constructor_returns_populated_receiver() {
    let interp = run("
function Point(x, y) {
    this.x = x;
    this.y = y;
}
function nothing() {}
var p = new Point(1, 2);
var sum = p.x + p.y;
var missing = p.z;
var empty = nothing();
p[\"label\"] = \"origin\";
p.x += 10;
");

    assert_eq!(interp.get_global("sum"), num(3.0));
    assert_eq!(interp.get_global("missing"), Some(Value::Undefined));
    assert_eq!(interp.get_global("empty"), Some(Value::Undefined));

    let Some(Value::Object(p)) = interp.get_global("p") else {
        panic!("p should be an object");
    };
    assert_eq!(p.borrow().get("label"), string("origin"));
    assert_eq!(p.borrow().get("x"), num(11.0));
    assert_eq!(p.borrow().len(), 3);
}

#[test]
fn print_goes_to_the_sink() {
    let mut printed = vec![];
    let mut interp = Interpreter::with_output(|v| printed.push(v.to_string()));
    interp
        .run("print('a'); print(1 + 2); print(null); print(0.1 * 3 > 0.3);")
        .unwrap();
    drop(interp);

    assert_eq!(printed, vec!["a", "3", "null", "true"]);
}

#[test]
fn compile_then_execute() {
    let program = compile("var x = 2; print(x * 21); x").unwrap();
    let mut printed = vec![];
    let result = execute(&program, |v| printed.push(v.clone()));

    assert_eq!(result, Ok(Value::Num(2.0)));
    assert_eq!(printed, vec![Value::Num(42.0)]);

    // Every execution gets a fresh global scope.
    assert_eq!(execute(&program, |_| {}), Ok(Value::Num(2.0)));
}

#[test]
fn globals_survive_between_runs() {
    let mut interp = Interpreter::with_output(|_| {});
    interp.run("var x = 1;").unwrap();
    interp.run("x = x + 1;").unwrap();

    assert_eq!(interp.get_global("x"), num(2.0));
}

#[test]
fn operator_precedence() {
    let interp = run("
var a = 1 + 2 * 3;
var b = (1 + 2) * 3;
var c = 2 ** 3 * 2;
var d = 1 < 2 && 2 < 3 || false;
var e = -2 + 5;
var f = !0 == true;
var g = 10 - 4 - 3;
");

    assert_eq!(interp.get_global("a"), num(7.0));
    assert_eq!(interp.get_global("b"), num(9.0));
    assert_eq!(interp.get_global("c"), num(16.0));
    assert_eq!(interp.get_global("d"), Some(Value::Bool(true)));
    assert_eq!(interp.get_global("e"), num(3.0));
    assert_eq!(interp.get_global("f"), Some(Value::Bool(true)));
    assert_eq!(interp.get_global("g"), num(3.0));
}

#[test]
fn number_literals_and_bitwise() {
    let interp = run("
var hex = 0xff + 0b11;
var small = 1e-2;
var big = 1.5E3;
var ushr = -1 >>> 28;
var mask = 6 & 3 | 8;
var inv = ~5;
var shl = 1 << 4;
");

    assert_eq!(interp.get_global("hex"), num(258.0));
    assert_eq!(interp.get_global("small"), num(0.01));
    assert_eq!(interp.get_global("big"), num(1500.0));
    assert_eq!(interp.get_global("ushr"), num(15.0));
    assert_eq!(interp.get_global("mask"), num(10.0));
    assert_eq!(interp.get_global("inv"), num(-6.0));
    assert_eq!(interp.get_global("shl"), num(16.0));
}

#[test]
fn strings() {
    let interp = run("
var s = \"abc\";
var n = s.length;
var c = s[1];
var t = 'n=' + 1;
var cmp = 'apple' < 'banana';
var escaped = 'a\\'b';
");

    assert_eq!(interp.get_global("n"), num(3.0));
    assert_eq!(interp.get_global("c"), string("b"));
    assert_eq!(interp.get_global("t"), string("n=1"));
    assert_eq!(interp.get_global("cmp"), Some(Value::Bool(true)));
    assert_eq!(interp.get_global("escaped"), string("a'b"));
}

#[test]
fn logical_operators_yield_operands() {
    let interp = run("
var a = null || 'fallback';
var b = 0 && explode();
var c = 'x' && 'y';
");

    assert_eq!(interp.get_global("a"), string("fallback"));
    assert_eq!(interp.get_global("b"), num(0.0));
    assert_eq!(interp.get_global("c"), string("y"));
}

#[test]
fn equality() {
    let interp = run("
var loose = 1 == '1';
var strict = 1 === '1';
var nullish = null == undefined;
var differs = 2 != 3;
var same = 'a' !== 'a';
");

    assert_eq!(interp.get_global("loose"), Some(Value::Bool(true)));
    assert_eq!(interp.get_global("strict"), Some(Value::Bool(false)));
    assert_eq!(interp.get_global("nullish"), Some(Value::Bool(true)));
    assert_eq!(interp.get_global("differs"), Some(Value::Bool(true)));
    assert_eq!(interp.get_global("same"), Some(Value::Bool(false)));
}

#[test]
fn if_else_chains() {
    let interp = run("
var r;
if (1 > 2) r = 'a'; else r = 'b';

var s;
if (false) {
    s = 'foo';
} else if (true) {
    s = 'far';
} else {
    s = 'bar';
}
");

    assert_eq!(interp.get_global("r"), string("b"));
    assert_eq!(interp.get_global("s"), string("far"));
}

#[test]
fn declarations_see_earlier_names() {
    let interp = run("
var a = 1, b = a + 1;
var c = c;
");

    assert_eq!(interp.get_global("b"), num(2.0));
    assert_eq!(interp.get_global("c"), Some(Value::Null));
}

#[test]
fn increment_and_decrement() {
    let interp = run("
var i = 5;
var a = i++;
var b = ++i;
var d = i--;
");

    assert_eq!(interp.get_global("a"), num(5.0));
    assert_eq!(interp.get_global("b"), num(7.0));
    assert_eq!(interp.get_global("d"), num(7.0));
    assert_eq!(interp.get_global("i"), num(6.0));
}

#[test]
fn immediately_invoked_function() {
    let interp = run("
var r = (function (x) { return x * 2; })(21);
");

    assert_eq!(interp.get_global("r"), num(42.0));
}

#[test]
fn comments_are_ignored() {
    let interp = run("
var x = 1; // one
/* add
   two */ x += 2;
");

    assert_eq!(interp.get_global("x"), num(3.0));
}

#[test]
fn deep_recursion_completes() {
    let interp = run("
function depth(n) {
    if (n == 0) return 0;
    return 1 + depth(n - 1);
}
function even(n) { if (n == 0) return true; return odd(n - 1); }
function odd(n) { if (n == 0) return false; return even(n - 1); }
var r = depth(500);
var e = even(301);
");

    assert_eq!(interp.get_global("r"), num(500.0));
    assert_eq!(interp.get_global("e"), Some(Value::Bool(false)));
}

#[test]
fn case_labels_match_by_type() {
    let interp = run("
var r;
switch ('1') {
    case 1: r = 'number'; break;
    default: r = 'other';
}
var z;
switch (-0) {
    case 0: z = 'zero';
}
var w;
switch (0) {
    case -0: w = 'negative zero';
}
");

    assert_eq!(interp.get_global("r"), string("other"));
    assert_eq!(interp.get_global("z"), string("zero"));
    assert_eq!(interp.get_global("w"), string("negative zero"));
}

#[test]
fn assigning_this_replaces_the_receiver() {
    let interp = run("
function Point(x) { this.x = x; }
function adopt(o) { this = o; }
var p = new Point(1);
var got = adopt(p);
var kept = got === p;
this = p;
var global = this.x;
");

    assert_eq!(interp.get_global("kept"), Some(Value::Bool(true)));
    assert_eq!(interp.get_global("global"), num(1.0));
}

#[test]
fn stray_loop_control_ends_the_function() {
    let interp = run("
var after = 0;
function stop() { break; after = 1; }
function skip() { continue; after = 2; }
var a = stop();
var b = skip();
");

    assert_eq!(interp.get_global("a"), Some(Value::Undefined));
    assert_eq!(interp.get_global("b"), Some(Value::Undefined));
    assert_eq!(interp.get_global("after"), num(0.0));
}

#[test]
fn keyword_named_properties() {
    let interp = run("
function Opts() { this.default = 3; }
var o = new Opts();
o.new = o.default + 1;
var n = o.new;
");

    assert_eq!(interp.get_global("n"), num(4.0));
}

#[test]
fn string_to_number_follows_literal_syntax() {
    let interp = run("
var hex = '0x10' * 1;
var words = 'inf' * 1;
var inf = 'Infinity' * 1;
var big = 1e21 + '';
");

    assert_eq!(interp.get_global("hex"), num(16.0));
    assert!(matches!(interp.get_global("words"), Some(Value::Num(n)) if n.is_nan()));
    assert_eq!(interp.get_global("inf"), num(f64::INFINITY));
    assert_eq!(interp.get_global("big"), string("1e+21"));
}
