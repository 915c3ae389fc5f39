//! Execution boundary tests: whole target programs through `execute`.

use std::time::Duration;

use force_runtime::context::TRUNCATION_MARKER;
use force_runtime::{CancelToken, ExecutionError, ExecutionOptions, RuntimeErrorKind, execute};

fn output(target: &str) -> String {
    execute(target, &ExecutionOptions::default())
        .expect("execution failed")
        .output
}

fn runtime_error(target: &str, options: &ExecutionOptions) -> RuntimeErrorKind {
    match execute(target, options) {
        Err(ExecutionError::Runtime { error, .. }) => error.kind,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn stack_is_last_in_first_out() {
    let out = output("s = stack_tower([1, 2, 3])\ns.push(4)\nprint(s.pop())\nprint(s.size())\n");
    assert_eq!(out, "4\n3\n");
}

#[test]
fn queue_is_first_in_first_out() {
    let target = "\
q = queue_line()
for ship in ['x-wing', 'y-wing', 'a-wing']:
    q.enqueue(ship)
order = []
while not q.is_empty():
    order.append(q.dequeue())
print(order)
";
    assert_eq!(output(target), "['x-wing', 'y-wing', 'a-wing']\n");
}

#[test]
fn empty_stack_pop_is_catchable() {
    let target = "\
s = stack_tower()
try:
    s.pop()
except IndexError:
    print('empty')
print(s.peek())
";
    assert_eq!(output(target), "empty\nNone\n");
}

// ============================================================================
// Library
// ============================================================================

#[test]
fn json_round_trip() {
    let target = "\
d = {'name': 'Luke', 'level': 3, 'skills': ['saber', 'force']}
s = data_stream('stringify', d)
print(s)
print(data_stream('parse', s) == d)
";
    assert_eq!(
        output(target),
        "{\"name\": \"Luke\", \"level\": 3, \"skills\": [\"saber\", \"force\"]}\nTrue\n"
    );
}

#[test]
fn json_round_trip_of_scalars_and_text() {
    let target = r#"
for v in [True, False, None, 1.0, '', 'say "hi"\t', 'héllo ✓', [[[{'k': [1, {'z': None}]}]]], {}]:
    s = data_stream('stringify', v)
    print(s, data_stream('parse', s) == v)
print(data_stream('parse', '1.0'))
"#;
    assert_eq!(
        output(target),
        "true True\nfalse True\nnull True\n1.0 True\n\"\" True\n\"say \\\"hi\\\"\\t\" True\n\
         \"héllo ✓\" True\n[[[{\"k\": [1, {\"z\": null}]}]]] True\n{} True\n1.0\n"
    );
}

#[test]
fn text_builtins() {
    let target = "\
print(hologram_text('{} has {:.1f} years', 'Yoda', 900))
print(protocol_droid('uppercase', 'rebel'))
print(force_pattern('findall', '[0-9]+', 'TK421 and TK422'))
print(force_encrypt('base64_encode', 'jedi'))
";
    assert_eq!(output(target), "Yoda has 900.0 years\nREBEL\n['421', '422']\namVkaQ==\n");
}

#[test]
fn seeded_randomness_is_repeatable() {
    let options = ExecutionOptions {
        random_seed: Some(66),
        ..ExecutionOptions::default()
    };
    let target = "rolls = []\nfor _ in range(5):\n    rolls.append(midichlorians(1, 100))\nprint(rolls)\n";
    let first = execute(target, &options).unwrap().output;
    let second = execute(target, &options).unwrap().output;
    assert_eq!(first, second);
}

#[test]
fn files_stay_inside_root() {
    let dir = tempfile::tempdir().unwrap();
    let options = ExecutionOptions {
        file_root: Some(dir.path().to_path_buf()),
        ..ExecutionOptions::default()
    };
    let result = execute(
        "imperial_database('log.txt', 'Order 66')\nprint(holocron_archive('log.txt'))\n",
        &options,
    )
    .unwrap();
    assert_eq!(result.output, "Order 66\n");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("log.txt")).unwrap(),
        "Order 66"
    );

    let kind = runtime_error("holocron_archive('../secret.txt')\n", &options);
    assert_eq!(kind, RuntimeErrorKind::PermissionDenied);
    let kind = runtime_error("holocron_archive('missing.txt')\n", &options);
    assert_eq!(kind, RuntimeErrorKind::FileNotFound);
}

// ============================================================================
// Sandbox and limits
// ============================================================================

#[test]
fn rejection_happens_before_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let options = ExecutionOptions {
        file_root: Some(dir.path().to_path_buf()),
        ..ExecutionOptions::default()
    };
    let err = execute("imperial_database('x.txt', 'data')\nimport os\n", &options).unwrap_err();
    assert!(matches!(err, ExecutionError::Rejected { line: Some(2), .. }));
    assert!(!dir.path().join("x.txt").exists());
}

#[test]
fn host_names_are_not_defined() {
    let kind = runtime_error("print(type(1))\n", &ExecutionOptions::default());
    assert_eq!(kind, RuntimeErrorKind::UndefinedName);
}

#[test]
fn recursion_is_bounded() {
    let options = ExecutionOptions {
        max_call_depth: 20,
        ..ExecutionOptions::default()
    };
    let target = "def down(n):\n    return down(n + 1)\ndown(0)\n";
    assert_eq!(runtime_error(target, &options), RuntimeErrorKind::RecursionLimit);

    let target = "def count(n):\n    if n == 0:\n        return 0\n    return 1 + count(n - 1)\ncount(15)\n";
    let result = execute(target, &options).unwrap();
    assert_eq!(result.result, Some(serde_json::json!(15)));
}

#[test]
fn output_is_truncated() {
    let options = ExecutionOptions {
        max_output_bytes: 10,
        ..ExecutionOptions::default()
    };
    let result = execute("for i in range(100):\n    print(i)\n", &options).unwrap();
    assert!(result.truncated);
    assert_eq!(result.output, format!("0\n1\n2\n3\n4\n{TRUNCATION_MARKER}"));
}

#[test]
fn cancellation_stops_a_running_loop() {
    let token = CancelToken::new();
    let options = ExecutionOptions {
        cancel: Some(token.clone()),
        ..ExecutionOptions::default()
    };
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        token.cancel();
    });
    let kind = runtime_error("while True:\n    pass\n", &options);
    canceller.join().unwrap();
    assert_eq!(kind, RuntimeErrorKind::Cancelled);
}

#[test]
fn cancellation_is_not_catchable() {
    let token = CancelToken::new();
    token.cancel();
    let options = ExecutionOptions {
        cancel: Some(token),
        ..ExecutionOptions::default()
    };
    let target = "try:\n    while True:\n        pass\nexcept Exception:\n    print('caught')\n";
    assert_eq!(runtime_error(target, &options), RuntimeErrorKind::Cancelled);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn huge_ranges_are_not_materialized() {
    let options = ExecutionOptions::default();
    for target in [
        "x = list(range(11000000))\n",
        "x = sorted(range(0, 22000000, 2))\n",
        "x = enumerate(range(11000000))\n",
    ] {
        assert_eq!(runtime_error(target, &options), RuntimeErrorKind::Overflow, "{target}");
    }
    // Looping over one stays lazy.
    let out = output("for i in range(11000000):\n    if i == 2:\n        break\n    print(i)\n");
    assert_eq!(out, "0\n1\n");
}

#[test]
fn handlers_match_by_kind() {
    let target = "\
ranks = {'Yoda': 'Master'}
try:
    print(ranks['Luke'])
except KeyError as e:
    print('no rank for', e)
finally:
    print('done')
";
    assert_eq!(output(target), "no rank for 'Luke'\ndone\n");
}

#[test]
fn unhandled_error_reports_line_and_output() {
    let err = execute("print('start')\nx = [1, 2]\nprint(x[5])\n", &ExecutionOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), "IndexOutOfRange");
    assert_eq!(err.line(), Some(3));
    assert_eq!(err.output(), "start\n");
}
