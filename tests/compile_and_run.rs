// Integration tests: compile C source, assemble it, run it on the VM

use femtoc::compiler::{compile, CompileErrorKind};
use femtoc::vm::{BufferConsole, Fault, MachineConfig};
use femtoc::{run_source, Error, Outcome};

const PUTCHAR: &str = r#"
    int putchar(int c) {
        asm {
            pushsf push 1 add pushi output
        }
        return 0;
    }
"#;

fn config() -> MachineConfig {
    MachineConfig {
        step_limit: Some(5_000_000),
        ..MachineConfig::default()
    }
}

fn run_with_input(source: &str, input: &[u8]) -> Outcome<BufferConsole> {
    match run_source(source, config(), BufferConsole::with_input(input)) {
        Ok(outcome) => outcome,
        Err(e) => panic!("program failed: {}", e),
    }
}

fn run(source: &str) -> Outcome<BufferConsole> {
    run_with_input(source, b"")
}

fn result_of(source: &str) -> i64 {
    run(source).result
}

#[test]
fn test_left_to_right_arithmetic() {
    assert_eq!(result_of("int main() { return 1 + 2 * 3; }"), 9);
    assert_eq!(result_of("int main() { return 1 + (2 * 3); }"), 7);
    assert_eq!(result_of("int main() { return 20 - 4 / 2; }"), 8);
}

#[test]
fn test_locals_and_arguments() {
    let source = r#"
        int add(int a, int b) {
            int sum = a + b;
            return sum;
        }

        int main() {
            int x = 5;
            int y = 10;
            return add(x, y) - add(1, 2);
        }
    "#;
    assert_eq!(result_of(source), 12);
}

#[test]
fn test_argument_order() {
    let source = r#"
        int sub3(int a, int b, int c) { return a - b - c; }
        int main() { return sub3(100, 30, 5); }
    "#;
    assert_eq!(result_of(source), 65);
}

#[test]
fn test_ackermann() {
    let source = r#"
        int ack(int m, int n) {
            int ans = 0;
            if (m == 0) ans = n + 1;
            else if (n == 0) ans = ack(m - 1, 1);
            else ans = ack(m - 1, ack(m, n - 1));
            return ans;
        }
        int main() { return ack(2, 2); }
    "#;
    assert_eq!(result_of(source), 7);
    assert_eq!(
        result_of(&source.replace("ack(2, 2)", "ack(3, 3)")),
        61
    );
}

#[test]
fn test_break_and_continue_target_innermost_loop() {
    let source = format!(
        "{}{}",
        PUTCHAR,
        r#"
        int main() {
            int i = 0;
            while (i < 3) {
                i = i + 1;
                for (int j = 0; j < 5; j = j + 1) {
                    if (j == 1) continue;
                    if (j == 3) break;
                    putchar('0' + j);
                }
                putchar('|');
            }
            return i;
        }
    "#
    );
    let outcome = run(&source);
    assert_eq!(outcome.result, 3);
    assert_eq!(outcome.console.output_text(), "02|02|02|");
}

#[test]
fn test_pointer_arithmetic_is_scaled() {
    assert_eq!(
        result_of("int main() { int *p; p = p + 1; return p; }"),
        4
    );
    assert_eq!(
        result_of("int main() { char *p; p = p + 1; return p; }"),
        1
    );
    assert_eq!(
        result_of("int main() { int **p; p = p + 2; return p; }"),
        8
    );
}

#[test]
fn test_global_array_indexing() {
    let source = r#"
        int table[4];
        int main() {
            int i = 0;
            while (i < 4) {
                table[i] = i * i;
                i = i + 1;
            }
            return table[3] + table[2];
        }
    "#;
    assert_eq!(result_of(source), 13);
}

#[test]
fn test_local_array_and_pointers() {
    let source = r#"
        int main() {
            char buf[8];
            char *p = buf;
            *p = 'a';
            p = p + 1;
            *p = 'b';
            return *(buf + 1) - *buf;
        }
    "#;
    assert_eq!(result_of(source), 1);
}

#[test]
fn test_address_of_local() {
    let source = r#"
        int set(int *target, int value) { *target = value; return 0; }
        int main() {
            int x = 1;
            set(&x, 42);
            return x;
        }
    "#;
    assert_eq!(result_of(source), 42);
}

#[test]
fn test_heap_pointer_restored_on_return() {
    let source = r#"
        int scratch() { char tmp[100]; return 0; }
        int main() {
            char first[1];
            scratch();
            char second[1];
            return second - first;
        }
    "#;
    assert_eq!(result_of(source), 1);
}

#[test]
fn test_globals_and_constants() {
    let source = r#"
        const int LIMIT = 5;
        int counter = 2;
        int main() {
            while (counter < LIMIT) counter = counter + 1;
            return counter;
        }
    "#;
    assert_eq!(result_of(source), 5);
}

#[test]
fn test_logical_operators() {
    assert_eq!(result_of("int main() { return (1 < 2) && (3 < 4); }"), 1);
    assert_eq!(result_of("int main() { return (1 > 2) && (3 < 4); }"), 0);
    assert_eq!(result_of("int main() { return (1 > 2) || (3 < 4); }"), 1);
    assert_eq!(result_of("int main() { return 0 || 0; }"), 0);
    assert_eq!(result_of("int main() { return !5; }"), 0);
}

#[test]
fn test_negation_and_complement() {
    assert_eq!(result_of("int main() { return -7 + 10; }"), 3);
    assert_eq!(result_of("int main() { return ~0; }"), -1);
}

#[test]
fn test_sizeof_values() {
    assert_eq!(result_of("int main() { return sizeof(char); }"), 1);
    assert_eq!(result_of("int main() { return sizeof(int); }"), 4);
    assert_eq!(result_of("int main() { return sizeof(int***); }"), 4);
}

#[test]
fn test_goto() {
    let source = r#"
        int main() {
            int n = 0;
        again:
            n = n + 1;
            if (n < 10) goto again;
            return n;
        }
    "#;
    assert_eq!(result_of(source), 10);
}

#[test]
fn test_strings_and_output() {
    let source = format!(
        "{}{}",
        PUTCHAR,
        r#"
        int puts(char *s) {
            while (*s) {
                putchar(*s);
                s = s + 1;
            }
            return 0;
        }
        int main() {
            puts("hello, world");
            putchar(10);
            return 0;
        }
    "#
    );
    let outcome = run(&source);
    assert_eq!(outcome.console.lines(), vec!["hello, world".to_string()]);
}

#[test]
fn test_input_echo() {
    let source = r#"
        int getchar() {
            asm {
                input
                pushl getchar_end jump
            }
        }
        int main() {
            int c = getchar();
            int count = 0;
            while (c != -1) {
                count = count + 1;
                c = getchar();
            }
            return count;
        }
    "#;
    assert_eq!(run_with_input(source, b"abcde").result, 5);
}

#[test]
fn test_falling_off_the_end_returns_zero() {
    assert_eq!(result_of("int main() { int x = 3; }"), 0);
}

#[test]
fn test_compile_errors_surface() {
    let err = run_source(
        "int main() { int a; int a; return 0; }",
        config(),
        BufferConsole::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(ref e) if e.kind == CompileErrorKind::Duplicate("a".into())
    ));

    let err = compile("int main() {\n  return missing;\n}").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.kind, CompileErrorKind::Undeclared("missing".into()));
}

#[test]
fn test_missing_main_is_unresolved() {
    let err = run_source("int helper() { return 1; }", config(), BufferConsole::new())
        .unwrap_err();
    assert!(err.to_string().contains("unresolved label"));
}

#[test]
fn test_runtime_errors_surface() {
    let err = run_source(
        "int main() { int z = 0; return 1 / z; }",
        config(),
        BufferConsole::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(ref e) if e.fault == Fault::DivisionByZero
    ));
}

#[test]
fn test_unbounded_recursion_is_caught() {
    let err = run_source(
        "int f(int n) { return f(n + 1); } int main() { return f(0); }",
        config(),
        BufferConsole::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(ref e) if matches!(e.fault, Fault::FrameOverflow { .. })
    ));
}

#[test]
fn test_pointer_cast_reinterprets() {
    let source = r#"
        int words[2];
        int main() {
            char *raw;
            int *p;
            words[1] = 42;
            raw = (char*) words;
            p = (int*) raw;
            p = p + 1;
            return *p;
        }
    "#;
    assert_eq!(result_of(source), 42);
}

#[test]
fn test_heap_exhaustion_is_a_runtime_error() {
    let source = r#"
        int main() {
            int n = 5000;
            char buf[n];
            int x = 7;
            buf[n - 1] = 99;
            return x;
        }
    "#;
    let config = MachineConfig {
        memory_words: 4096,
        ..config()
    };
    let err = run_source(source, config, BufferConsole::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(ref e) if matches!(e.fault, Fault::HeapCollision { .. })
    ));
}

#[test]
fn test_local_arrays_fit_below_the_stack() {
    let source = r#"
        int fill(int n) {
            char buf[n];
            int i = 0;
            while (i < n) { buf[i] = 1; i = i + 1; }
            return buf[n - 1];
        }
        int main() { return fill(2000) + fill(2000); }
    "#;
    let config = MachineConfig {
        memory_words: 4096,
        ..config()
    };
    let outcome = run_source(source, config, BufferConsole::new()).unwrap();
    assert_eq!(outcome.result, 2);
}

#[test]
fn test_nesting_depth() {
    let shallow = format!("int main() {{ return {}1{}; }}", "(".repeat(40), ")".repeat(40));
    assert_eq!(result_of(&shallow), 1);

    let deep = format!("int main() {{ return {}1{}; }}", "(".repeat(400), ")".repeat(400));
    let err = run_source(&deep, config(), BufferConsole::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(ref e) if matches!(e.kind, CompileErrorKind::Capacity { what: "nesting depth", .. })
    ));
}

#[test]
fn test_generated_label_names_are_rejected() {
    let err = compile("int f_end; int f() { return 0; } int main() { return f(); }").unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Reserved("f_end".into()));
}
