// Integration tests for the programs under demos/

use femtoc::compiler::compile;
use femtoc::vm::{BufferConsole, MachineConfig};
use femtoc::{run_source, Outcome};

const ACKERMANN: &str = include_str!("../demos/ackermann.c");
const BUBBLE: &str = include_str!("../demos/bubble.c");
const BEER: &str = include_str!("../demos/beer.c");

fn run_demo(source: &str, input: &[u8]) -> Outcome<BufferConsole> {
    let config = MachineConfig {
        step_limit: Some(20_000_000),
        ..MachineConfig::default()
    };
    match run_source(source, config, BufferConsole::with_input(input)) {
        Ok(outcome) => outcome,
        Err(e) => panic!("demo failed: {}", e),
    }
}

#[test]
fn test_demos_compile_cleanly() {
    for source in [ACKERMANN, BUBBLE, BEER] {
        let output = compile(source).expect("demo should compile");
        assert!(output.trim_end().ends_with("; femtoc: ok"));
    }
}

#[test]
fn test_ackermann_table() {
    let outcome = run_demo(ACKERMANN, b"");
    assert_eq!(outcome.result, 7);

    let lines = outcome.console.lines();
    assert_eq!(lines.len(), 16);
    assert_eq!(lines[0], "ackermann(0,0) is: 1");
    assert_eq!(lines[6], "ackermann(1,2) is: 4");
    assert_eq!(lines[10], "ackermann(2,2) is: 7");
    assert_eq!(lines[15], "ackermann(3,3) is: 61");
}

#[test]
fn test_bubble_sorts_input_line() {
    let outcome = run_demo(BUBBLE, b"femtoc\n");
    assert_eq!(outcome.result, 0);
    assert_eq!(outcome.console.output_text(), "Input:  Output: cefmot\n");
}

#[test]
fn test_bubble_without_trailing_newline() {
    let outcome = run_demo(BUBBLE, b"dcba");
    assert_eq!(outcome.console.output_text(), "Input:  Output: abcd\n");
}

#[test]
fn test_beer_song() {
    let outcome = run_demo(BEER, b"");
    let lines = outcome.console.lines();

    assert_eq!(lines[0], "99 bottles of beer on the wall,");
    assert_eq!(lines[1], "99 bottles of beer.");
    assert_eq!(lines[2], "Take one down, pass it around,");
    assert_eq!(lines[3], "98 bottles of beer on the wall.");
    assert_eq!(lines[4], "");
    assert!(lines.contains(&"1 bottles of beer.".to_string()));
    assert!(lines.contains(&"No more bottles of beer on the wall.".to_string()));
}
