// Integration tests for the assembler and machine

use femtoc::vm::{
    assemble, AssembleError, BufferConsole, Fault, Machine, MachineConfig, Opcode, Status,
};

fn load(source: &str) -> Machine<BufferConsole> {
    let image = assemble(source).expect("assembly failed");
    let config = MachineConfig {
        memory_words: 1024,
        step_limit: Some(100_000),
        ..MachineConfig::default()
    };
    Machine::new(&image, config, BufferConsole::new()).expect("load failed")
}

#[test]
fn test_push_push_add_halt() {
    let mut machine = load("push 2\npush 3\nadd\nhalt\n");
    assert_eq!(machine.run().unwrap(), 5);
    assert_eq!(machine.stack(), &[5]);
}

#[test]
fn test_single_stepping() {
    let mut machine = load("push 2 push 3 add halt");
    assert_eq!(machine.step().unwrap(), Status::Running);
    assert_eq!(machine.ip(), 2);
    assert_eq!(machine.stack(), &[2]);
    assert_eq!(machine.step().unwrap(), Status::Running);
    assert_eq!(machine.stack(), &[3, 2]);
    assert_eq!(machine.step().unwrap(), Status::Running);
    assert_eq!(machine.top(), Some(5));
    assert_eq!(machine.step().unwrap(), Status::Halted);
    assert_eq!(machine.steps(), 4);
}

#[test]
fn test_unresolved_label() {
    let err = assemble("push 1\npushl missing\njump\n").unwrap_err();
    assert!(matches!(err, AssembleError::UnresolvedLabel { line: 2, .. }));
    assert!(err.to_string().contains("unresolved label"));
}

#[test]
fn test_countdown_loop_with_output() {
    // prints "321" using a counter kept in a data cell
    let source = "
        loop:
            pushl count pushi push 48 add output
            pushl count pushi push 1 sub dup pushl count popi
            pushl loop nzjump
            halt
        count: .byte 3
    ";
    let mut machine = load(source);
    machine.run().unwrap();
    assert_eq!(machine.console().output_text(), "321");
    let count = machine.memory()[assemble(source).unwrap().label("count").unwrap()];
    assert_eq!(count, 0);
}

#[test]
fn test_underflow_reports_instruction() {
    let mut machine = load("push 1 swap halt");
    let err = machine.run().unwrap_err();
    assert_eq!(err.addr, 2);
    assert_eq!(err.opcode, Some(Opcode::Swap));
    assert!(matches!(err.fault, Fault::StackUnderflow { needed: 2, .. }));
}

#[test]
fn test_ret_without_call() {
    let mut machine = load("push 1 ret");
    let err = machine.run().unwrap_err();
    assert_eq!(err.fault, Fault::FrameUnderflow);
}
