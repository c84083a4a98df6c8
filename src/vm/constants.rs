// Default capacities for the assembler and the machine

/// Default size of the machine's address space, in words
pub const DEFAULT_MEMORY_WORDS: usize = 1 << 20;

/// Default depth of the frame stack (nested calls)
pub const DEFAULT_FRAME_CAPACITY: usize = 1024;

/// Default maximum number of distinct labels in one assembly unit
pub const DEFAULT_MAX_LABELS: usize = 4096;

/// Number of operand-stack words shown per line of the debug trace
pub const TRACE_STACK_WORDS: usize = 8;

/// Data label whose cell holds the heap's bump pointer; the operand stack
/// may not grow down into the cells below the address stored there
pub const HEAP_POINTER_LABEL: &str = "__hp";
