// Runtime support for compiled Pyrite code.
//
// The compiler core needs three things from the runtime: refcounted heap
// objects for interned constants and statically constructed globals
// (heap.rs), an append-only buffer holding assembled code (code.rs), and
// the assembler seam that turns a label-tagged instruction stream into a
// code blob (asm.rs). The real AMD64 encoder plugs in behind the Assemble
// trait; everything here is deliberately backend-agnostic.

pub mod asm;
pub mod code;
pub mod heap;

pub use asm::{AsmItem, AsmStream, Assemble, AssembledBlock, PlaceholderEncoder};
pub use code::CodeBuffer;
pub use heap::{Heap, HeapObject, ObjectRef};
