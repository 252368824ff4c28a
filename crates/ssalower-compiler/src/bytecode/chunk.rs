//! Bytecode chunk for compiled method bodies.
//!
//! A `BytecodeChunk` contains the compiled bytecode for a single method,
//! along with line number information for debugging.

use super::OpCode;

/// A chunk of compiled bytecode for a single method body.
///
/// Constants are stored at module level in a `ConstantPool`, not per-method.
/// This allows deduplication of constants across methods.
#[derive(Debug, Clone, Default)]
pub struct BytecodeChunk {
    /// The bytecode instructions.
    code: Vec<u8>,
    /// Line numbers for debugging (parallel to code).
    /// Each entry corresponds to a byte in `code`.
    lines: Vec<u32>,
}

impl BytecodeChunk {
    /// Create a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bytecode chunk with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
            lines: Vec::with_capacity(capacity),
        }
    }

    /// Write an opcode.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.code.push(op as u8);
        self.lines.push(line);
    }

    /// Write a byte operand.
    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write a 16-bit operand (big-endian).
    pub fn write_u16(&mut self, value: u16, line: u32) {
        self.code.push((value >> 8) as u8);
        self.lines.push(line);
        self.code.push(value as u8);
        self.lines.push(line);
    }

    /// Write a 32-bit operand (big-endian).
    pub fn write_u32(&mut self, value: u32, line: u32) {
        self.write_u16((value >> 16) as u16, line);
        self.write_u16(value as u16, line);
    }

    /// Write a 64-bit operand (big-endian).
    pub fn write_u64(&mut self, value: u64, line: u32) {
        self.write_u32((value >> 32) as u32, line);
        self.write_u32(value as u32, line);
    }

    /// Get current code offset (for jump patching).
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Push a constant pool entry, choosing the narrow or wide encoding.
    pub fn emit_constant(&mut self, index: u16, line: u32) {
        if index <= u8::MAX as u16 {
            self.write_op(OpCode::Constant, line);
            self.write_byte(index as u8, line);
        } else {
            self.write_op(OpCode::ConstantWide, line);
            self.write_u16(index, line);
        }
    }

    /// Load a local slot, choosing the narrow or wide encoding.
    pub fn emit_get_local(&mut self, index: u16, line: u32) {
        if index <= u8::MAX as u16 {
            self.write_op(OpCode::GetLocal, line);
            self.write_byte(index as u8, line);
        } else {
            self.write_op(OpCode::GetLocalWide, line);
            self.write_u16(index, line);
        }
    }

    /// Store to a local slot, choosing the narrow or wide encoding.
    pub fn emit_set_local(&mut self, index: u16, line: u32) {
        if index <= u8::MAX as u16 {
            self.write_op(OpCode::SetLocal, line);
            self.write_byte(index as u8, line);
        } else {
            self.write_op(OpCode::SetLocalWide, line);
            self.write_u16(index, line);
        }
    }

    /// Push the address of a buffer local, choosing the narrow or wide encoding.
    pub fn emit_local_addr(&mut self, index: u16, line: u32) {
        if index <= u8::MAX as u16 {
            self.write_op(OpCode::LocalAddr, line);
            self.write_byte(index as u8, line);
        } else {
            self.write_op(OpCode::LocalAddrWide, line);
            self.write_u16(index, line);
        }
    }

    /// Emit a jump instruction and return the offset to patch later.
    ///
    /// The jump offset is initialized to 0xFFFF as a placeholder.
    pub fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.write_op(op, line);
        let offset = self.code.len();
        self.write_u16(0xFFFF, line); // Placeholder
        offset
    }

    /// Emit a jump table with `count` placeholder entries.
    ///
    /// Returns the operand offset of each entry, each patchable with
    /// [`BytecodeChunk::patch_jump`]: an entry's distance is measured from
    /// the end of its own two bytes, the same as any other jump operand.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds u16::MAX.
    pub fn emit_jump_table(&mut self, count: usize, line: u32) -> Vec<usize> {
        assert!(
            count <= u16::MAX as usize,
            "jump table entry count {} exceeds u16::MAX",
            count
        );
        self.write_op(OpCode::JumpTable, line);
        self.write_u16(count as u16, line);

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(self.code.len());
            self.write_u16(0xFFFF, line); // Placeholder
        }
        entries
    }

    /// Patch a jump instruction at the given offset to jump to current position.
    ///
    /// # Panics
    ///
    /// Panics if the jump distance exceeds u16::MAX.
    pub fn patch_jump(&mut self, offset: usize) {
        let jump_distance = self.code.len() - offset - 2;
        assert!(
            jump_distance <= u16::MAX as usize,
            "jump distance {} exceeds u16::MAX",
            jump_distance
        );
        self.code[offset] = (jump_distance >> 8) as u8;
        self.code[offset + 1] = jump_distance as u8;
    }

    /// Emit a loop instruction that jumps back to the given offset.
    pub fn emit_loop(&mut self, loop_start: usize, line: u32) {
        self.write_op(OpCode::Loop, line);

        // +2 for the operand bytes we're about to write
        let offset = self.code.len() - loop_start + 2;
        assert!(
            offset <= u16::MAX as usize,
            "loop offset {} exceeds u16::MAX",
            offset
        );
        self.write_u16(offset as u16, line);
    }

    /// Get the bytecode.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Get the line numbers.
    pub fn lines(&self) -> &[u32] {
        &self.lines
    }

    /// Get the line number for a given offset.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    /// Get the length of the bytecode.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Read a byte at the given offset.
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a u16 at the given offset (big-endian).
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        if offset + 1 < self.code.len() {
            Some(((self.code[offset] as u16) << 8) | (self.code[offset + 1] as u16))
        } else {
            None
        }
    }

    /// Read an opcode at the given offset.
    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).and_then(|&b| OpCode::from_u8(b))
    }

    /// Extract all opcodes from the chunk, skipping operands.
    ///
    /// This is useful for testing bytecode sequences without worrying about
    /// specific operand values or instruction offsets. Jump tables are
    /// skipped in full, including their variable-length entry list.
    pub fn opcodes(&self) -> Vec<OpCode> {
        let mut ops = Vec::new();
        let mut offset = 0;

        while offset < self.code.len() {
            if let Some(op) = self.read_op(offset) {
                ops.push(op);
                offset += 1 + op.operand_size();
                if op == OpCode::JumpTable {
                    // The fixed operand is the entry count; the entries follow.
                    let count = self.read_u16(offset - 2).unwrap_or(0) as usize;
                    offset += count * 2;
                }
            } else {
                // Invalid opcode, skip one byte
                offset += 1;
            }
        }

        ops
    }

    /// Check if this chunk contains exactly the given opcode sequence.
    ///
    /// This ignores operand values, only checking the opcodes themselves.
    /// Panics with a descriptive message if the sequences don't match.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Check if this chunk contains the given opcodes (in order, but not necessarily contiguous).
    ///
    /// Useful for verifying key opcodes are present without checking every instruction.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }
}
