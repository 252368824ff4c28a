//! A reference interpreter for compiled target modules.
//!
//! Executes bytecode the way the target machine is documented to behave:
//! 64-bit value slots, big-endian operand immediates, frame-local buffer
//! storage released on return, by-address buffer passing, and a
//! machine-owned staging area for by-address return values. The
//! integration tests run lowered modules through it end to end instead of
//! only inspecting opcode sequences.
//!
//! The machine is deliberately strict where the compiler makes promises:
//! frames of `NO_AUTO_ZERO` methods are filled with a canary pattern so a
//! read-before-write surfaces as garbage instead of a lucky zero, and
//! callable tokens live in unmapped address space so a stray integer fed
//! to `CallIndirect` faults with a message instead of calling method 0.

use ssalower::compiler::bytecode::Constant;
use ssalower::compiler::{
    HostImport, LocalKind, MethodDef, MethodFlags, OpCode, SigType, TargetModule,
};

/// Addresses below this are never mapped, so null dereferences fault.
const NULL_GUARD: u64 = 16;

/// Size of the staging area that carries by-address return values across
/// frame teardown. Callers copy the value out before the next call, so a
/// single recycled region is enough.
const STAGING_SIZE: u64 = 4096;

/// Fill pattern for locals of methods compiled without auto-zeroing.
const CANARY: u64 = 0xA5A5_A5A5_A5A5_A5A5;

/// Callable tokens are method indexes offset into unmapped address space,
/// so a token never collides with null or with a data address.
const FUNC_TOKEN_BASE: u64 = 0xFFFF_0000_0000;

/// Scalar element kind of a vector host builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl Lane {
    fn parse(token: &str) -> Lane {
        match token {
            "i8" => Lane::I8,
            "i16" => Lane::I16,
            "i32" => Lane::I32,
            "i64" => Lane::I64,
            "f32" => Lane::F32,
            "f64" => Lane::F64,
            other => panic!("unknown vector element kind {other}"),
        }
    }

    fn size(self) -> u64 {
        match self {
            Lane::I8 => 1,
            Lane::I16 => 2,
            Lane::I32 => 4,
            Lane::I64 => 8,
            Lane::F32 => 4,
            Lane::F64 => 8,
        }
    }

    fn is_float(self) -> bool {
        matches!(self, Lane::F32 | Lane::F64)
    }
}

/// An interpreter over one loaded [`TargetModule`].
///
/// Memory is a single flat byte array: a null guard page, then constant
/// blob storage, the return staging area, global storage, and finally
/// frame buffers growing and shrinking with the call stack.
pub struct Machine {
    target: TargetModule,
    memory: Vec<u8>,
    stack: Vec<u64>,
    /// Blob address per constant pool index; zero for scalar entries.
    blob_addrs: Vec<u64>,
    global_addrs: Vec<u64>,
    staging: u64,
}

impl Machine {
    /// Map a compiled module: lay out constant blobs and global storage,
    /// leaving every global zero-filled until the initializer runs.
    pub fn load(target: TargetModule) -> Machine {
        let mut machine = Machine {
            target,
            memory: vec![0; NULL_GUARD as usize],
            stack: Vec::new(),
            blob_addrs: Vec::new(),
            global_addrs: Vec::new(),
            staging: 0,
        };
        machine.staging = machine.alloc(STAGING_SIZE, 16);

        let blobs: Vec<Option<Vec<u8>>> = machine
            .target
            .constants
            .constants()
            .iter()
            .map(|constant| match constant {
                Constant::Bytes(data) => Some(data.clone()),
                _ => None,
            })
            .collect();
        for blob in blobs {
            let addr = match blob {
                Some(data) => {
                    let addr = machine.alloc(data.len() as u64, 16);
                    machine.store_bytes(addr, &data);
                    addr
                }
                None => 0,
            };
            machine.blob_addrs.push(addr);
        }

        let shapes: Vec<(u64, u64)> = machine
            .target
            .globals
            .iter()
            .map(|global| (global.size.max(1), global.align.max(1)))
            .collect();
        for (size, align) in shapes {
            let addr = machine.alloc(size, align);
            machine.global_addrs.push(addr);
        }
        machine
    }

    /// Run the synthesized global initializer, if the module has one.
    pub fn run_initializer(&mut self) {
        if let Some(init) = self.target.global_init {
            self.invoke(init.index() as usize, &[]);
        }
    }

    /// Index of the method with the given name.
    pub fn method_index(&self, name: &str) -> usize {
        self.target
            .methods
            .iter()
            .position(|method| method.name == name)
            .unwrap_or_else(|| panic!("no method named {name}"))
    }

    /// Call a method by name with raw slot arguments.
    ///
    /// Scalar arguments travel as their slot representation; by-address
    /// arguments are passed as addresses obtained from [`Machine::store_data`].
    /// A by-address return value comes back as its staging address.
    pub fn call(&mut self, name: &str, args: &[u64]) -> Option<u64> {
        let method = self.method_index(name);
        let depth = self.stack.len();
        let result = self.invoke(method, args);
        assert_eq!(
            self.stack.len(),
            depth,
            "value stack left unbalanced by {name}"
        );
        result
    }

    /// Call a method returning a by-address value and copy the bytes out.
    pub fn call_for_bytes(&mut self, name: &str, args: &[u64], size: u64) -> Vec<u8> {
        let addr = self
            .call(name, args)
            .unwrap_or_else(|| panic!("{name} returned no value"));
        self.read_bytes(addr, size)
    }

    /// Copy data into fresh machine memory and return its address.
    ///
    /// The storage outlives every later call, so the address can be used
    /// as a by-address argument.
    pub fn store_data(&mut self, bytes: &[u8]) -> u64 {
        let addr = self.alloc(bytes.len() as u64, 16);
        self.store_bytes(addr, bytes);
        addr
    }

    /// Read the backing storage of a global by name.
    pub fn global_bytes(&self, name: &str) -> Vec<u8> {
        let index = self
            .target
            .globals
            .iter()
            .position(|global| global.name == name)
            .unwrap_or_else(|| panic!("no global named {name}"));
        self.read_bytes(self.global_addrs[index], self.target.globals[index].size)
    }

    /// Read raw bytes from machine memory.
    pub fn read_bytes(&self, addr: u64, len: u64) -> Vec<u8> {
        self.slice(addr, len).to_vec()
    }

    // =========================================================================
    // Frames and dispatch
    // =========================================================================

    /// Execute a method by index. Panics on any machine fault.
    pub fn invoke(&mut self, method: usize, args: &[u64]) -> Option<u64> {
        let def = self.target.methods[method].clone();
        if def.flags.contains(MethodFlags::EXTERNAL) {
            let symbol = def
                .import
                .map(|index| self.target.imports[index as usize].symbol.clone())
                .unwrap_or_else(|| def.name.clone());
            panic!("native import {symbol} is not modeled by the test machine");
        }
        let code = def
            .body
            .as_ref()
            .unwrap_or_else(|| panic!("method {} has no body", def.name))
            .code()
            .to_vec();

        let watermark = self.memory.len();
        let fixed = def.sig.params.len();
        assert!(
            args.len() >= fixed,
            "call to {} passed {} arguments for {} parameters",
            def.name,
            args.len(),
            fixed
        );

        let no_auto_zero = def.flags.contains(MethodFlags::NO_AUTO_ZERO);
        let mut locals = Vec::with_capacity(def.locals.len());
        for (index, decl) in def.locals.iter().enumerate() {
            let slot = match decl.kind {
                LocalKind::Slot => {
                    if index < fixed {
                        args[index]
                    } else if no_auto_zero {
                        CANARY
                    } else {
                        0
                    }
                }
                LocalKind::Buffer { size, align } => {
                    let addr = self.alloc(size, align);
                    if index < fixed {
                        let bytes = self.read_bytes(args[index], size);
                        self.store_bytes(addr, &bytes);
                    } else if no_auto_zero {
                        self.slice_mut(addr, size).fill(0xA5);
                    }
                    addr
                }
            };
            locals.push(slot);
        }

        let vararg_base = if args.len() > fixed {
            let base = self.alloc((args.len() - fixed) as u64 * 8, 8);
            for (index, &value) in args[fixed..].iter().enumerate() {
                self.write_u64(base + index as u64 * 8, value);
            }
            base
        } else {
            0
        };

        let result = self.run(&def, &code, &mut locals, vararg_base);
        self.memory.truncate(watermark);
        result
    }

    /// The dispatch loop for one frame.
    fn run(
        &mut self,
        def: &MethodDef,
        code: &[u8],
        locals: &mut [u64],
        vararg_base: u64,
    ) -> Option<u64> {
        let mut pc = 0usize;
        loop {
            let op = OpCode::from_u8(code[pc]).unwrap_or_else(|| {
                panic!("invalid opcode byte {:#04x} at {pc} in {}", code[pc], def.name)
            });
            pc += 1;
            match op {
                // Constants
                OpCode::Constant => {
                    let index = code[pc] as u16;
                    pc += 1;
                    self.push_pool(index);
                }
                OpCode::ConstantWide => {
                    let index = be16(code, pc);
                    pc += 2;
                    self.push_pool(index);
                }
                OpCode::PushZero => self.stack.push(0),
                OpCode::PushOne => self.stack.push(1),
                OpCode::PushNull => self.stack.push(0),

                // Stack
                OpCode::Dup => {
                    let top = *self.stack.last().expect("Dup on empty stack");
                    self.stack.push(top);
                }
                OpCode::Pop => {
                    self.pop();
                }

                // Locals
                OpCode::GetLocal => {
                    let index = code[pc] as usize;
                    pc += 1;
                    self.stack.push(locals[index]);
                }
                OpCode::SetLocal => {
                    let index = code[pc] as usize;
                    pc += 1;
                    locals[index] = self.pop();
                }
                OpCode::LocalAddr => {
                    let index = code[pc] as usize;
                    pc += 1;
                    self.stack.push(locals[index]);
                }
                OpCode::GetLocalWide => {
                    let index = be16(code, pc) as usize;
                    pc += 2;
                    self.stack.push(locals[index]);
                }
                OpCode::SetLocalWide => {
                    let index = be16(code, pc) as usize;
                    pc += 2;
                    locals[index] = self.pop();
                }
                OpCode::LocalAddrWide => {
                    let index = be16(code, pc) as usize;
                    pc += 2;
                    self.stack.push(locals[index]);
                }

                // Globals
                OpCode::GlobalAddr => {
                    let index = be16(code, pc) as usize;
                    pc += 2;
                    self.stack.push(self.global_addrs[index]);
                }

                // Arithmetic
                OpCode::AddI32 => self.bin_i32(i32::wrapping_add),
                OpCode::AddI64 => self.bin_i64(i64::wrapping_add),
                OpCode::AddF32 => self.bin_f32(|a, b| a + b),
                OpCode::AddF64 => self.bin_f64(|a, b| a + b),
                OpCode::SubI32 => self.bin_i32(i32::wrapping_sub),
                OpCode::SubI64 => self.bin_i64(i64::wrapping_sub),
                OpCode::SubF32 => self.bin_f32(|a, b| a - b),
                OpCode::SubF64 => self.bin_f64(|a, b| a - b),
                OpCode::MulI32 => self.bin_i32(i32::wrapping_mul),
                OpCode::MulI64 => self.bin_i64(i64::wrapping_mul),
                OpCode::MulF32 => self.bin_f32(|a, b| a * b),
                OpCode::MulF64 => self.bin_f64(|a, b| a * b),
                OpCode::DivI32 => self.bin_i32(|a, b| a.wrapping_div(nonzero_i32(b))),
                OpCode::DivU32 => self.bin_u32(|a, b| a / nonzero_u32(b)),
                OpCode::DivI64 => self.bin_i64(|a, b| a.wrapping_div(nonzero_i64(b))),
                OpCode::DivU64 => self.bin_u64(|a, b| a / nonzero_u64(b)),
                OpCode::DivF32 => self.bin_f32(|a, b| a / b),
                OpCode::DivF64 => self.bin_f64(|a, b| a / b),
                OpCode::RemI32 => self.bin_i32(|a, b| a.wrapping_rem(nonzero_i32(b))),
                OpCode::RemU32 => self.bin_u32(|a, b| a % nonzero_u32(b)),
                OpCode::RemI64 => self.bin_i64(|a, b| a.wrapping_rem(nonzero_i64(b))),
                OpCode::RemU64 => self.bin_u64(|a, b| a % nonzero_u64(b)),
                OpCode::RemF32 => self.bin_f32(|a, b| a % b),
                OpCode::RemF64 => self.bin_f64(|a, b| a % b),
                OpCode::NegI32 => {
                    let v = self.pop_i32();
                    self.push_i32(v.wrapping_neg());
                }
                OpCode::NegI64 => {
                    let v = self.pop() as i64;
                    self.stack.push(v.wrapping_neg() as u64);
                }
                OpCode::NegF32 => {
                    let v = self.pop_f32();
                    self.push_f32(-v);
                }
                OpCode::NegF64 => {
                    let v = self.pop_f64();
                    self.push_f64(-v);
                }

                // Bitwise
                OpCode::AndI32 => self.bin_u32(|a, b| a & b),
                OpCode::AndI64 => self.bin_u64(|a, b| a & b),
                OpCode::OrI32 => self.bin_u32(|a, b| a | b),
                OpCode::OrI64 => self.bin_u64(|a, b| a | b),
                OpCode::XorI32 => self.bin_u32(|a, b| a ^ b),
                OpCode::XorI64 => self.bin_u64(|a, b| a ^ b),
                OpCode::ShlI32 => self.bin_u32(|a, b| a.wrapping_shl(b & 31)),
                OpCode::ShlI64 => self.bin_u64(|a, b| a.wrapping_shl(b as u32 & 63)),
                OpCode::ShrI32 => self.bin_i32(|a, b| a.wrapping_shr(b as u32 & 31)),
                OpCode::ShrI64 => self.bin_i64(|a, b| a.wrapping_shr(b as u32 & 63)),
                OpCode::UshrI32 => self.bin_u32(|a, b| a.wrapping_shr(b & 31)),
                OpCode::UshrI64 => self.bin_u64(|a, b| a.wrapping_shr(b as u32 & 63)),
                OpCode::Not => {
                    let v = self.pop() as u32;
                    self.stack.push((v == 0) as u64);
                }

                // Comparisons
                OpCode::EqI32 => self.cmp_i32(|a, b| a == b),
                OpCode::EqI64 => self.cmp_i64(|a, b| a == b),
                OpCode::EqF32 => self.cmp_f32(|a, b| a == b),
                OpCode::EqF64 => self.cmp_f64(|a, b| a == b),
                OpCode::NeI32 => self.cmp_i32(|a, b| a != b),
                OpCode::NeI64 => self.cmp_i64(|a, b| a != b),
                OpCode::NeF32 => self.cmp_f32(ordered_ne_f32),
                OpCode::NeF64 => self.cmp_f64(ordered_ne_f64),
                OpCode::LtI32 => self.cmp_i32(|a, b| a < b),
                OpCode::LtU32 => self.cmp_u32(|a, b| a < b),
                OpCode::LtI64 => self.cmp_i64(|a, b| a < b),
                OpCode::LtU64 => self.cmp_u64(|a, b| a < b),
                OpCode::LtF32 => self.cmp_f32(|a, b| a < b),
                OpCode::LtF64 => self.cmp_f64(|a, b| a < b),
                OpCode::LeI32 => self.cmp_i32(|a, b| a <= b),
                OpCode::LeU32 => self.cmp_u32(|a, b| a <= b),
                OpCode::LeI64 => self.cmp_i64(|a, b| a <= b),
                OpCode::LeU64 => self.cmp_u64(|a, b| a <= b),
                OpCode::LeF32 => self.cmp_f32(|a, b| a <= b),
                OpCode::LeF64 => self.cmp_f64(|a, b| a <= b),
                OpCode::GtI32 => self.cmp_i32(|a, b| a > b),
                OpCode::GtU32 => self.cmp_u32(|a, b| a > b),
                OpCode::GtI64 => self.cmp_i64(|a, b| a > b),
                OpCode::GtU64 => self.cmp_u64(|a, b| a > b),
                OpCode::GtF32 => self.cmp_f32(|a, b| a > b),
                OpCode::GtF64 => self.cmp_f64(|a, b| a > b),
                OpCode::GeI32 => self.cmp_i32(|a, b| a >= b),
                OpCode::GeU32 => self.cmp_u32(|a, b| a >= b),
                OpCode::GeI64 => self.cmp_i64(|a, b| a >= b),
                OpCode::GeU64 => self.cmp_u64(|a, b| a >= b),
                OpCode::GeF32 => self.cmp_f32(|a, b| a >= b),
                OpCode::GeF64 => self.cmp_f64(|a, b| a >= b),

                // Fused compare-and-branch
                OpCode::BrEqI32 => pc = self.branch_i32(code, pc, |a, b| a == b),
                OpCode::BrEqI64 => pc = self.branch_i64(code, pc, |a, b| a == b),
                OpCode::BrEqF32 => pc = self.branch_f32(code, pc, |a, b| a == b),
                OpCode::BrEqF64 => pc = self.branch_f64(code, pc, |a, b| a == b),
                OpCode::BrNeI32 => pc = self.branch_i32(code, pc, |a, b| a != b),
                OpCode::BrNeI64 => pc = self.branch_i64(code, pc, |a, b| a != b),
                OpCode::BrNeF32 => pc = self.branch_f32(code, pc, ordered_ne_f32),
                OpCode::BrNeF64 => pc = self.branch_f64(code, pc, ordered_ne_f64),
                OpCode::BrLtI32 => pc = self.branch_i32(code, pc, |a, b| a < b),
                OpCode::BrLtU32 => pc = self.branch_u32(code, pc, |a, b| a < b),
                OpCode::BrLtI64 => pc = self.branch_i64(code, pc, |a, b| a < b),
                OpCode::BrLtU64 => pc = self.branch_u64(code, pc, |a, b| a < b),
                OpCode::BrLtF32 => pc = self.branch_f32(code, pc, |a, b| a < b),
                OpCode::BrLtF64 => pc = self.branch_f64(code, pc, |a, b| a < b),
                OpCode::BrLeI32 => pc = self.branch_i32(code, pc, |a, b| a <= b),
                OpCode::BrLeU32 => pc = self.branch_u32(code, pc, |a, b| a <= b),
                OpCode::BrLeI64 => pc = self.branch_i64(code, pc, |a, b| a <= b),
                OpCode::BrLeU64 => pc = self.branch_u64(code, pc, |a, b| a <= b),
                OpCode::BrLeF32 => pc = self.branch_f32(code, pc, |a, b| a <= b),
                OpCode::BrLeF64 => pc = self.branch_f64(code, pc, |a, b| a <= b),
                OpCode::BrGtI32 => pc = self.branch_i32(code, pc, |a, b| a > b),
                OpCode::BrGtU32 => pc = self.branch_u32(code, pc, |a, b| a > b),
                OpCode::BrGtI64 => pc = self.branch_i64(code, pc, |a, b| a > b),
                OpCode::BrGtU64 => pc = self.branch_u64(code, pc, |a, b| a > b),
                OpCode::BrGtF32 => pc = self.branch_f32(code, pc, |a, b| a > b),
                OpCode::BrGtF64 => pc = self.branch_f64(code, pc, |a, b| a > b),
                OpCode::BrGeI32 => pc = self.branch_i32(code, pc, |a, b| a >= b),
                OpCode::BrGeU32 => pc = self.branch_u32(code, pc, |a, b| a >= b),
                OpCode::BrGeI64 => pc = self.branch_i64(code, pc, |a, b| a >= b),
                OpCode::BrGeU64 => pc = self.branch_u64(code, pc, |a, b| a >= b),
                OpCode::BrGeF32 => pc = self.branch_f32(code, pc, |a, b| a >= b),
                OpCode::BrGeF64 => pc = self.branch_f64(code, pc, |a, b| a >= b),

                // Control flow
                OpCode::Jump => pc = forward(code, pc, true),
                OpCode::JumpIfTrue => {
                    let cond = self.pop() as u32;
                    pc = forward(code, pc, cond != 0);
                }
                OpCode::JumpIfFalse => {
                    let cond = self.pop() as u32;
                    pc = forward(code, pc, cond == 0);
                }
                OpCode::Loop => {
                    let distance = be16(code, pc) as usize;
                    pc = pc + 2 - distance;
                }
                OpCode::JumpTable => {
                    let count = be16(code, pc) as u64;
                    let selector = self.pop();
                    if selector < count {
                        let entry = pc + 2 + selector as usize * 2;
                        pc = entry + 2 + be16(code, entry) as usize;
                    } else {
                        pc = pc + 2 + count as usize * 2;
                    }
                }

                // Calls
                OpCode::Call => {
                    let method = be16(code, pc) as usize;
                    let site = be16(code, pc + 2) as usize;
                    pc += 4;
                    let argc = self.target.signatures[site].params.len();
                    let args = self.pop_args(argc);
                    if let Some(value) = self.invoke(method, &args) {
                        self.stack.push(value);
                    }
                }
                OpCode::CallHost => {
                    let index = be16(code, pc) as usize;
                    pc += 2;
                    let host = self.target.hosts[index].clone();
                    let args = self.pop_args(host.params.len());
                    let result = self.call_host(&host, &args, vararg_base);
                    if host.ret.is_some() {
                        self.stack
                            .push(result.unwrap_or_else(|| {
                                panic!("host builtin {} produced no value", host.name)
                            }));
                    }
                }
                OpCode::CallIndirect => {
                    let site = be16(code, pc) as usize;
                    pc += 2;
                    let token = self.pop();
                    let argc = self.target.signatures[site].params.len();
                    let args = self.pop_args(argc);
                    assert!(
                        token >= FUNC_TOKEN_BASE
                            && token - FUNC_TOKEN_BASE < self.target.methods.len() as u64,
                        "indirect call through a non-callable token {token:#x}"
                    );
                    let method = (token - FUNC_TOKEN_BASE) as usize;
                    if let Some(value) = self.invoke(method, &args) {
                        self.stack.push(value);
                    }
                }
                OpCode::FuncPtr => {
                    let method = be16(code, pc) as u64;
                    pc += 2;
                    self.stack.push(FUNC_TOKEN_BASE + method);
                }
                OpCode::Return => {
                    let value = self.pop();
                    return Some(match def.sig.ret {
                        Some(SigType::Buffer { size }) => {
                            assert!(
                                size <= STAGING_SIZE,
                                "return value of {size} bytes exceeds the staging area"
                            );
                            let bytes = self.read_bytes(value, size);
                            self.store_bytes(self.staging, &bytes);
                            self.staging
                        }
                        _ => value,
                    });
                }
                OpCode::ReturnVoid => return None,

                // Memory
                OpCode::LoadIndI8 => {
                    let addr = self.pop();
                    self.push_i32(self.read_u8(addr) as i8 as i32);
                }
                OpCode::LoadIndU8 => {
                    let addr = self.pop();
                    self.stack.push(self.read_u8(addr) as u64);
                }
                OpCode::LoadIndI16 => {
                    let addr = self.pop();
                    self.push_i32(self.read_u16(addr) as i16 as i32);
                }
                OpCode::LoadIndU16 => {
                    let addr = self.pop();
                    self.stack.push(self.read_u16(addr) as u64);
                }
                OpCode::LoadIndI32 => {
                    let addr = self.pop();
                    self.stack.push(self.read_u32(addr) as u64);
                }
                OpCode::LoadIndI64 | OpCode::LoadIndPtr => {
                    let addr = self.pop();
                    let value = self.read_u64(addr);
                    self.stack.push(value);
                }
                OpCode::LoadIndF32 => {
                    let addr = self.pop();
                    self.stack.push(self.read_u32(addr) as u64);
                }
                OpCode::LoadIndF64 => {
                    let addr = self.pop();
                    let value = self.read_u64(addr);
                    self.stack.push(value);
                }
                OpCode::StoreIndI8 => {
                    let value = self.pop();
                    let addr = self.pop();
                    self.write_u8(addr, value as u8);
                }
                OpCode::StoreIndI16 => {
                    let value = self.pop();
                    let addr = self.pop();
                    self.write_u16(addr, value as u16);
                }
                OpCode::StoreIndI32 | OpCode::StoreIndF32 => {
                    let value = self.pop();
                    let addr = self.pop();
                    self.write_u32(addr, value as u32);
                }
                OpCode::StoreIndI64 | OpCode::StoreIndF64 | OpCode::StoreIndPtr => {
                    let value = self.pop();
                    let addr = self.pop();
                    self.write_u64(addr, value);
                }
                OpCode::MemCopy => {
                    let count = self.pop();
                    let src = self.pop();
                    let dest = self.pop();
                    if count > 0 {
                        // Through a temporary, so overlapping regions are safe.
                        let bytes = self.read_bytes(src, count);
                        self.store_bytes(dest, &bytes);
                    }
                }
                OpCode::MemFill => {
                    let len = self.pop();
                    let value = self.pop();
                    let dest = self.pop();
                    if len > 0 {
                        self.slice_mut(dest, len).fill(value as u8);
                    }
                }
                OpCode::StackAlloc => {
                    let size = self.pop();
                    let addr = self.alloc(size.max(1), 16);
                    self.stack.push(addr);
                }

                // Conversions
                OpCode::ConvI32I8 => {
                    let v = self.pop_i32();
                    self.push_i32(v as i8 as i32);
                }
                OpCode::ConvI32U8 => {
                    let v = self.pop();
                    self.stack.push(v as u8 as u64);
                }
                OpCode::ConvI32I16 => {
                    let v = self.pop_i32();
                    self.push_i32(v as i16 as i32);
                }
                OpCode::ConvI32U16 => {
                    let v = self.pop();
                    self.stack.push(v as u16 as u64);
                }
                OpCode::ConvI32I64 => {
                    let v = self.pop_i32();
                    self.stack.push(v as i64 as u64);
                }
                OpCode::ConvU32I64 => {
                    let v = self.pop() as u32;
                    self.stack.push(v as u64);
                }
                OpCode::ConvI64I32 => {
                    let v = self.pop() as i64;
                    self.push_i32(v as i32);
                }
                OpCode::ConvI32F32 => {
                    let v = self.pop_i32();
                    self.push_f32(v as f32);
                }
                OpCode::ConvI32F64 => {
                    let v = self.pop_i32();
                    self.push_f64(v as f64);
                }
                OpCode::ConvU32F32 => {
                    let v = self.pop() as u32;
                    self.push_f32(v as f32);
                }
                OpCode::ConvU32F64 => {
                    let v = self.pop() as u32;
                    self.push_f64(v as f64);
                }
                OpCode::ConvI64F32 => {
                    let v = self.pop() as i64;
                    self.push_f32(v as f32);
                }
                OpCode::ConvI64F64 => {
                    let v = self.pop() as i64;
                    self.push_f64(v as f64);
                }
                OpCode::ConvU64F32 => {
                    let v = self.pop();
                    self.push_f32(v as f32);
                }
                OpCode::ConvU64F64 => {
                    let v = self.pop();
                    self.push_f64(v as f64);
                }
                OpCode::ConvF32I32 => {
                    let v = self.pop_f32();
                    self.push_i32(v as i32);
                }
                OpCode::ConvF32I64 => {
                    let v = self.pop_f32();
                    self.stack.push(v as i64 as u64);
                }
                OpCode::ConvF32U32 => {
                    let v = self.pop_f32();
                    self.stack.push(v as u32 as u64);
                }
                OpCode::ConvF32U64 => {
                    let v = self.pop_f32();
                    self.stack.push(v as u64);
                }
                OpCode::ConvF64I32 => {
                    let v = self.pop_f64();
                    self.push_i32(v as i32);
                }
                OpCode::ConvF64I64 => {
                    let v = self.pop_f64();
                    self.stack.push(v as i64 as u64);
                }
                OpCode::ConvF64U32 => {
                    let v = self.pop_f64();
                    self.stack.push(v as u32 as u64);
                }
                OpCode::ConvF64U64 => {
                    let v = self.pop_f64();
                    self.stack.push(v as u64);
                }
                OpCode::ConvF32F64 => {
                    let v = self.pop_f32();
                    self.push_f64(v as f64);
                }
                OpCode::ConvF64F32 => {
                    let v = self.pop_f64();
                    self.push_f32(v as f32);
                }
                OpCode::BitcastI32F32 | OpCode::BitcastF32I32 => {
                    let v = self.pop() as u32;
                    self.stack.push(v as u64);
                }
                OpCode::BitcastI64F64 | OpCode::BitcastF64I64 => {}

                // Traps
                OpCode::Fault => panic!("fault opcode reached in {}", def.name),
            }
        }
    }

    // =========================================================================
    // Host builtins
    // =========================================================================

    fn call_host(&mut self, host: &HostImport, args: &[u64], vararg_base: u64) -> Option<u64> {
        if host.name == "rt.va_start" {
            self.write_u64(args[0], vararg_base);
            return None;
        }
        let parts: Vec<&str> = host.name.split('.').collect();
        match parts.as_slice() {
            ["math", op, ty] => Some(host_math(op, ty, args)),
            [vec, rest @ ..] if vec.starts_with("vec") => {
                let bits: u64 = vec[3..]
                    .parse()
                    .unwrap_or_else(|_| panic!("malformed vector host name {}", host.name));
                self.host_vector(bits / 8, rest, args, &host.name)
            }
            _ => panic!("host builtin {} is not modeled by the test machine", host.name),
        }
    }

    fn host_vector(
        &mut self,
        bytes: u64,
        parts: &[&str],
        args: &[u64],
        name: &str,
    ) -> Option<u64> {
        match parts {
            ["splat", elem] => {
                let lane = Lane::parse(elem);
                for index in 0..bytes / lane.size() {
                    self.store_lane(args[0], index, lane, args[1]);
                }
                None
            }
            ["concat", _elem] => {
                let half = bytes / 2;
                let low = self.read_bytes(args[1], half);
                let high = self.read_bytes(args[2], half);
                self.store_bytes(args[0], &low);
                self.store_bytes(args[0] + half, &high);
                None
            }
            ["shl" | "ashr" | "lshr", elem] => {
                let lane = Lane::parse(elem);
                let amount = args[2] as u32;
                for index in 0..bytes / lane.size() {
                    let value = self.load_lane(args[1], index, lane);
                    let shifted = shift_lane(parts[0], lane, value, amount);
                    self.store_lane(args[0], index, lane, shifted);
                }
                None
            }
            ["reduce", op, elem] => {
                let lane = Lane::parse(elem);
                let mut acc = self.load_lane(args[0], 0, lane);
                for index in 1..bytes / lane.size() {
                    let value = self.load_lane(args[0], index, lane);
                    acc = lane_binop(op_for_reduce(op, lane), lane, acc, value);
                }
                Some(acc)
            }
            [op, elem] => {
                let lane = Lane::parse(elem);
                for index in 0..bytes / lane.size() {
                    let a = self.load_lane(args[1], index, lane);
                    let b = self.load_lane(args[2], index, lane);
                    self.store_lane(args[0], index, lane, lane_binop(op, lane, a, b));
                }
                None
            }
            [conv, src_elem, dst_elem] => {
                let src = Lane::parse(src_elem);
                let dst = Lane::parse(dst_elem);
                for index in 0..bytes / src.size() {
                    let value = self.load_lane(args[1], index, src);
                    self.store_lane(args[0], index, dst, convert_lane(conv, src, dst, value));
                }
                None
            }
            _ => panic!("host builtin {name} is not modeled by the test machine"),
        }
    }

    fn load_lane(&self, base: u64, index: u64, lane: Lane) -> u64 {
        let addr = base + index * lane.size();
        match lane {
            Lane::I8 => self.read_u8(addr) as i8 as i32 as u32 as u64,
            Lane::I16 => self.read_u16(addr) as i16 as i32 as u32 as u64,
            Lane::I32 | Lane::F32 => self.read_u32(addr) as u64,
            Lane::I64 | Lane::F64 => self.read_u64(addr),
        }
    }

    fn store_lane(&mut self, base: u64, index: u64, lane: Lane, slot: u64) {
        let addr = base + index * lane.size();
        match lane {
            Lane::I8 => self.write_u8(addr, slot as u8),
            Lane::I16 => self.write_u16(addr, slot as u16),
            Lane::I32 | Lane::F32 => self.write_u32(addr, slot as u32),
            Lane::I64 | Lane::F64 => self.write_u64(addr, slot),
        }
    }

    // =========================================================================
    // Value stack helpers
    // =========================================================================

    fn pop(&mut self) -> u64 {
        self.stack.pop().expect("value stack underflow")
    }

    fn pop_args(&mut self, count: usize) -> Vec<u64> {
        let at = self
            .stack
            .len()
            .checked_sub(count)
            .expect("value stack underflow in call");
        self.stack.split_off(at)
    }

    fn pop_i32(&mut self) -> i32 {
        self.pop() as u32 as i32
    }

    fn pop_f32(&mut self) -> f32 {
        f32::from_bits(self.pop() as u32)
    }

    fn pop_f64(&mut self) -> f64 {
        f64::from_bits(self.pop())
    }

    fn push_i32(&mut self, value: i32) {
        self.stack.push(value as u32 as u64);
    }

    fn push_f32(&mut self, value: f32) {
        self.stack.push(value.to_bits() as u64);
    }

    fn push_f64(&mut self, value: f64) {
        self.stack.push(value.to_bits());
    }

    fn push_pool(&mut self, index: u16) {
        let constant = self
            .target
            .constants
            .get(index)
            .unwrap_or_else(|| panic!("constant {index} out of range"))
            .clone();
        match constant {
            Constant::I32(v) => self.push_i32(v),
            Constant::I64(v) => self.stack.push(v as u64),
            Constant::F32(v) => self.push_f32(v),
            Constant::F64(v) => self.push_f64(v),
            Constant::Bytes(_) => self.stack.push(self.blob_addrs[index as usize]),
        }
    }

    fn bin_i32(&mut self, f: impl Fn(i32, i32) -> i32) {
        let b = self.pop_i32();
        let a = self.pop_i32();
        self.push_i32(f(a, b));
    }

    fn bin_u32(&mut self, f: impl Fn(u32, u32) -> u32) {
        let b = self.pop() as u32;
        let a = self.pop() as u32;
        self.stack.push(f(a, b) as u64);
    }

    fn bin_i64(&mut self, f: impl Fn(i64, i64) -> i64) {
        let b = self.pop() as i64;
        let a = self.pop() as i64;
        self.stack.push(f(a, b) as u64);
    }

    fn bin_u64(&mut self, f: impl Fn(u64, u64) -> u64) {
        let b = self.pop();
        let a = self.pop();
        self.stack.push(f(a, b));
    }

    fn bin_f32(&mut self, f: impl Fn(f32, f32) -> f32) {
        let b = self.pop_f32();
        let a = self.pop_f32();
        self.push_f32(f(a, b));
    }

    fn bin_f64(&mut self, f: impl Fn(f64, f64) -> f64) {
        let b = self.pop_f64();
        let a = self.pop_f64();
        self.push_f64(f(a, b));
    }

    fn cmp_i32(&mut self, f: impl Fn(i32, i32) -> bool) {
        let b = self.pop_i32();
        let a = self.pop_i32();
        self.stack.push(f(a, b) as u64);
    }

    fn cmp_u32(&mut self, f: impl Fn(u32, u32) -> bool) {
        let b = self.pop() as u32;
        let a = self.pop() as u32;
        self.stack.push(f(a, b) as u64);
    }

    fn cmp_i64(&mut self, f: impl Fn(i64, i64) -> bool) {
        let b = self.pop() as i64;
        let a = self.pop() as i64;
        self.stack.push(f(a, b) as u64);
    }

    fn cmp_u64(&mut self, f: impl Fn(u64, u64) -> bool) {
        let b = self.pop();
        let a = self.pop();
        self.stack.push(f(a, b) as u64);
    }

    fn cmp_f32(&mut self, f: impl Fn(f32, f32) -> bool) {
        let b = self.pop_f32();
        let a = self.pop_f32();
        self.stack.push(f(a, b) as u64);
    }

    fn cmp_f64(&mut self, f: impl Fn(f64, f64) -> bool) {
        let b = self.pop_f64();
        let a = self.pop_f64();
        self.stack.push(f(a, b) as u64);
    }

    fn branch_i32(&mut self, code: &[u8], pc: usize, f: impl Fn(i32, i32) -> bool) -> usize {
        let b = self.pop_i32();
        let a = self.pop_i32();
        forward(code, pc, f(a, b))
    }

    fn branch_u32(&mut self, code: &[u8], pc: usize, f: impl Fn(u32, u32) -> bool) -> usize {
        let b = self.pop() as u32;
        let a = self.pop() as u32;
        forward(code, pc, f(a, b))
    }

    fn branch_i64(&mut self, code: &[u8], pc: usize, f: impl Fn(i64, i64) -> bool) -> usize {
        let b = self.pop() as i64;
        let a = self.pop() as i64;
        forward(code, pc, f(a, b))
    }

    fn branch_u64(&mut self, code: &[u8], pc: usize, f: impl Fn(u64, u64) -> bool) -> usize {
        let b = self.pop();
        let a = self.pop();
        forward(code, pc, f(a, b))
    }

    fn branch_f32(&mut self, code: &[u8], pc: usize, f: impl Fn(f32, f32) -> bool) -> usize {
        let b = self.pop_f32();
        let a = self.pop_f32();
        forward(code, pc, f(a, b))
    }

    fn branch_f64(&mut self, code: &[u8], pc: usize, f: impl Fn(f64, f64) -> bool) -> usize {
        let b = self.pop_f64();
        let a = self.pop_f64();
        forward(code, pc, f(a, b))
    }

    // =========================================================================
    // Memory helpers
    // =========================================================================

    fn alloc(&mut self, size: u64, align: u64) -> u64 {
        let align = align.max(1);
        let base = (self.memory.len() as u64).div_ceil(align) * align;
        self.memory.resize((base + size) as usize, 0);
        base
    }

    fn check(&self, addr: u64, len: u64) {
        let end = addr.checked_add(len).unwrap_or(u64::MAX);
        assert!(
            addr >= NULL_GUARD && end <= self.memory.len() as u64,
            "access of {len} bytes at {addr:#x} is outside mapped memory"
        );
    }

    fn slice(&self, addr: u64, len: u64) -> &[u8] {
        if len == 0 {
            return &[];
        }
        self.check(addr, len);
        &self.memory[addr as usize..(addr + len) as usize]
    }

    fn slice_mut(&mut self, addr: u64, len: u64) -> &mut [u8] {
        self.check(addr, len);
        &mut self.memory[addr as usize..(addr + len) as usize]
    }

    fn store_bytes(&mut self, addr: u64, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.slice_mut(addr, bytes.len() as u64).copy_from_slice(bytes);
        }
    }

    fn read_u8(&self, addr: u64) -> u8 {
        self.slice(addr, 1)[0]
    }

    fn read_u16(&self, addr: u64) -> u16 {
        u16::from_le_bytes(self.slice(addr, 2).try_into().expect("u16 read"))
    }

    fn read_u32(&self, addr: u64) -> u32 {
        u32::from_le_bytes(self.slice(addr, 4).try_into().expect("u32 read"))
    }

    fn read_u64(&self, addr: u64) -> u64 {
        u64::from_le_bytes(self.slice(addr, 8).try_into().expect("u64 read"))
    }

    fn write_u8(&mut self, addr: u64, value: u8) {
        self.slice_mut(addr, 1)[0] = value;
    }

    fn write_u16(&mut self, addr: u64, value: u16) {
        self.slice_mut(addr, 2).copy_from_slice(&value.to_le_bytes());
    }

    fn write_u32(&mut self, addr: u64, value: u32) {
        self.slice_mut(addr, 4).copy_from_slice(&value.to_le_bytes());
    }

    fn write_u64(&mut self, addr: u64, value: u64) {
        self.slice_mut(addr, 8).copy_from_slice(&value.to_le_bytes());
    }
}

// =============================================================================
// Operand decoding
// =============================================================================

/// Read a big-endian u16 operand.
fn be16(code: &[u8], at: usize) -> u16 {
    ((code[at] as u16) << 8) | code[at + 1] as u16
}

/// Resolve a forward jump operand at `pc`; distances are measured from the
/// end of the operand.
fn forward(code: &[u8], pc: usize, take: bool) -> usize {
    let next = pc + 2;
    if take {
        next + be16(code, pc) as usize
    } else {
        next
    }
}

// =============================================================================
// Scalar semantics
// =============================================================================

fn nonzero_i32(v: i32) -> i32 {
    assert!(v != 0, "integer division by zero");
    v
}

fn nonzero_u32(v: u32) -> u32 {
    assert!(v != 0, "integer division by zero");
    v
}

fn nonzero_i64(v: i64) -> i64 {
    assert!(v != 0, "integer division by zero");
    v
}

fn nonzero_u64(v: u64) -> u64 {
    assert!(v != 0, "integer division by zero");
    v
}

/// Ordered inequality: false whenever either operand is NaN.
fn ordered_ne_f32(a: f32, b: f32) -> bool {
    !a.is_nan() && !b.is_nan() && a != b
}

fn ordered_ne_f64(a: f64, b: f64) -> bool {
    !a.is_nan() && !b.is_nan() && a != b
}

fn host_math(op: &str, ty: &str, args: &[u64]) -> u64 {
    match ty {
        "f32" => {
            let a = f32::from_bits(args[0] as u32);
            let arg = |i: usize| f32::from_bits(args[i] as u32);
            let result = match op {
                "sqrt" => a.sqrt(),
                "fabs" => a.abs(),
                "ceil" => a.ceil(),
                "floor" => a.floor(),
                "trunc" => a.trunc(),
                "copysign" => a.copysign(arg(1)),
                "fmin" => a.min(arg(1)),
                "fmax" => a.max(arg(1)),
                "fma" => a.mul_add(arg(1), arg(2)),
                other => panic!("math builtin {other}.{ty} is not modeled"),
            };
            result.to_bits() as u64
        }
        "f64" => {
            let a = f64::from_bits(args[0]);
            let arg = |i: usize| f64::from_bits(args[i]);
            let result = match op {
                "sqrt" => a.sqrt(),
                "fabs" => a.abs(),
                "ceil" => a.ceil(),
                "floor" => a.floor(),
                "trunc" => a.trunc(),
                "copysign" => a.copysign(arg(1)),
                "fmin" => a.min(arg(1)),
                "fmax" => a.max(arg(1)),
                "fma" => a.mul_add(arg(1), arg(2)),
                other => panic!("math builtin {other}.{ty} is not modeled"),
            };
            result.to_bits()
        }
        "i32" => {
            let a = args[0] as u32;
            let b = args.get(1).copied().unwrap_or(0) as u32;
            let result = match op {
                "smax" => (a as i32).max(b as i32) as u32,
                "smin" => (a as i32).min(b as i32) as u32,
                "umax" => a.max(b),
                "umin" => a.min(b),
                "abs" => (a as i32).wrapping_abs() as u32,
                other => panic!("math builtin {other}.{ty} is not modeled"),
            };
            result as u64
        }
        "i64" => {
            let a = args[0];
            let b = args.get(1).copied().unwrap_or(0);
            match op {
                "smax" => (a as i64).max(b as i64) as u64,
                "smin" => (a as i64).min(b as i64) as u64,
                "umax" => a.max(b),
                "umin" => a.min(b),
                "abs" => (a as i64).wrapping_abs() as u64,
                other => panic!("math builtin {other}.{ty} is not modeled"),
            }
        }
        other => panic!("math builtin {op}.{other} is not modeled"),
    }
}

// =============================================================================
// Vector lane semantics
// =============================================================================

/// Map a reduction operator to the element-wise operator that folds it.
fn op_for_reduce(op: &str, lane: Lane) -> &'static str {
    match op {
        "add" => "add",
        "mul" => "mul",
        "and" => "and",
        "or" => "or",
        "xor" => "xor",
        "smax" => "smax",
        "smin" => "smin",
        "umax" => "umax",
        "umin" => "umin",
        "fmax" if lane.is_float() => "fmax",
        "fmin" if lane.is_float() => "fmin",
        other => panic!("vector reduction {other} is not modeled"),
    }
}

fn lane_binop(op: &str, lane: Lane, a: u64, b: u64) -> u64 {
    match lane {
        Lane::F32 => {
            let x = f32::from_bits(a as u32);
            let y = f32::from_bits(b as u32);
            let result = match op {
                "fadd" => x + y,
                "fsub" => x - y,
                "fmul" => x * y,
                "fdiv" => x / y,
                "fmax" => x.max(y),
                "fmin" => x.min(y),
                other => panic!("vector op {other} on f32 lanes is not modeled"),
            };
            result.to_bits() as u64
        }
        Lane::F64 => {
            let x = f64::from_bits(a);
            let y = f64::from_bits(b);
            let result = match op {
                "fadd" => x + y,
                "fsub" => x - y,
                "fmul" => x * y,
                "fdiv" => x / y,
                "fmax" => x.max(y),
                "fmin" => x.min(y),
                other => panic!("vector op {other} on f64 lanes is not modeled"),
            };
            result.to_bits()
        }
        Lane::I64 => {
            let x = a as i64;
            let y = b as i64;
            let result = match op {
                "add" => x.wrapping_add(y),
                "sub" => x.wrapping_sub(y),
                "mul" => x.wrapping_mul(y),
                "sdiv" => x.wrapping_div(nonzero_i64(y)),
                "udiv" => return a / nonzero_u64(b),
                "and" => x & y,
                "or" => x | y,
                "xor" => x ^ y,
                "smax" => x.max(y),
                "smin" => x.min(y),
                "umax" => return a.max(b),
                "umin" => return a.min(b),
                other => panic!("vector op {other} on i64 lanes is not modeled"),
            };
            result as u64
        }
        // Narrow lanes compute in 32 bits; the store truncates.
        _ => {
            let x = a as u32 as i32;
            let y = b as u32 as i32;
            let result = match op {
                "add" => x.wrapping_add(y),
                "sub" => x.wrapping_sub(y),
                "mul" => x.wrapping_mul(y),
                "sdiv" => x.wrapping_div(nonzero_i32(y)),
                "udiv" => ((x as u32) / nonzero_u32(y as u32)) as i32,
                "and" => x & y,
                "or" => x | y,
                "xor" => x ^ y,
                "smax" => x.max(y),
                "smin" => x.min(y),
                "umax" => (x as u32).max(y as u32) as i32,
                "umin" => (x as u32).min(y as u32) as i32,
                other => panic!("vector op {other} on integer lanes is not modeled"),
            };
            result as u32 as u64
        }
    }
}

fn shift_lane(op: &str, lane: Lane, value: u64, amount: u32) -> u64 {
    let mask = (lane.size() * 8 - 1) as u32;
    let amount = amount & mask;
    match lane {
        Lane::I64 => match op {
            "shl" => value.wrapping_shl(amount),
            "ashr" => ((value as i64).wrapping_shr(amount)) as u64,
            "lshr" => value.wrapping_shr(amount),
            other => panic!("vector shift {other} is not modeled"),
        },
        _ => {
            let wide = lane.size() as u32 * 8;
            let keep = if wide == 32 { u32::MAX } else { (1 << wide) - 1 };
            let v = value as u32 & keep;
            let shifted = match op {
                "shl" => v.wrapping_shl(amount),
                // Arithmetic shifts sign-extend from the lane's own width.
                "ashr" => {
                    let sext = ((v << (32 - wide)) as i32) >> (32 - wide);
                    (sext >> amount) as u32
                }
                "lshr" => v.wrapping_shr(amount),
                other => panic!("vector shift {other} is not modeled"),
            };
            (shifted & keep) as u64
        }
    }
}

fn convert_lane(op: &str, src: Lane, dst: Lane, value: u64) -> u64 {
    let as_signed = || match src {
        Lane::I8 => value as u32 as i32 as i64,
        Lane::I16 => value as u32 as i32 as i64,
        Lane::I32 => value as u32 as i32 as i64,
        Lane::I64 => value as i64,
        _ => panic!("integer source expected for {op}"),
    };
    let as_unsigned = || match src {
        Lane::I8 => value as u8 as u64,
        Lane::I16 => value as u16 as u64,
        Lane::I32 => value as u32 as u64,
        Lane::I64 => value,
        _ => panic!("integer source expected for {op}"),
    };
    let as_float = || match src {
        Lane::F32 => f32::from_bits(value as u32) as f64,
        Lane::F64 => f64::from_bits(value),
        _ => panic!("float source expected for {op}"),
    };
    let to_float = |v: f64| match dst {
        Lane::F32 => (v as f32).to_bits() as u64,
        Lane::F64 => v.to_bits(),
        _ => panic!("float destination expected for {op}"),
    };
    let to_int = |v: i64| match dst {
        Lane::I8 => v as u8 as u64,
        Lane::I16 => v as u16 as u64,
        Lane::I32 => v as u32 as u64,
        Lane::I64 => v as u64,
        _ => panic!("integer destination expected for {op}"),
    };
    match op {
        "sitofp" => to_float(as_signed() as f64),
        "uitofp" => to_float(as_unsigned() as f64),
        "fptosi" => to_int(as_float() as i64),
        "fptoui" => to_int(as_float() as u64 as i64),
        "sext" => to_int(as_signed()),
        "zext" => to_int(as_unsigned() as i64),
        "trunc" => to_int(as_unsigned() as i64),
        "fpext" | "fptrunc" => to_float(as_float()),
        other => panic!("vector conversion {other} is not modeled"),
    }
}
