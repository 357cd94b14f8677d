//! Name supply
//!
//! Monotonic counters for registers, string constants and the three block
//! kinds. Counters start at 1 and are never reset or reused within one
//! compilation, so every emitted name is unique in the module.

use crate::types::Type;
use crate::value::Value;

#[derive(Debug)]
pub struct NameSupply {
    register: u32,
    string: u32,
    if_block: u32,
    else_block: u32,
    loop_block: u32,
}

impl Default for NameSupply {
    fn default() -> Self {
        Self {
            register: 1,
            string: 1,
            if_block: 1,
            else_block: 1,
            loop_block: 1,
        }
    }
}

fn bump(counter: &mut u32) -> u32 {
    let current = *counter;
    *counter += 1;
    current
}

impl NameSupply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_register_id(&mut self) -> u32 {
        bump(&mut self.register)
    }

    /// A fresh register of the given type, rendered `%.<n>`
    pub fn register(&mut self, ty: Type) -> Value {
        let id = self.next_register_id();
        Value::local(format!(".{}", id), ty)
    }

    pub fn next_string(&mut self) -> u32 {
        bump(&mut self.string)
    }

    pub fn next_if(&mut self) -> u32 {
        bump(&mut self.if_block)
    }

    pub fn next_else(&mut self) -> u32 {
        bump(&mut self.else_block)
    }

    pub fn next_loop(&mut self) -> u32 {
        bump(&mut self.loop_block)
    }
}
