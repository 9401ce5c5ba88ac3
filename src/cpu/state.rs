/*!
state.rs - The evaluator's architectural state: two 256-byte stacks.

Overview
========
The CPU has no registers beyond its program counter (which lives on the
Rust call stack of each `run` invocation) and two independent byte stacks:

  * the working stack, used for computation
  * the return stack, used for return addresses

Either may be "active" for a given instruction. Each stack is exactly 256
bytes addressed by an 8-bit pointer. Push and pop wrap the pointer modulo
256; overflow and underflow are silent. There is no depth check anywhere,
and nothing here should add one.

Word Layout
===========
16-bit values are stored big-endian: the high byte is pushed first, so the
top-of-stack byte is the low byte.
*/

/// Size of each stack in bytes.
pub const STACK_SIZE: usize = 0x100;

/// Selects one of the two stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackId {
    Working = 0,
    Return = 1,
}

impl StackId {
    /// The stack that is not `self` (target of JSR / STH).
    #[inline]
    pub fn other(self) -> Self {
        match self {
            StackId::Working => StackId::Return,
            StackId::Return => StackId::Working,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One 256-byte stack with a wrapping 8-bit pointer.
#[derive(Clone)]
pub struct Stack {
    data: [u8; STACK_SIZE],
    ptr: u8,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("ptr", &self.ptr)
            .field("top", &self.window(8))
            .finish()
    }
}

impl Stack {
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; STACK_SIZE],
            ptr: 0,
        }
    }

    #[inline]
    pub fn ptr(&self) -> u8 {
        self.ptr
    }

    #[inline]
    pub fn set_ptr(&mut self, ptr: u8) {
        self.ptr = ptr;
    }

    #[inline]
    pub fn push(&mut self, v: u8) {
        self.data[self.ptr as usize] = v;
        self.ptr = self.ptr.wrapping_add(1);
    }

    #[inline]
    pub fn pop(&mut self) -> u8 {
        self.ptr = self.ptr.wrapping_sub(1);
        self.data[self.ptr as usize]
    }

    /// Push a big-endian word (high byte first).
    #[inline]
    pub fn push_word(&mut self, v: u16) {
        self.push((v >> 8) as u8);
        self.push(v as u8);
    }

    /// Pop a big-endian word (low byte comes off first).
    #[inline]
    pub fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }

    /// Byte `depth` below the pointer (0 = top of stack), without popping.
    #[inline]
    pub fn peek(&self, depth: u8) -> u8 {
        self.data[self.ptr.wrapping_sub(depth).wrapping_sub(1) as usize]
    }

    /// Raw cell access by absolute index.
    #[inline]
    pub fn get(&self, index: u8) -> u8 {
        self.data[index as usize]
    }

    #[inline]
    pub fn set(&mut self, index: u8, v: u8) {
        self.data[index as usize] = v;
    }

    /// The `n` bytes just below the pointer, oldest first (wrapping).
    pub fn window(&self, n: u8) -> Vec<u8> {
        let start = self.ptr.wrapping_sub(n);
        (0..n).map(|i| self.data[start.wrapping_add(i) as usize]).collect()
    }
}

/// Both stacks, indexable by `StackId`.
#[derive(Debug, Clone, Default)]
pub struct Stacks {
    stacks: [Stack; 2],
}

impl Stacks {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: StackId) -> &Stack {
        &self.stacks[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: StackId) -> &mut Stack {
        &mut self.stacks[id.index()]
    }

    #[inline]
    pub fn working(&self) -> &Stack {
        self.get(StackId::Working)
    }

    #[inline]
    pub fn ret(&self) -> &Stack {
        self.get(StackId::Return)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_wraps() {
        let mut s = Stack::new();
        assert_eq!(s.pop(), 0);
        assert_eq!(s.ptr(), 0xFF);
        s.push(0x42);
        assert_eq!(s.ptr(), 0x00);
        assert_eq!(s.get(0xFF), 0x42);
    }

    #[test]
    fn words_are_big_endian() {
        let mut s = Stack::new();
        s.push_word(0x1234);
        assert_eq!(s.get(0), 0x12);
        assert_eq!(s.get(1), 0x34);
        assert_eq!(s.peek(0), 0x34);
        assert_eq!(s.pop_word(), 0x1234);
        assert_eq!(s.ptr(), 0);
    }

    #[test]
    fn window_reads_below_pointer() {
        let mut s = Stack::new();
        for v in 1..=3 {
            s.push(v);
        }
        assert_eq!(s.window(3), vec![1, 2, 3]);
    }

    #[test]
    fn other_stack() {
        assert_eq!(StackId::Working.other(), StackId::Return);
        assert_eq!(StackId::Return.other(), StackId::Working);
    }

    proptest::proptest! {
        #[test]
        fn pointer_tracks_pushes_minus_pops(start in 0u8.., ops in proptest::collection::vec(proptest::bool::ANY, 0..600)) {
            let mut s = Stack::new();
            s.set_ptr(start);
            let mut expected = start;
            for push in ops {
                if push {
                    s.push(0xAA);
                    expected = expected.wrapping_add(1);
                } else {
                    s.pop();
                    expected = expected.wrapping_sub(1);
                }
                proptest::prop_assert_eq!(s.ptr(), expected);
            }
        }

        #[test]
        fn full_cycle_of_pushes_returns_pointer(start in 0u8..) {
            let mut s = Stack::new();
            s.set_ptr(start);
            for i in 0..=255u8 {
                s.push(i);
            }
            proptest::prop_assert_eq!(s.ptr(), start);
        }
    }
}
