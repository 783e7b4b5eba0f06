#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct MemoryRequirements {
    memory_type_bits: u32,
    size: u64,
    alignment: u64,
}

impl From<ash::vk::MemoryRequirements> for MemoryRequirements {
    fn from(value: ash::vk::MemoryRequirements) -> Self {
        Self::new(value.memory_type_bits, value.size, value.alignment)
    }
}

impl MemoryRequirements {
    pub fn new(memory_type_bits: u32, size: u64, alignment: u64) -> Self {
        Self {
            memory_type_bits,
            size,
            alignment,
        }
    }

    /// Bit `i` is set when memory type `i` can back the resource.
    pub fn memory_type_bits(&self) -> u32 {
        self.memory_type_bits
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    pub fn allows_memory_type(&self, memory_type_index: u32) -> bool {
        memory_type_index < u32::BITS && (self.memory_type_bits & (1u32 << memory_type_index)) != 0
    }
}

pub trait MemoryRequiring {
    /// Size and alignment the platform needs, which may exceed the requested size.
    fn memory_requirements(&self) -> MemoryRequirements;
}
