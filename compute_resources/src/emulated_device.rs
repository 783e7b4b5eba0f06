use std::{collections::HashMap, ffi::c_void, sync::Arc};

#[cfg(feature = "better_mutex")]
use parking_lot::{const_mutex, Mutex, MutexGuard};

#[cfg(not(feature = "better_mutex"))]
use std::sync::{Mutex, MutexGuard};

use ash::{prelude::VkResult, vk::Handle};

use crate::{device::DeviceDispatch, utils::aligned_size_u64};

/// Shape of an [`EmulatedDevice`].
#[derive(Debug, Clone)]
pub struct EmulatedDeviceDescriptor {
    memory_types: Vec<ash::vk::MemoryPropertyFlags>,
    heap_size: u64,
    max_allocations: u32,
    buffer_alignment: u64,
}

impl Default for EmulatedDeviceDescriptor {
    /// A device-local type followed by a host-visible coherent one, a 256MiB
    /// heap, 4096 allocations and 256 bytes buffer alignment.
    fn default() -> Self {
        Self::new(
            &[
                ash::vk::MemoryPropertyFlags::DEVICE_LOCAL,
                ash::vk::MemoryPropertyFlags::HOST_VISIBLE
                    | ash::vk::MemoryPropertyFlags::HOST_COHERENT,
            ],
            256 * 1024 * 1024,
            4096,
            256,
        )
    }
}

impl EmulatedDeviceDescriptor {
    pub fn new(
        memory_types: &[ash::vk::MemoryPropertyFlags],
        heap_size: u64,
        max_allocations: u32,
        buffer_alignment: u64,
    ) -> Self {
        assert!(memory_types.len() <= ash::vk::MAX_MEMORY_TYPES);
        assert!(buffer_alignment.is_power_of_two());

        Self {
            memory_types: memory_types.to_vec(),
            heap_size,
            max_allocations,
            buffer_alignment,
        }
    }

    pub fn memory_types(&self) -> &[ash::vk::MemoryPropertyFlags] {
        self.memory_types.as_slice()
    }

    pub fn heap_size(&self) -> u64 {
        self.heap_size
    }

    pub fn max_allocations(&self) -> u32 {
        self.max_allocations
    }

    pub fn buffer_alignment(&self) -> u64 {
        self.buffer_alignment
    }
}

struct EmulatedAllocation {
    memory_type_index: u32,
    data: Box<[u8]>,
    mapped: bool,
    bindings: u32,
}

struct EmulatedBuffer {
    size: u64,
    bound_memory: Option<u64>,
}

#[derive(Default)]
struct EmulatedState {
    next_handle: u64,
    allocated_bytes: u64,
    allocations: HashMap<u64, EmulatedAllocation>,
    buffers: HashMap<u64, EmulatedBuffer>,
}

impl EmulatedState {
    fn take_handle(&mut self) -> u64 {
        // zero is VK_NULL_HANDLE
        self.next_handle += 1;
        self.next_handle
    }
}

/// A logical device backed by host memory.
///
/// Every allocation is a zero-initialized host byte array, so each memory
/// type behaves as host-addressable storage; mapping still honours the
/// reported `HOST_VISIBLE` flag. Cloning yields another handle to the same
/// device, which lets callers inspect live objects after handing the device
/// over to [`crate::device::Device`].
#[derive(Clone)]
pub struct EmulatedDevice {
    descriptor: Arc<EmulatedDeviceDescriptor>,
    state: Arc<Mutex<EmulatedState>>,
}

impl EmulatedDevice {
    pub fn new(descriptor: EmulatedDeviceDescriptor) -> Self {
        #[cfg(feature = "better_mutex")]
        {
            Self {
                descriptor: Arc::new(descriptor),
                state: Arc::new(const_mutex(EmulatedState::default())),
            }
        }

        #[cfg(not(feature = "better_mutex"))]
        {
            Self {
                descriptor: Arc::new(descriptor),
                state: Arc::new(Mutex::new(EmulatedState::default())),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, EmulatedState> {
        #[cfg(feature = "better_mutex")]
        {
            self.state.lock()
        }

        #[cfg(not(feature = "better_mutex"))]
        {
            match self.state.lock() {
                Ok(lck) => lck,
                Err(poisoned) => poisoned.into_inner(),
            }
        }
    }

    pub fn descriptor(&self) -> &EmulatedDeviceDescriptor {
        self.descriptor.as_ref()
    }

    pub fn live_allocations(&self) -> usize {
        self.lock().allocations.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.lock().buffers.len()
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.lock().allocated_bytes
    }
}

impl DeviceDispatch for EmulatedDevice {
    fn native_handle(&self) -> u64 {
        Arc::as_ptr(&self.state) as u64
    }

    fn memory_properties(&self) -> ash::vk::PhysicalDeviceMemoryProperties {
        let mut properties = ash::vk::PhysicalDeviceMemoryProperties {
            memory_type_count: self.descriptor.memory_types.len() as u32,
            memory_heap_count: 1,
            ..Default::default()
        };

        properties.memory_heaps[0] = ash::vk::MemoryHeap {
            size: self.descriptor.heap_size,
            flags: ash::vk::MemoryHeapFlags::DEVICE_LOCAL,
        };

        for (index, flags) in self.descriptor.memory_types.iter().enumerate() {
            properties.memory_types[index] = ash::vk::MemoryType {
                property_flags: *flags,
                heap_index: 0,
            };
        }

        properties
    }

    fn allocate_memory(
        &self,
        size: ash::vk::DeviceSize,
        memory_type_index: u32,
    ) -> VkResult<ash::vk::DeviceMemory> {
        if memory_type_index as usize >= self.descriptor.memory_types.len() {
            return Err(ash::vk::Result::ERROR_VALIDATION_FAILED_EXT);
        }

        let mut state = self.lock();

        if state.allocations.len() >= self.descriptor.max_allocations as usize {
            return Err(ash::vk::Result::ERROR_TOO_MANY_OBJECTS);
        }

        if state.allocated_bytes.saturating_add(size) > self.descriptor.heap_size {
            return Err(ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }

        let len = usize::try_from(size).map_err(|_| ash::vk::Result::ERROR_OUT_OF_HOST_MEMORY)?;

        let handle = state.take_handle();
        state.allocated_bytes += size;
        state.allocations.insert(
            handle,
            EmulatedAllocation {
                memory_type_index,
                data: vec![0u8; len].into_boxed_slice(),
                mapped: false,
                bindings: 0,
            },
        );

        Ok(ash::vk::DeviceMemory::from_raw(handle))
    }

    fn free_memory(&self, memory: ash::vk::DeviceMemory) {
        let mut state = self.lock();

        match state.allocations.remove(&memory.as_raw()) {
            Some(allocation) => {
                if allocation.mapped {
                    log::warn!("Emulated memory {:#x} freed while mapped", memory.as_raw());
                }

                if allocation.bindings > 0 {
                    log::warn!(
                        "Emulated memory {:#x} freed while {} buffer(s) are bound to it",
                        memory.as_raw(),
                        allocation.bindings
                    );
                }

                state.allocated_bytes -= allocation.data.len() as u64;
            }
            None => log::warn!("Emulated memory {:#x} is not a live allocation", memory.as_raw()),
        }
    }

    fn map_memory(
        &self,
        memory: ash::vk::DeviceMemory,
        offset: ash::vk::DeviceSize,
        size: ash::vk::DeviceSize,
    ) -> VkResult<*mut c_void> {
        let mut state = self.lock();

        let Some(allocation) = state.allocations.get_mut(&memory.as_raw()) else {
            return Err(ash::vk::Result::ERROR_MEMORY_MAP_FAILED);
        };

        let flags = self.descriptor.memory_types[allocation.memory_type_index as usize];
        if !flags.contains(ash::vk::MemoryPropertyFlags::HOST_VISIBLE) {
            return Err(ash::vk::Result::ERROR_MEMORY_MAP_FAILED);
        }

        let len = allocation.data.len() as u64;
        let size = match size == ash::vk::WHOLE_SIZE {
            true => len.saturating_sub(offset),
            false => size,
        };

        if allocation.mapped || size == 0 || offset.saturating_add(size) > len {
            return Err(ash::vk::Result::ERROR_MEMORY_MAP_FAILED);
        }

        allocation.mapped = true;

        Ok(unsafe { allocation.data.as_mut_ptr().add(offset as usize) } as *mut c_void)
    }

    fn unmap_memory(&self, memory: ash::vk::DeviceMemory) {
        let mut state = self.lock();

        match state.allocations.get_mut(&memory.as_raw()) {
            Some(allocation) if allocation.mapped => allocation.mapped = false,
            _ => log::warn!("Emulated memory {:#x} is not mapped", memory.as_raw()),
        }
    }

    fn create_buffer(
        &self,
        size: ash::vk::DeviceSize,
        usage: ash::vk::BufferUsageFlags,
        sharing_mode: ash::vk::SharingMode,
        queue_family_indices: &[u32],
    ) -> VkResult<ash::vk::Buffer> {
        if size == 0 || usage.is_empty() {
            return Err(ash::vk::Result::ERROR_VALIDATION_FAILED_EXT);
        }

        if sharing_mode == ash::vk::SharingMode::CONCURRENT && queue_family_indices.len() < 2 {
            return Err(ash::vk::Result::ERROR_VALIDATION_FAILED_EXT);
        }

        // no allocation on this device could ever back the buffer
        match aligned_size_u64(size, self.descriptor.buffer_alignment) {
            Some(required) if required <= self.descriptor.heap_size => {}
            _ => return Err(ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
        }

        let mut state = self.lock();
        let handle = state.take_handle();
        state.buffers.insert(
            handle,
            EmulatedBuffer {
                size,
                bound_memory: None,
            },
        );

        Ok(ash::vk::Buffer::from_raw(handle))
    }

    fn destroy_buffer(&self, buffer: ash::vk::Buffer) {
        let mut state = self.lock();

        let Some(destroyed) = state.buffers.remove(&buffer.as_raw()) else {
            log::warn!("Emulated buffer {:#x} is not a live buffer", buffer.as_raw());
            return;
        };

        if let Some(memory) = destroyed.bound_memory {
            if let Some(allocation) = state.allocations.get_mut(&memory) {
                allocation.bindings -= 1;
            }
        }
    }

    fn get_buffer_memory_requirements(
        &self,
        buffer: ash::vk::Buffer,
    ) -> ash::vk::MemoryRequirements {
        let state = self.lock();

        let size = state
            .buffers
            .get(&buffer.as_raw())
            .map(|buffer| buffer.size)
            .unwrap_or_default();

        ash::vk::MemoryRequirements {
            size: aligned_size_u64(size, self.descriptor.buffer_alignment).unwrap_or(size),
            alignment: self.descriptor.buffer_alignment,
            memory_type_bits: match self.descriptor.memory_types.len() {
                32 => u32::MAX,
                count => (1u32 << count) - 1,
            },
        }
    }

    fn bind_buffer_memory(
        &self,
        buffer: ash::vk::Buffer,
        memory: ash::vk::DeviceMemory,
        offset: ash::vk::DeviceSize,
    ) -> VkResult<()> {
        let mut state = self.lock();

        let memory_len = match state.allocations.get(&memory.as_raw()) {
            Some(allocation) => allocation.data.len() as u64,
            None => return Err(ash::vk::Result::ERROR_VALIDATION_FAILED_EXT),
        };

        let Some(target) = state.buffers.get_mut(&buffer.as_raw()) else {
            return Err(ash::vk::Result::ERROR_VALIDATION_FAILED_EXT);
        };

        let required_size =
            aligned_size_u64(target.size, self.descriptor.buffer_alignment).unwrap_or(u64::MAX);

        if target.bound_memory.is_some()
            || offset % self.descriptor.buffer_alignment != 0
            || offset.saturating_add(required_size) > memory_len
        {
            return Err(ash::vk::Result::ERROR_VALIDATION_FAILED_EXT);
        }

        target.bound_memory = Some(memory.as_raw());

        if let Some(allocation) = state.allocations.get_mut(&memory.as_raw()) {
            allocation.bindings += 1;
        }

        Ok(())
    }
}
