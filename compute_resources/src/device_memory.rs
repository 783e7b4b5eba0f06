use std::{
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    device::{Device, DeviceOwned},
    prelude::{BindingConflict, FrameworkError, VulkanError, VulkanResult},
};

/// One native allocation of device memory.
///
/// The allocation is freed when the last `Arc` goes away. Resources bound to
/// it keep it alive, and a [`MappedMemory`] borrows it, so neither can outlive
/// the allocation.
pub struct DeviceMemory {
    device: Arc<Device>,
    memory_type_index: u32,
    size: u64,
    memory: ash::vk::DeviceMemory,
    bound: AtomicBool,
    mapped: AtomicBool,
    debug_name: Option<String>,
}

impl Drop for DeviceMemory {
    fn drop(&mut self) {
        log::debug!(
            "Freeing device memory {} ({} bytes)",
            self.debug_name.as_deref().unwrap_or("<unnamed>"),
            self.size
        );

        self.device.dispatch().free_memory(self.memory)
    }
}

impl DeviceOwned for DeviceMemory {
    fn get_parent_device(&self) -> Arc<Device> {
        self.device.clone()
    }
}

impl DeviceMemory {
    pub(crate) fn ash_handle(&self) -> ash::vk::DeviceMemory {
        self.memory
    }

    pub fn native_handle(&self) -> u64 {
        ash::vk::Handle::as_raw(self.memory)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn memory_type_index(&self) -> u32 {
        self.memory_type_index
    }

    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }

    /// Whether a resource currently holds the (single) binding to this memory.
    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.load(Ordering::Acquire)
    }

    pub fn allocate(
        device: Arc<Device>,
        memory_type_index: u32,
        size: u64,
        debug_name: Option<&str>,
    ) -> VulkanResult<Arc<Self>> {
        if size == 0 {
            return Err(VulkanError::Framework(FrameworkError::UserInput(Some(
                "device memory cannot have a size of zero bytes".to_string(),
            ))));
        }

        if memory_type_index >= device.memory_type_count() {
            return Err(VulkanError::Framework(FrameworkError::UserInput(Some(
                format!(
                    "memory type {} does not exist, the device has {} memory types",
                    memory_type_index,
                    device.memory_type_count()
                ),
            ))));
        }

        let memory = device
            .dispatch()
            .allocate_memory(size, memory_type_index)
            .map_err(|err| {
                log::warn!(
                    "Allocation of {} bytes from memory type {} failed: {}",
                    size,
                    memory_type_index,
                    err
                );
                VulkanError::from_allocation_result(err)
            })?;

        log::debug!(
            "Allocated device memory {} ({} bytes, memory type {})",
            debug_name.unwrap_or("<unnamed>"),
            size,
            memory_type_index
        );

        Ok(Arc::new(Self {
            device,
            memory_type_index,
            size,
            memory,
            bound: AtomicBool::new(false),
            mapped: AtomicBool::new(false),
            debug_name: debug_name.map(String::from),
        }))
    }

    /// Frees the allocation now if nothing else references it.
    ///
    /// Returns the memory back when a bound resource still holds it.
    pub fn release(self: Arc<Self>) -> Result<(), Arc<Self>> {
        Arc::try_unwrap(self).map(drop)
    }

    pub(crate) fn acquire_binding(&self) -> VulkanResult<()> {
        self.bound
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| VulkanError::Framework(FrameworkError::AlreadyBound(BindingConflict::Memory)))
    }

    pub(crate) fn release_binding(&self) {
        self.bound.store(false, Ordering::Release)
    }

    /// Maps the whole allocation.
    pub fn scoped_map(&self) -> VulkanResult<MappedMemory<'_>> {
        self.scoped_map_range(0, self.size)
    }

    /// Maps `[offset, offset + length)` until the returned guard is dropped.
    pub fn scoped_map_range(&self, offset: u64, length: u64) -> VulkanResult<MappedMemory<'_>> {
        let host_visible = self
            .device
            .memory_type_flags(self.memory_type_index)
            .is_some_and(|flags| flags.contains(ash::vk::MemoryPropertyFlags::HOST_VISIBLE));

        if !host_visible {
            return Err(VulkanError::Framework(FrameworkError::MappingFailed(format!(
                "memory type {} is not host-visible",
                self.memory_type_index
            ))));
        }

        if length == 0 || offset.checked_add(length).map_or(true, |end| end > self.size) {
            return Err(VulkanError::Framework(FrameworkError::MappingFailed(format!(
                "range [{}, {}+{}) is outside of an allocation of {} bytes",
                offset, offset, length, self.size
            ))));
        }

        let len = usize::try_from(length).map_err(|_| {
            VulkanError::Framework(FrameworkError::MappingFailed(format!(
                "{length} bytes cannot be addressed by the host"
            )))
        })?;

        if self
            .mapped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VulkanError::Framework(FrameworkError::MappingFailed(
                "memory is already mapped".to_string(),
            )));
        }

        let ptr = match self
            .device
            .dispatch()
            .map_memory(self.memory, offset, length)
        {
            Ok(ptr) => ptr as *mut u8,
            Err(err) => {
                self.mapped.store(false, Ordering::Release);

                log::warn!("Mapping of device memory failed: {}", err);

                return Err(match err {
                    ash::vk::Result::ERROR_MEMORY_MAP_FAILED => VulkanError::Framework(
                        FrameworkError::MappingFailed(format!("native mapping failed: {err}")),
                    ),
                    ash::vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                        VulkanError::Framework(FrameworkError::OutOfHostMemory)
                    }
                    ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                        VulkanError::Framework(FrameworkError::OutOfDeviceMemory)
                    }
                    err => VulkanError::Vulkan(
                        err.as_raw(),
                        Some(format!("Error mapping device memory: {err}")),
                    ),
                });
            }
        };

        Ok(MappedMemory {
            memory: self,
            ptr,
            len,
        })
    }
}

/// Host window onto a [`DeviceMemory`]; unmapped on drop.
pub struct MappedMemory<'memory> {
    memory: &'memory DeviceMemory,
    ptr: *mut u8,
    len: usize,
}

impl Drop for MappedMemory<'_> {
    fn drop(&mut self) {
        self.memory.device.dispatch().unmap_memory(self.memory.memory);
        self.memory.mapped.store(false, Ordering::Release);
    }
}

impl Deref for MappedMemory<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: the mapping covers `len` bytes and lives until drop
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl DerefMut for MappedMemory<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: the mapped flag makes this the only window onto the memory
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}
