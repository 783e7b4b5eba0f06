use std::sync::Arc;

use crate::{
    descriptor_write::WriteDescriptor,
    device::DeviceOwned,
    device_memory::DeviceMemory,
    prelude::{BindingConflict, FrameworkError, VulkanError, VulkanResult},
    shader_layout_binding::{BindingDescriptor, DescriptorType},
};

/// A GPU resource that has to be bound to exactly one [`DeviceMemory`] before use.
pub trait MemoryResource: DeviceOwned {
    /// Declared size in bytes.
    fn size(&self) -> u64;

    fn memory(&self) -> Option<Arc<DeviceMemory>>;

    /// Offset inside [`MemoryResource::memory`] at which the resource starts.
    fn memory_offset(&self) -> Option<u64>;

    fn is_bound(&self) -> bool {
        self.memory().is_some()
    }

    /// Binds the resource to `memory` at `offset`. Binding is write-once.
    fn bind_memory(&mut self, memory: Arc<DeviceMemory>, offset: u64) -> VulkanResult<()>;

    fn descriptor_type(&self) -> VulkanResult<DescriptorType>;

    fn descriptor_set_layout(&self, binding: u32) -> VulkanResult<BindingDescriptor>;

    fn write_descriptor_set(
        &self,
        descriptor_set: ash::vk::DescriptorSet,
        binding: u32,
    ) -> VulkanResult<WriteDescriptor>;
}

/// Binding bookkeeping shared by every [`MemoryResource`].
///
/// Only records the binding: the native bind call is up to the resource.
/// Dropping it gives the memory's binding back.
#[derive(Default)]
pub struct MemoryBinding {
    memory: Option<Arc<DeviceMemory>>,
    offset: u64,
}

impl Drop for MemoryBinding {
    fn drop(&mut self) {
        if let Some(memory) = self.memory.take() {
            memory.release_binding()
        }
    }
}

impl MemoryBinding {
    pub fn memory(&self) -> Option<&Arc<DeviceMemory>> {
        self.memory.as_ref()
    }

    pub fn offset(&self) -> Option<u64> {
        self.memory.as_ref().map(|_| self.offset)
    }

    pub fn bind(&mut self, memory: Arc<DeviceMemory>, offset: u64) -> VulkanResult<()> {
        if self.memory.is_some() {
            return Err(VulkanError::Framework(FrameworkError::AlreadyBound(
                BindingConflict::Resource,
            )));
        }

        memory.acquire_binding()?;

        self.memory = Some(memory);
        self.offset = offset;

        Ok(())
    }

    /// Undoes a [`MemoryBinding::bind`] whose native counterpart failed.
    pub(crate) fn rollback(&mut self) {
        if let Some(memory) = self.memory.take() {
            memory.release_binding();
        }

        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{device::Device, emulated_device::EmulatedDeviceDescriptor};

    fn memory(device: &Arc<Device>) -> Arc<DeviceMemory> {
        DeviceMemory::allocate(device.clone(), 1, 1024, None).unwrap()
    }

    #[test]
    fn records_binding_and_offset() {
        let device = Device::emulated(EmulatedDeviceDescriptor::default(), None);
        let memory = memory(&device);

        let mut binding = MemoryBinding::default();
        assert_eq!(binding.offset(), None);

        binding.bind(memory.clone(), 256).unwrap();
        assert!(Arc::ptr_eq(binding.memory().unwrap(), &memory));
        assert_eq!(binding.offset(), Some(256));
        assert!(memory.is_bound());
    }

    #[test]
    fn binding_is_write_once() {
        let device = Device::emulated(EmulatedDeviceDescriptor::default(), None);
        let first = memory(&device);
        let second = memory(&device);

        let mut binding = MemoryBinding::default();
        binding.bind(first, 0).unwrap();

        assert_eq!(
            binding.bind(second.clone(), 0),
            Err(VulkanError::Framework(FrameworkError::AlreadyBound(
                BindingConflict::Resource
            )))
        );
        assert!(!second.is_bound());
    }

    #[test]
    fn memory_is_exclusive() {
        let device = Device::emulated(EmulatedDeviceDescriptor::default(), None);
        let memory = memory(&device);

        let mut a = MemoryBinding::default();
        let mut b = MemoryBinding::default();
        a.bind(memory.clone(), 0).unwrap();

        assert_eq!(
            b.bind(memory.clone(), 0),
            Err(VulkanError::Framework(FrameworkError::AlreadyBound(
                BindingConflict::Memory
            )))
        );
        assert_eq!(b.offset(), None);

        drop(a);
        assert!(!memory.is_bound());
        assert!(b.bind(memory, 0).is_ok());
    }

    #[test]
    fn rollback_frees_both_sides() {
        let device = Device::emulated(EmulatedDeviceDescriptor::default(), None);
        let memory = memory(&device);

        let mut binding = MemoryBinding::default();
        binding.bind(memory.clone(), 0).unwrap();
        binding.rollback();

        assert!(binding.memory().is_none());
        assert!(!memory.is_bound());
        assert!(binding.bind(memory, 0).is_ok());
    }
}
