use std::{ffi::c_void, sync::Arc};

use ash::prelude::VkResult;

use crate::emulated_device::{EmulatedDevice, EmulatedDeviceDescriptor};

pub trait DeviceOwned {
    fn get_parent_device(&self) -> Arc<Device>;
}

/// The native calls the memory subsystem needs from a logical device.
///
/// Handles passed in must have been created by the same implementation.
pub trait DeviceDispatch: Send + Sync {
    fn native_handle(&self) -> u64;

    fn memory_properties(&self) -> ash::vk::PhysicalDeviceMemoryProperties;

    fn allocate_memory(
        &self,
        size: ash::vk::DeviceSize,
        memory_type_index: u32,
    ) -> VkResult<ash::vk::DeviceMemory>;

    fn free_memory(&self, memory: ash::vk::DeviceMemory);

    fn map_memory(
        &self,
        memory: ash::vk::DeviceMemory,
        offset: ash::vk::DeviceSize,
        size: ash::vk::DeviceSize,
    ) -> VkResult<*mut c_void>;

    fn unmap_memory(&self, memory: ash::vk::DeviceMemory);

    fn create_buffer(
        &self,
        size: ash::vk::DeviceSize,
        usage: ash::vk::BufferUsageFlags,
        sharing_mode: ash::vk::SharingMode,
        queue_family_indices: &[u32],
    ) -> VkResult<ash::vk::Buffer>;

    fn destroy_buffer(&self, buffer: ash::vk::Buffer);

    fn get_buffer_memory_requirements(&self, buffer: ash::vk::Buffer)
        -> ash::vk::MemoryRequirements;

    fn bind_buffer_memory(
        &self,
        buffer: ash::vk::Buffer,
        memory: ash::vk::DeviceMemory,
        offset: ash::vk::DeviceSize,
    ) -> VkResult<()>;
}

/// Dispatch through an `ash::Device` created elsewhere.
///
/// The logical device is not destroyed when this is dropped: whoever created
/// it keeps managing its lifetime.
pub struct NativeDevice {
    device: ash::Device,
    memory_properties: ash::vk::PhysicalDeviceMemoryProperties,
}

impl NativeDevice {
    pub fn new(
        instance: &ash::Instance,
        physical_device: ash::vk::PhysicalDevice,
        device: ash::Device,
    ) -> Self {
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        Self {
            device,
            memory_properties,
        }
    }

    pub fn ash_handle(&self) -> &ash::Device {
        &self.device
    }
}

impl DeviceDispatch for NativeDevice {
    fn native_handle(&self) -> u64 {
        ash::vk::Handle::as_raw(self.device.handle())
    }

    fn memory_properties(&self) -> ash::vk::PhysicalDeviceMemoryProperties {
        self.memory_properties
    }

    fn allocate_memory(
        &self,
        size: ash::vk::DeviceSize,
        memory_type_index: u32,
    ) -> VkResult<ash::vk::DeviceMemory> {
        let allocate_info = ash::vk::MemoryAllocateInfo::default()
            .allocation_size(size)
            .memory_type_index(memory_type_index);

        unsafe { self.device.allocate_memory(&allocate_info, None) }
    }

    fn free_memory(&self, memory: ash::vk::DeviceMemory) {
        unsafe { self.device.free_memory(memory, None) }
    }

    fn map_memory(
        &self,
        memory: ash::vk::DeviceMemory,
        offset: ash::vk::DeviceSize,
        size: ash::vk::DeviceSize,
    ) -> VkResult<*mut c_void> {
        unsafe {
            self.device
                .map_memory(memory, offset, size, ash::vk::MemoryMapFlags::empty())
        }
    }

    fn unmap_memory(&self, memory: ash::vk::DeviceMemory) {
        unsafe { self.device.unmap_memory(memory) }
    }

    fn create_buffer(
        &self,
        size: ash::vk::DeviceSize,
        usage: ash::vk::BufferUsageFlags,
        sharing_mode: ash::vk::SharingMode,
        queue_family_indices: &[u32],
    ) -> VkResult<ash::vk::Buffer> {
        let create_info = ash::vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(sharing_mode)
            .queue_family_indices(queue_family_indices);

        unsafe { self.device.create_buffer(&create_info, None) }
    }

    fn destroy_buffer(&self, buffer: ash::vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) }
    }

    fn get_buffer_memory_requirements(
        &self,
        buffer: ash::vk::Buffer,
    ) -> ash::vk::MemoryRequirements {
        unsafe { self.device.get_buffer_memory_requirements(buffer) }
    }

    fn bind_buffer_memory(
        &self,
        buffer: ash::vk::Buffer,
        memory: ash::vk::DeviceMemory,
        offset: ash::vk::DeviceSize,
    ) -> VkResult<()> {
        unsafe { self.device.bind_buffer_memory(buffer, memory, offset) }
    }
}

pub struct Device {
    dispatch: Box<dyn DeviceDispatch>,
    memory_properties: ash::vk::PhysicalDeviceMemoryProperties,
    debug_name: Option<String>,
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Device {}

impl Device {
    pub fn new(dispatch: impl DeviceDispatch + 'static, debug_name: Option<&str>) -> Arc<Self> {
        let memory_properties = dispatch.memory_properties();

        log::debug!(
            "Device {} opened with {} memory types",
            debug_name.unwrap_or("<unnamed>"),
            memory_properties.memory_type_count
        );

        Arc::new(Self {
            dispatch: Box::new(dispatch),
            memory_properties,
            debug_name: debug_name.map(String::from),
        })
    }

    /// Wraps a logical device created through ash.
    pub fn from_ash(
        instance: &ash::Instance,
        physical_device: ash::vk::PhysicalDevice,
        device: ash::Device,
        debug_name: Option<&str>,
    ) -> Arc<Self> {
        Self::new(NativeDevice::new(instance, physical_device, device), debug_name)
    }

    /// A device whose memory and buffers live in host memory.
    pub fn emulated(descriptor: EmulatedDeviceDescriptor, debug_name: Option<&str>) -> Arc<Self> {
        Self::new(EmulatedDevice::new(descriptor), debug_name)
    }

    pub fn native_handle(&self) -> u64 {
        self.dispatch.native_handle()
    }

    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }

    pub(crate) fn dispatch(&self) -> &dyn DeviceDispatch {
        self.dispatch.as_ref()
    }

    pub fn memory_type_count(&self) -> u32 {
        self.memory_properties.memory_type_count
    }

    pub fn memory_type_flags(&self, memory_type_index: u32) -> Option<ash::vk::MemoryPropertyFlags> {
        if memory_type_index >= self.memory_type_count() {
            return None;
        }

        self.memory_properties
            .memory_types
            .get(memory_type_index as usize)
            .map(|memory_type| memory_type.property_flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_types_come_from_dispatch() {
        let device = Device::emulated(EmulatedDeviceDescriptor::default(), Some("test device"));

        assert_eq!(device.debug_name(), Some("test device"));
        assert!(device.memory_type_count() >= 2);
        assert!(device
            .memory_type_flags(0)
            .is_some_and(|flags| flags.contains(ash::vk::MemoryPropertyFlags::DEVICE_LOCAL)));
        assert_eq!(device.memory_type_flags(device.memory_type_count()), None);
    }

    #[test]
    fn devices_compare_by_identity() {
        let a = Device::emulated(EmulatedDeviceDescriptor::default(), None);
        let b = Device::emulated(EmulatedDeviceDescriptor::default(), None);

        assert!(a == a.clone());
        assert!(a != b);
    }
}
