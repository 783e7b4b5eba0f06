use std::sync::Arc;

use crate::{
    descriptor_write::WriteDescriptor,
    device::{Device, DeviceOwned},
    device_memory::{DeviceMemory, MappedMemory},
    memory_requiring::{MemoryRequirements, MemoryRequiring},
    memory_resource::{MemoryBinding, MemoryResource},
    prelude::{BindingConflict, FrameworkError, VulkanError, VulkanResult},
    shader_layout_binding::{BindingDescriptor, DescriptorType},
    utils::is_aligned_u64,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferUsage {
    TransferSrc,
    TransferDst,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    IndexBuffer,
    VertexBuffer,
    IndirectBuffer,
}

impl BufferUsage {
    pub(crate) fn ash_usage(&self) -> ash::vk::BufferUsageFlags {
        match self {
            Self::TransferSrc => ash::vk::BufferUsageFlags::TRANSFER_SRC,
            Self::TransferDst => ash::vk::BufferUsageFlags::TRANSFER_DST,
            Self::UniformTexelBuffer => ash::vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER,
            Self::StorageTexelBuffer => ash::vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER,
            Self::UniformBuffer => ash::vk::BufferUsageFlags::UNIFORM_BUFFER,
            Self::StorageBuffer => ash::vk::BufferUsageFlags::STORAGE_BUFFER,
            Self::IndexBuffer => ash::vk::BufferUsageFlags::INDEX_BUFFER,
            Self::VertexBuffer => ash::vk::BufferUsageFlags::VERTEX_BUFFER,
            Self::IndirectBuffer => ash::vk::BufferUsageFlags::INDIRECT_BUFFER,
        }
    }

    /// Descriptor type a buffer of this usage is bound as, if any.
    pub fn descriptor_type(&self) -> Option<DescriptorType> {
        match self {
            Self::StorageBuffer => Some(DescriptorType::StorageBuffer),
            Self::UniformBuffer => Some(DescriptorType::UniformBuffer),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConcreteBufferDescriptor {
    usage: BufferUsage,
    size: ash::vk::DeviceSize,
}

impl ConcreteBufferDescriptor {
    pub fn new(usage: BufferUsage, size: u64) -> Self {
        Self {
            size: size as ash::vk::DeviceSize,
            usage,
        }
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn ash_size(&self) -> ash::vk::DeviceSize {
        self.size as ash::vk::DeviceSize
    }

    pub(crate) fn ash_usage(&self) -> ash::vk::BufferUsageFlags {
        self.usage.ash_usage()
    }
}

pub struct Buffer {
    device: Arc<Device>,
    descriptor: ConcreteBufferDescriptor,
    queue_family_index: u32,
    buffer: ash::vk::Buffer,
    binding: MemoryBinding,
    debug_name: Option<String>,
}

impl Drop for Buffer {
    fn drop(&mut self) {
        log::debug!(
            "Destroying buffer {}",
            self.debug_name.as_deref().unwrap_or("<unnamed>")
        );

        // the memory binding is given back after the native buffer is gone
        self.device.dispatch().destroy_buffer(self.buffer)
    }
}

impl DeviceOwned for Buffer {
    fn get_parent_device(&self) -> Arc<Device> {
        self.device.clone()
    }
}

impl Buffer {
    pub(crate) fn ash_handle(&self) -> ash::vk::Buffer {
        self.buffer
    }

    pub fn native_handle(&self) -> u64 {
        ash::vk::Handle::as_raw(self.buffer)
    }

    pub fn descriptor(&self) -> &ConcreteBufferDescriptor {
        &self.descriptor
    }

    pub fn usage(&self) -> BufferUsage {
        self.descriptor.usage()
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }

    /// Creates an unbound buffer, used exclusively by the given queue family.
    pub fn new(
        device: Arc<Device>,
        descriptor: ConcreteBufferDescriptor,
        queue_family_index: u32,
        debug_name: Option<&str>,
    ) -> VulkanResult<Self> {
        if descriptor.ash_size() == 0 {
            return Err(VulkanError::Framework(FrameworkError::UserInput(Some(
                "buffer cannot have a size of zero bytes".to_string(),
            ))));
        }

        let buffer = device
            .dispatch()
            .create_buffer(
                descriptor.ash_size(),
                descriptor.ash_usage(),
                ash::vk::SharingMode::EXCLUSIVE,
                [queue_family_index].as_slice(),
            )
            .map_err(|err| {
                log::warn!("Error creating the buffer: {}", err);

                match err {
                    ash::vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                        VulkanError::Framework(FrameworkError::OutOfHostMemory)
                    }
                    ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                        VulkanError::Framework(FrameworkError::OutOfDeviceMemory)
                    }
                    err => VulkanError::Vulkan(
                        err.as_raw(),
                        Some(format!("Error creating the buffer: {}", err)),
                    ),
                }
            })?;

        log::debug!(
            "Created buffer {} ({} bytes, {:?})",
            debug_name.unwrap_or("<unnamed>"),
            descriptor.size(),
            descriptor.usage()
        );

        Ok(Self {
            device,
            descriptor,
            queue_family_index,
            buffer,
            binding: MemoryBinding::default(),
            debug_name: debug_name.map(String::from),
        })
    }

    /// Maps the bound range of the buffer until the guard is dropped.
    pub fn scoped_map(&self) -> VulkanResult<MappedMemory<'_>> {
        let (Some(memory), Some(offset)) = (self.binding.memory(), self.binding.offset()) else {
            return Err(VulkanError::Framework(FrameworkError::NotBound));
        };

        memory.scoped_map_range(offset, self.size())
    }

    /// Copies `bytes` into the buffer, which must be exactly as large.
    pub fn write(&self, bytes: &[u8]) -> VulkanResult<()> {
        if !self.is_bound() {
            return Err(VulkanError::Framework(FrameworkError::NotBound));
        }

        if bytes.len() as u64 != self.size() {
            return Err(VulkanError::Framework(FrameworkError::SizeMismatch {
                expected: self.size(),
                actual: bytes.len() as u64,
            }));
        }

        let mut window = self.scoped_map()?;
        window.copy_from_slice(bytes);

        Ok(())
    }

    pub fn read(&self) -> VulkanResult<Vec<u8>> {
        Ok(self.scoped_map()?.to_vec())
    }
}

impl MemoryRequiring for Buffer {
    fn memory_requirements(&self) -> MemoryRequirements {
        self.device
            .dispatch()
            .get_buffer_memory_requirements(self.buffer)
            .into()
    }
}

impl MemoryResource for Buffer {
    fn size(&self) -> u64 {
        self.descriptor.size()
    }

    fn memory(&self) -> Option<Arc<DeviceMemory>> {
        self.binding.memory().cloned()
    }

    fn memory_offset(&self) -> Option<u64> {
        self.binding.offset()
    }

    fn bind_memory(&mut self, memory: Arc<DeviceMemory>, offset: u64) -> VulkanResult<()> {
        if self.binding.memory().is_some() {
            return Err(VulkanError::Framework(FrameworkError::AlreadyBound(
                BindingConflict::Resource,
            )));
        }

        if memory.get_parent_device() != self.device {
            return Err(VulkanError::Framework(
                FrameworkError::ResourceFromIncompatibleDevice,
            ));
        }

        self.binding.bind(memory.clone(), offset)?;

        let requirements = self.memory_requirements();

        let bind_result = if !is_aligned_u64(offset, requirements.alignment()) {
            Err(VulkanError::Framework(FrameworkError::BindFailed(format!(
                "offset {} is not aligned to {} bytes",
                offset,
                requirements.alignment()
            ))))
        } else if offset
            .checked_add(requirements.size())
            .map_or(true, |end| end > memory.size())
        {
            Err(VulkanError::Framework(FrameworkError::BindFailed(format!(
                "{} bytes at offset {} do not fit in {} bytes of device memory",
                requirements.size(),
                offset,
                memory.size()
            ))))
        } else {
            self.device
                .dispatch()
                .bind_buffer_memory(self.buffer, memory.ash_handle(), offset)
                .map_err(|err| {
                    VulkanError::Framework(FrameworkError::BindFailed(format!(
                        "native bind rejected offset {offset}: {err}"
                    )))
                })
        };

        match bind_result {
            Ok(()) => {
                log::debug!(
                    "Bound buffer {} to device memory {} at offset {}",
                    self.debug_name.as_deref().unwrap_or("<unnamed>"),
                    memory.debug_name().unwrap_or("<unnamed>"),
                    offset
                );

                Ok(())
            }
            Err(err) => {
                log::warn!("Error binding the buffer: {}", err);

                self.binding.rollback();
                Err(err)
            }
        }
    }

    fn descriptor_type(&self) -> VulkanResult<DescriptorType> {
        self.usage()
            .descriptor_type()
            .ok_or(VulkanError::Framework(FrameworkError::NotSupported(
                self.usage(),
            )))
    }

    fn descriptor_set_layout(&self, binding: u32) -> VulkanResult<BindingDescriptor> {
        Ok(BindingDescriptor::new(self.descriptor_type()?, binding, 1))
    }

    fn write_descriptor_set(
        &self,
        descriptor_set: ash::vk::DescriptorSet,
        binding: u32,
    ) -> VulkanResult<WriteDescriptor> {
        Ok(WriteDescriptor::new(
            descriptor_set,
            binding,
            self.descriptor_type()?,
            self.ash_handle(),
            0,
            self.size(),
        ))
    }
}
