use crate::shader_layout_binding::DescriptorType;

/// Contents for one descriptor set slot: a buffer range.
#[derive(Debug, Copy, Clone)]
pub struct WriteDescriptor {
    descriptor_set: ash::vk::DescriptorSet,
    binding_point: u32,
    descriptor_type: DescriptorType,
    buffer_info: [ash::vk::DescriptorBufferInfo; 1],
}

impl WriteDescriptor {
    pub fn new(
        descriptor_set: ash::vk::DescriptorSet,
        binding_point: u32,
        descriptor_type: DescriptorType,
        buffer: ash::vk::Buffer,
        offset: u64,
        range: u64,
    ) -> Self {
        Self {
            descriptor_set,
            binding_point,
            descriptor_type,
            buffer_info: [ash::vk::DescriptorBufferInfo::default()
                .buffer(buffer)
                .offset(offset)
                .range(range)],
        }
    }

    pub fn descriptor_set(&self) -> ash::vk::DescriptorSet {
        self.descriptor_set
    }

    pub fn binding_point(&self) -> u32 {
        self.binding_point
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    pub fn buffer_info(&self) -> &ash::vk::DescriptorBufferInfo {
        &self.buffer_info[0]
    }

    /// The native write; it borrows the buffer info stored in `self`.
    pub fn ash_handle(&self) -> ash::vk::WriteDescriptorSet<'_> {
        ash::vk::WriteDescriptorSet::default()
            .dst_set(self.descriptor_set)
            .dst_binding(self.binding_point)
            .dst_array_element(0)
            .descriptor_type(self.descriptor_type.ash_descriptor_type())
            .buffer_info(&self.buffer_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn native_write_references_buffer_range() {
        let write = WriteDescriptor::new(
            ash::vk::DescriptorSet::from_raw(0x10),
            4,
            DescriptorType::UniformBuffer,
            ash::vk::Buffer::from_raw(0x20),
            0,
            512,
        );

        let native = write.ash_handle();
        assert_eq!(native.dst_set.as_raw(), 0x10);
        assert_eq!(native.dst_binding, 4);
        assert_eq!(native.descriptor_count, 1);
        assert_eq!(native.descriptor_type, ash::vk::DescriptorType::UNIFORM_BUFFER);

        let info = unsafe { &*native.p_buffer_info };
        assert_eq!(info.buffer.as_raw(), 0x20);
        assert_eq!(info.offset, 0);
        assert_eq!(info.range, 512);
    }
}
