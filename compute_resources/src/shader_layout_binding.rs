#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
}

impl DescriptorType {
    pub(crate) fn ash_descriptor_type(&self) -> ash::vk::DescriptorType {
        match self {
            Self::UniformBuffer => ash::vk::DescriptorType::UNIFORM_BUFFER,
            Self::StorageBuffer => ash::vk::DescriptorType::STORAGE_BUFFER,
        }
    }
}

/// Shape of one slot of a descriptor set layout, visible to the compute stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    descriptor_type: DescriptorType,
    binding_point: u32,
    binding_count: u32,
}

impl BindingDescriptor {
    pub fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    pub fn binding_point(&self) -> u32 {
        self.binding_point
    }

    pub fn binding_count(&self) -> u32 {
        self.binding_count
    }

    pub fn stage_flags(&self) -> ash::vk::ShaderStageFlags {
        ash::vk::ShaderStageFlags::COMPUTE
    }

    pub fn ash_handle(&self) -> ash::vk::DescriptorSetLayoutBinding<'static> {
        ash::vk::DescriptorSetLayoutBinding::default()
            .binding(self.binding_point)
            .stage_flags(self.stage_flags())
            .descriptor_count(self.binding_count)
            .descriptor_type(self.descriptor_type.ash_descriptor_type())
    }

    /// Half-open range of binding points, clamped at `u32::MAX`.
    pub fn binding_range(&self) -> (u32, u32) {
        (
            self.binding_point,
            self.binding_point.saturating_add(self.binding_count),
        )
    }

    pub fn new(descriptor_type: DescriptorType, binding_point: u32, binding_count: u32) -> Self {
        Self {
            descriptor_type,
            binding_point,
            binding_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_layout_binding() {
        let descriptor = BindingDescriptor::new(DescriptorType::StorageBuffer, 3, 1);
        let native = descriptor.ash_handle();

        assert_eq!(native.binding, 3);
        assert_eq!(native.descriptor_count, 1);
        assert_eq!(native.descriptor_type, ash::vk::DescriptorType::STORAGE_BUFFER);
        assert_eq!(native.stage_flags, ash::vk::ShaderStageFlags::COMPUTE);
        assert!(native.p_immutable_samplers.is_null());
    }

    #[test]
    fn binding_range_spans_count() {
        let descriptor = BindingDescriptor::new(DescriptorType::UniformBuffer, 2, 1);
        assert_eq!(descriptor.binding_range(), (2, 3));
    }

    #[test]
    fn binding_range_at_last_slot() {
        let descriptor = BindingDescriptor::new(DescriptorType::StorageBuffer, u32::MAX, 1);
        assert_eq!(descriptor.binding_range(), (u32::MAX, u32::MAX));
    }
}
