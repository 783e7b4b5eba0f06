use crate::{
    descriptor_write::WriteDescriptor,
    memory_resource::MemoryResource,
    prelude::{FrameworkError, VulkanError, VulkanResult},
    shader_layout_binding::BindingDescriptor,
};

/// Resources that make up one descriptor set, keyed by binding point.
#[derive(Default)]
pub struct DescriptorSetBindings<'resource> {
    bindings: smallvec::SmallVec<[(u32, &'resource dyn MemoryResource); 8]>,
}

impl<'resource> DescriptorSetBindings<'resource> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn bind(&mut self, binding: u32, resource: &'resource dyn MemoryResource) -> VulkanResult<()> {
        if self.bindings.iter().any(|(used, _)| *used == binding) {
            return Err(VulkanError::Framework(
                FrameworkError::DescriptorSetBindingDuplicated(binding),
            ));
        }

        self.bindings.push((binding, resource));

        Ok(())
    }

    pub fn with(mut self, binding: u32, resource: &'resource dyn MemoryResource) -> VulkanResult<Self> {
        self.bind(binding, resource)?;
        Ok(self)
    }

    /// Layout bindings, ordered by binding point.
    pub fn layout_bindings(&self) -> VulkanResult<smallvec::SmallVec<[BindingDescriptor; 8]>> {
        let mut layout = self
            .bindings
            .iter()
            .map(|(binding, resource)| resource.descriptor_set_layout(*binding))
            .collect::<VulkanResult<smallvec::SmallVec<[BindingDescriptor; 8]>>>()?;

        layout.sort_by_key(|descriptor| descriptor.binding_point());

        Ok(layout)
    }

    /// Writes filling `descriptor_set`, ordered by binding point.
    pub fn writes(
        &self,
        descriptor_set: ash::vk::DescriptorSet,
    ) -> VulkanResult<smallvec::SmallVec<[WriteDescriptor; 8]>> {
        let mut writes = self
            .bindings
            .iter()
            .map(|(binding, resource)| resource.write_descriptor_set(descriptor_set, *binding))
            .collect::<VulkanResult<smallvec::SmallVec<[WriteDescriptor; 8]>>>()?;

        writes.sort_by_key(|write| write.binding_point());

        Ok(writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buffer::{Buffer, BufferUsage, ConcreteBufferDescriptor},
        device::Device,
        emulated_device::EmulatedDeviceDescriptor,
        shader_layout_binding::DescriptorType,
    };
    use ash::vk::Handle;
    use std::sync::Arc;

    fn buffer(device: &Arc<Device>, usage: BufferUsage, size: u64) -> Buffer {
        Buffer::new(
            device.clone(),
            ConcreteBufferDescriptor::new(usage, size),
            0,
            None,
        )
        .unwrap()
    }

    #[test]
    fn collects_layout_and_writes() {
        let device = Device::emulated(EmulatedDeviceDescriptor::default(), None);
        let input = buffer(&device, BufferUsage::StorageBuffer, 1024);
        let output = buffer(&device, BufferUsage::StorageBuffer, 2048);
        let params = buffer(&device, BufferUsage::UniformBuffer, 64);

        let bindings = DescriptorSetBindings::new()
            .with(1, &output)
            .unwrap()
            .with(0, &input)
            .unwrap()
            .with(2, &params)
            .unwrap();
        assert_eq!(bindings.len(), 3);

        let layout = bindings.layout_bindings().unwrap();
        assert_eq!(
            layout
                .iter()
                .map(|d| (d.binding_point(), d.descriptor_type()))
                .collect::<Vec<_>>(),
            vec![
                (0, DescriptorType::StorageBuffer),
                (1, DescriptorType::StorageBuffer),
                (2, DescriptorType::UniformBuffer),
            ]
        );

        let set = ash::vk::DescriptorSet::from_raw(0x42);
        let writes = bindings.writes(set).unwrap();
        assert_eq!(
            writes
                .iter()
                .map(|w| (w.binding_point(), w.buffer_info().range))
                .collect::<Vec<_>>(),
            vec![(0, 1024), (1, 2048), (2, 64)]
        );
        assert!(writes.iter().all(|w| w.descriptor_set() == set));
    }

    #[test]
    fn duplicated_binding_is_rejected() {
        let device = Device::emulated(EmulatedDeviceDescriptor::default(), None);
        let a = buffer(&device, BufferUsage::StorageBuffer, 16);
        let b = buffer(&device, BufferUsage::UniformBuffer, 16);

        let mut bindings = DescriptorSetBindings::new();
        bindings.bind(0, &a).unwrap();

        assert_eq!(
            bindings.bind(0, &b),
            Err(VulkanError::Framework(
                FrameworkError::DescriptorSetBindingDuplicated(0)
            ))
        );
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn unsupported_usage_propagates() {
        let device = Device::emulated(EmulatedDeviceDescriptor::default(), None);
        let storage = buffer(&device, BufferUsage::StorageBuffer, 16);
        let vertices = buffer(&device, BufferUsage::VertexBuffer, 16);

        let bindings = DescriptorSetBindings::new()
            .with(0, &storage)
            .unwrap()
            .with(1, &vertices)
            .unwrap();

        assert_eq!(
            bindings.layout_bindings().err(),
            Some(VulkanError::Framework(FrameworkError::NotSupported(
                BufferUsage::VertexBuffer
            )))
        );
        assert!(bindings.writes(ash::vk::DescriptorSet::null()).is_err());
    }
}
