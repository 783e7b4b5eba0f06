use crate::{device::Device, memory_requiring::MemoryRequirements};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryHostCoherence {
    /// Host writes are visible to the device without explicit flushes.
    Coherent,
}

/**
 * If DeviceLocal(None) is specified a memory type with VK_MEMORY_PROPERTY_DEVICE_LOCAL_BIT
 * is selected, DeviceLocal(Some(Coherent)) also requires it to be host-visible and host-coherent.
 *
 * If HostLocal is specified a memory type with at least VK_MEMORY_PROPERTY_HOST_VISIBLE_BIT
 * is selected, HostLocal(Some(Coherent)) also requires VK_MEMORY_PROPERTY_HOST_COHERENT_BIT.
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryType {
    DeviceLocal(Option<MemoryHostCoherence>),
    HostLocal(Option<MemoryHostCoherence>),
}

impl MemoryType {
    pub(crate) fn ash_flags(&self) -> ash::vk::MemoryPropertyFlags {
        let coherence = |maybe_coherence: &Option<MemoryHostCoherence>| match maybe_coherence {
            Some(MemoryHostCoherence::Coherent) => {
                ash::vk::MemoryPropertyFlags::HOST_VISIBLE
                    | ash::vk::MemoryPropertyFlags::HOST_COHERENT
            }
            None => ash::vk::MemoryPropertyFlags::empty(),
        };

        match self {
            Self::DeviceLocal(maybe_coherence) => {
                ash::vk::MemoryPropertyFlags::DEVICE_LOCAL | coherence(maybe_coherence)
            }
            Self::HostLocal(maybe_coherence) => {
                ash::vk::MemoryPropertyFlags::HOST_VISIBLE | coherence(maybe_coherence)
            }
        }
    }

    pub fn is_host_visible(&self) -> bool {
        self.ash_flags()
            .contains(ash::vk::MemoryPropertyFlags::HOST_VISIBLE)
    }
}

/// Picks the first memory type allowed by `requirements` that has every property of `memory_type`.
pub fn find_memory_type_index(
    device: &Device,
    requirements: &MemoryRequirements,
    memory_type: &MemoryType,
) -> Option<u32> {
    let wanted = memory_type.ash_flags();

    (0..device.memory_type_count()).find(|index| {
        requirements.allows_memory_type(*index)
            && device
                .memory_type_flags(*index)
                .is_some_and(|flags| flags.contains(wanted))
    })
}
