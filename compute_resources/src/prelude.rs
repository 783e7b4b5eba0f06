use std::fmt::Display;

use crate::buffer::BufferUsage;

pub type VulkanResult<T> = Result<T, VulkanError>;

/// The party of a binding that already had one when `bind_memory` was called.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BindingConflict {
    /// The resource has been bound before (binding is write-once).
    Resource,
    /// The device memory is currently bound to another resource.
    Memory,
}

impl Display for BindingConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingConflict::Resource => write!(f, "resource"),
            BindingConflict::Memory => write!(f, "device memory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameworkError {
    #[error("device is out of memory")]
    OutOfDeviceMemory,
    #[error("host is out of memory")]
    OutOfHostMemory,
    #[error("too many device memory allocations")]
    TooManyAllocations,
    #[error("invalid external handle")]
    InvalidExternalHandle,
    #[error("{0} is already bound")]
    AlreadyBound(BindingConflict),
    #[error("resource is not bound to any device memory")]
    NotBound,
    #[error("binding to device memory failed: {0}")]
    BindFailed(String),
    #[error("buffer usage {0:?} has no descriptor type")]
    NotSupported(BufferUsage),
    #[error("payload of {actual} bytes does not match resource size of {expected} bytes")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("memory mapping failed: {0}")]
    MappingFailed(String),
    #[error("resource and device memory are not from the same device")]
    ResourceFromIncompatibleDevice,
    #[error("descriptor set binding {0} is being used twice in the same set")]
    DescriptorSetBindingDuplicated(u32),
    #[error("invalid user input{}", .0.as_ref().map(|details| format!(": {details}")).unwrap_or_default())]
    UserInput(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VulkanError {
    #[error("Framework error: {0}")]
    Framework(#[from] FrameworkError),
    #[error("Vulkan error ({}){}", .0, .1.as_ref().map(|details| format!(": {details}")).unwrap_or_default())]
    Vulkan(i32, Option<String>),
}

impl VulkanError {
    /// Translates the result of a native memory allocation.
    ///
    /// Resource exhaustion and external handle failures become distinct
    /// framework errors, anything else is kept as the raw result code.
    pub fn from_allocation_result(result: ash::vk::Result) -> Self {
        match result {
            ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                Self::Framework(FrameworkError::OutOfDeviceMemory)
            }
            ash::vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                Self::Framework(FrameworkError::OutOfHostMemory)
            }
            ash::vk::Result::ERROR_TOO_MANY_OBJECTS => {
                Self::Framework(FrameworkError::TooManyAllocations)
            }
            ash::vk::Result::ERROR_INVALID_EXTERNAL_HANDLE => {
                Self::Framework(FrameworkError::InvalidExternalHandle)
            }
            err => Self::Vulkan(
                err.as_raw(),
                Some(format!("Error allocating device memory: {err}")),
            ),
        }
    }

    pub fn framework_error(&self) -> Option<&FrameworkError> {
        match self {
            Self::Framework(err) => Some(err),
            Self::Vulkan(_, _) => None,
        }
    }

    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(
            self.framework_error(),
            Some(
                FrameworkError::OutOfDeviceMemory
                    | FrameworkError::OutOfHostMemory
                    | FrameworkError::TooManyAllocations
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_results_are_translated() {
        assert_eq!(
            VulkanError::from_allocation_result(ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
            VulkanError::Framework(FrameworkError::OutOfDeviceMemory)
        );
        assert_eq!(
            VulkanError::from_allocation_result(ash::vk::Result::ERROR_OUT_OF_HOST_MEMORY),
            VulkanError::Framework(FrameworkError::OutOfHostMemory)
        );
        assert_eq!(
            VulkanError::from_allocation_result(ash::vk::Result::ERROR_TOO_MANY_OBJECTS),
            VulkanError::Framework(FrameworkError::TooManyAllocations)
        );
        assert_eq!(
            VulkanError::from_allocation_result(ash::vk::Result::ERROR_INVALID_EXTERNAL_HANDLE),
            VulkanError::Framework(FrameworkError::InvalidExternalHandle)
        );
    }

    #[test]
    fn unknown_results_keep_their_code() {
        let err = VulkanError::from_allocation_result(ash::vk::Result::ERROR_DEVICE_LOST);
        match &err {
            VulkanError::Vulkan(code, Some(_)) => {
                assert_eq!(*code, ash::vk::Result::ERROR_DEVICE_LOST.as_raw())
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.is_resource_exhaustion());
    }

    #[test]
    fn exhaustion_is_recognized() {
        assert!(VulkanError::from(FrameworkError::TooManyAllocations).is_resource_exhaustion());
        assert!(!VulkanError::from(FrameworkError::NotBound).is_resource_exhaustion());
    }

    #[test]
    fn messages_carry_details() {
        let err = VulkanError::from(FrameworkError::SizeMismatch {
            expected: 16,
            actual: 4,
        });
        assert_eq!(
            err.to_string(),
            "Framework error: payload of 4 bytes does not match resource size of 16 bytes"
        );

        let err = VulkanError::from(FrameworkError::AlreadyBound(BindingConflict::Memory));
        assert_eq!(err.to_string(), "Framework error: device memory is already bound");

        assert_eq!(
            FrameworkError::UserInput(None).to_string(),
            "invalid user input"
        );
    }
}
