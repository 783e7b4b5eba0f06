//! Device memory allocation and binding for compute workloads.
//!
//! Raw [`device_memory::DeviceMemory`] allocations, [`buffer::Buffer`] objects
//! bound to them at caller-chosen offsets, scoped host mapping and the
//! descriptor metadata a compute pipeline needs to bind those buffers.

pub mod buffer;
pub mod descriptor_set;
pub mod descriptor_write;
pub mod device;
pub mod device_memory;
pub mod emulated_device;
pub mod memory_requiring;
pub mod memory_resource;
pub mod memory_type;
pub mod prelude;
pub mod shader_layout_binding;
pub mod utils;
