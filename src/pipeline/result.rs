//! Typed access to compacted placement output.

use cubecl::prelude::*;
use cubecl::server::Handle;
use cubecl::wgpu::{WgpuDevice, WgpuRuntime};
use glam::Vec3;

use crate::error::Error;
use crate::gpu;
use crate::gpu::constants::POSITION_STRIDE;
use crate::world::Element;

use super::utils::div_ceil;

/// Compacted placement output, ordered class by class on the GPU.
///
/// Class 0 occupies the first `class_element_count(0)` slots, class 1 the
/// next range, and so on. Dropping the placement releases the backing
/// storage.
pub struct Placement {
    device: WgpuDevice,
    buffers: Option<OutputBuffers>,
    class_counts: Vec<usize>,
}

struct OutputBuffers {
    positions: Handle,
    classes: Handle,
    /// Elements the arrays were sized for (the candidate count).
    capacity: usize,
}

impl Placement {
    pub(crate) fn empty(device: WgpuDevice, num_classes: usize) -> Self {
        Self {
            device,
            buffers: None,
            class_counts: vec![0; num_classes],
        }
    }

    pub(crate) fn new(
        device: WgpuDevice,
        positions: Handle,
        classes: Handle,
        capacity: usize,
        class_counts: Vec<usize>,
    ) -> Self {
        Self {
            device,
            buffers: Some(OutputBuffers {
                positions,
                classes,
                capacity,
            }),
            class_counts,
        }
    }

    /// Number of placement classes in the source layer.
    pub fn num_classes(&self) -> usize {
        self.class_counts.len()
    }

    /// Elements assigned to one class.
    pub fn class_element_count(&self, class_index: usize) -> usize {
        self.class_counts.get(class_index).copied().unwrap_or(0)
    }

    /// Total elements across all classes.
    pub fn element_array_length(&self) -> usize {
        self.class_counts.iter().sum()
    }

    /// Read every element back to the host, class-contiguous.
    pub fn copy_all_to_host(&self) -> Vec<Element> {
        self.read_range(0, self.element_array_length())
    }

    /// Read one class's elements back to the host.
    pub fn copy_class_to_host(&self, class_index: usize) -> Vec<Element> {
        self.read_range(
            self.class_offset(class_index),
            self.class_element_count(class_index),
        )
    }

    /// Device-side copy of every element into `dest`, starting at slot 0.
    pub fn copy_all(&self, dest: &ElementBuffer) -> Result<(), Error> {
        self.device_copy(0, self.element_array_length(), dest)
    }

    /// Device-side copy of one class's elements into `dest`.
    pub fn copy_class(&self, class_index: usize, dest: &ElementBuffer) -> Result<(), Error> {
        self.device_copy(
            self.class_offset(class_index),
            self.class_element_count(class_index),
            dest,
        )
    }

    fn class_offset(&self, class_index: usize) -> usize {
        self.class_counts[..class_index.min(self.class_counts.len())]
            .iter()
            .sum()
    }

    fn read_range(&self, offset: usize, count: usize) -> Vec<Element> {
        let Some(buffers) = &self.buffers else {
            return Vec::new();
        };
        if count == 0 {
            return Vec::new();
        }
        let client = WgpuRuntime::client(&self.device);
        let pos_bytes = client.read_one(buffers.positions.clone());
        let cls_bytes = client.read_one(buffers.classes.clone());
        let positions = f32::from_bytes(&pos_bytes);
        let classes = u32::from_bytes(&cls_bytes);

        let mut elements = Vec::with_capacity(count);
        for i in offset..offset + count {
            let base = i * POSITION_STRIDE as usize;
            elements.push(Element {
                position: Vec3::new(positions[base], positions[base + 1], positions[base + 2]),
                class_index: classes[i],
            });
        }
        elements
    }

    fn device_copy(&self, offset: usize, count: usize, dest: &ElementBuffer) -> Result<(), Error> {
        if count == 0 {
            return Ok(());
        }
        if count > dest.len() {
            return Err(Error::InvalidArgument(format!(
                "destination holds {} elements, need {count}",
                dest.len()
            )));
        }
        let Some(buffers) = &self.buffers else {
            return Ok(());
        };

        let client = WgpuRuntime::client(&self.device);
        let pos_len = buffers.capacity * POSITION_STRIDE as usize;
        unsafe {
            let dim = CubeDim::new_1d(256);
            let cube_count = CubeCount::new_1d(div_ceil(count as u32, dim.x));
            gpu::copy_elements::launch_unchecked::<WgpuRuntime>(
                &client,
                cube_count,
                dim,
                ArrayArg::from_raw_parts::<f32>(&buffers.positions, pos_len, 1),
                ArrayArg::from_raw_parts::<u32>(&buffers.classes, buffers.capacity, 1),
                ScalarArg::new(count as u32),
                ScalarArg::new(offset as u32),
                ScalarArg::new(0u32),
                ArrayArg::from_raw_parts::<f32>(
                    &dest.positions,
                    dest.len() * POSITION_STRIDE as usize,
                    1,
                ),
                ArrayArg::from_raw_parts::<u32>(&dest.classes, dest.len(), 1),
            )
            .map_err(Error::Launch)?;
        }
        Ok(())
    }
}

/// Caller-allocated GPU destination for device-side element copies.
pub struct ElementBuffer {
    device: WgpuDevice,
    positions: Handle,
    classes: Handle,
    len: usize,
}

impl ElementBuffer {
    pub(crate) fn new(device: &WgpuDevice, len: usize) -> Self {
        let client = WgpuRuntime::client(device);
        let slots = len.max(1);
        Self {
            device: device.clone(),
            positions: client
                .empty(slots * POSITION_STRIDE as usize * core::mem::size_of::<f32>()),
            classes: client.empty(slots * core::mem::size_of::<u32>()),
            len,
        }
    }

    /// Elements this buffer can hold.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the buffer contents back to the host.
    pub fn read_to_host(&self) -> Vec<Element> {
        if self.len == 0 {
            return Vec::new();
        }
        let client = WgpuRuntime::client(&self.device);
        let pos_bytes = client.read_one(self.positions.clone());
        let cls_bytes = client.read_one(self.classes.clone());
        let positions = f32::from_bytes(&pos_bytes);
        let classes = u32::from_bytes(&cls_bytes);

        let mut elements = Vec::with_capacity(self.len);
        for i in 0..self.len {
            let base = i * POSITION_STRIDE as usize;
            elements.push(Element {
                position: Vec3::new(positions[base], positions[base + 1], positions[base + 2]),
                class_index: classes[i],
            });
        }
        elements
    }
}
