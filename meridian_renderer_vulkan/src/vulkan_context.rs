//! Instance, device, queue and memory allocator shared by every Vulkan object
//!
//! One queue family must support both graphics and presentation to the
//! window surface; all work is submitted to that single queue.

use crate::vulkan_debug::messenger_create_info;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use meridian_renderer::meridian::{Error, Result};
use meridian_renderer::{render_err, render_error, render_info, render_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CString;
use std::mem::ManuallyDrop;

const SOURCE: &str = "meridian::vulkan";

fn init_failed(what: &str, e: impl std::fmt::Debug) -> Error {
    render_error!(SOURCE, "{}: {:?}", what, e);
    Error::InitializationFailed(format!("{}: {:?}", what, e))
}

pub struct VulkanContext {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub queue: vk::Queue,
    pub queue_family: u32,
    pub limits: vk::PhysicalDeviceLimits,

    allocator: ManuallyDrop<Allocator>,
    upload_pool: vk::CommandPool,
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    object_names: Option<ash::ext::debug_utils::Device>,
}

impl VulkanContext {
    /// Create the instance and device for `window`
    ///
    /// Returns the context and the window surface, which the swapchain takes over.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, debug: bool) -> Result<(Self, vk::SurfaceKHR)> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| init_failed("Failed to load Vulkan library", e))?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(c"Meridian Application")
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Meridian")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_1);

            let display_handle = window
                .display_handle()
                .map_err(|e| init_failed("Failed to get display handle", e))?;
            let window_handle = window
                .window_handle()
                .map_err(|e| init_failed("Failed to get window handle", e))?;

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_failed("Failed to get required surface extensions", e))?
                .to_vec();
            if debug {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if debug { vec![c"VK_LAYER_KHRONOS_validation".as_ptr()] } else { vec![] };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);
            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed("Failed to create Vulkan instance", e))?;

            let debug_messenger = if debug {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                match debug_utils.create_debug_utils_messenger(&messenger_create_info(), None) {
                    Ok(messenger) => Some((debug_utils, messenger)),
                    Err(e) => {
                        render_warn!(SOURCE, "Validation messages unavailable: {:?}", e);
                        None
                    }
                }
            } else {
                None
            };

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_failed("Failed to create surface", e))?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, queue_family) = Self::pick_physical_device(&instance, &surface_loader, surface)?;
            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            render_info!(
                SOURCE,
                "Vulkan device \"{}\" (API {}.{}.{})",
                device_name,
                vk::api_version_major(properties.api_version),
                vk::api_version_minor(properties.api_version),
                vk::api_version_patch(properties.api_version)
            );

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];
            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default();
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);
            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_failed("Failed to create logical device", e))?;
            let queue = device.get_device_queue(queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_failed("Failed to create GPU allocator", e))?;

            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(|e| init_failed("Failed to create upload command pool", e))?;

            let object_names = debug_messenger
                .as_ref()
                .map(|_| ash::ext::debug_utils::Device::new(&instance, &device));

            Ok((
                Self {
                    entry,
                    instance,
                    physical_device,
                    device,
                    queue,
                    queue_family,
                    limits: properties.limits,
                    allocator: ManuallyDrop::new(allocator),
                    upload_pool,
                    debug_messenger,
                    object_names,
                },
                surface,
            ))
        }
    }

    /// First discrete GPU with a graphics + present queue, else any such GPU
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_failed("Failed to enumerate physical devices", e))?;

        let mut candidates = Vec::new();
        for physical_device in physical_devices {
            let families = instance.get_physical_device_queue_family_properties(physical_device);
            let family = (0..families.len() as u32).find(|&i| {
                families[i as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                    && surface_loader
                        .get_physical_device_surface_support(physical_device, i, surface)
                        .unwrap_or(false)
            });
            if let Some(family) = family {
                let discrete = instance.get_physical_device_properties(physical_device).device_type
                    == vk::PhysicalDeviceType::DISCRETE_GPU;
                candidates.push((discrete, physical_device, family));
            }
        }

        candidates
            .iter()
            .find(|(discrete, ..)| *discrete)
            .or(candidates.first())
            .map(|&(_, physical_device, family)| (physical_device, family))
            .ok_or_else(|| init_failed("No GPU with a graphics queue that can present to the window", vk::Result::ERROR_INITIALIZATION_FAILED))
    }

    // ===== MEMORY =====

    pub fn allocate(
        &mut self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        self.allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                render_error!(
                    SOURCE,
                    "Out of GPU memory for \"{}\" ({:.2} MB): {:?}",
                    name,
                    requirements.size as f64 / (1024.0 * 1024.0),
                    e
                );
                Error::OutOfMemory
            })
    }

    /// Buffer with bound memory; `CpuToGpu` allocations are persistently mapped
    pub fn create_buffer(
        &mut self,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Result<(vk::Buffer, Allocation)> {
        unsafe {
            let info = vk::BufferCreateInfo::default()
                .size(size.max(1))
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = self
                .device
                .create_buffer(&info, None)
                .map_err(|e| render_err!(SOURCE, "Failed to create buffer \"{}\" of {} bytes: {:?}", name, size, e))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let allocation = match self.allocate(name, requirements, location, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };
            if let Err(e) = self.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.free(allocation);
                self.device.destroy_buffer(buffer, None);
                return Err(render_err!(SOURCE, "Failed to bind memory of buffer \"{}\": {:?}", name, e));
            }
            self.set_object_name(buffer, name);
            Ok((buffer, allocation))
        }
    }

    pub fn free(&mut self, allocation: Allocation) {
        if let Err(e) = self.allocator.free(allocation) {
            render_warn!(SOURCE, "Failed to free GPU allocation: {:?}", e);
        }
    }

    // ===== COMMANDS =====

    /// Record with `record`, submit and wait for completion
    pub fn one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.upload_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffers = self
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| render_err!(SOURCE, "Failed to allocate upload command buffer: {:?}", e))?;

            let result = self.submit_and_wait(&command_buffers, record);
            self.device.free_command_buffers(self.upload_pool, &command_buffers);
            result
        }
    }

    unsafe fn submit_and_wait<F>(&self, command_buffers: &[vk::CommandBuffer], record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let command_buffer = command_buffers[0];
        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| render_err!(SOURCE, "Failed to begin upload command buffer: {:?}", e))?;
        record(&self.device, command_buffer);
        self.device
            .end_command_buffer(command_buffer)
            .map_err(|e| render_err!(SOURCE, "Failed to end upload command buffer: {:?}", e))?;

        let fence = self
            .device
            .create_fence(&vk::FenceCreateInfo::default(), None)
            .map_err(|e| render_err!(SOURCE, "Failed to create upload fence: {:?}", e))?;
        let submit_info = vk::SubmitInfo::default().command_buffers(command_buffers);
        let result = self
            .device
            .queue_submit(self.queue, &[submit_info], fence)
            .and_then(|_| self.device.wait_for_fences(&[fence], true, u64::MAX))
            .map_err(|e| render_err!(SOURCE, "Upload submission failed: {:?}", e));
        self.device.destroy_fence(fence, None);
        result
    }

    // ===== QUERIES =====

    pub fn format_supports(&self, format: vk::Format, features: vk::FormatFeatureFlags) -> bool {
        if format == vk::Format::UNDEFINED {
            return false;
        }
        let properties =
            unsafe { self.instance.get_physical_device_format_properties(self.physical_device, format) };
        properties.optimal_tiling_features.contains(features)
    }

    /// Attach a debug name to `handle` (debug mode only)
    pub fn set_object_name<H: vk::Handle>(&self, handle: H, name: &str) {
        let (Some(names), Ok(name)) = (&self.object_names, CString::new(name)) else {
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default().object_handle(handle).object_name(&name);
        if let Err(e) = unsafe { names.set_debug_utils_object_name(&info) } {
            render_warn!(SOURCE, "Failed to name object {:?}: {:?}", name, e);
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_command_pool(self.upload_pool, None);
            // Allocator memory must be released before the device goes away
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
