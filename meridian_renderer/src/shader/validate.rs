//! Best-effort check of reflected shader resources against descriptor-set layouts

use super::ShaderResource;
use crate::renderer::descriptor_set::{native_slots, slot_at_binding};
use crate::renderer::{DescriptorLayout, DescriptorType};

/// Whether a layout entry of type `declared` can feed a shader resource of type `used`
fn compatible(declared: DescriptorType, used: DescriptorType) -> bool {
    declared == used || (declared == DescriptorType::CombinedSampler && used == DescriptorType::Texture)
}

/// Log every resource of `shader` that has no matching layout entry
///
/// `layouts[set]` holds the entries of the layout bound at that set index.
/// Mismatches are reported but never fatal; the return value is their count.
pub fn check_shader_resources(shader: &str, resources: &[ShaderResource], layouts: &[&[DescriptorLayout]]) -> usize {
    let mut problems = 0;
    for r in resources {
        let Some(set) = layouts.get(r.set as usize) else {
            crate::render_error!(
                "meridian::shader",
                "{}: resource \"{}\" uses set {} but the pipeline has {} sets",
                shader,
                r.name,
                r.set,
                layouts.len()
            );
            problems += 1;
            continue;
        };
        match slot_at_binding(set, r.binding) {
            None => {
                crate::render_error!(
                    "meridian::shader",
                    "{}: resource \"{}\" ({}, {}) is out of range of the layout with {} slots",
                    shader,
                    r.name,
                    r.set,
                    r.binding,
                    native_slots(set).len()
                );
                problems += 1;
            }
            Some(declared) if !compatible(declared, r.ty) => {
                crate::render_error!(
                    "meridian::shader",
                    "{}: resource \"{}\" ({}, {}) type mismatch, shader uses {} but layout declares {}",
                    shader,
                    r.name,
                    r.set,
                    r.binding,
                    r.ty,
                    declared
                );
                problems += 1;
            }
            Some(_) => {}
        }
    }
    problems
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
